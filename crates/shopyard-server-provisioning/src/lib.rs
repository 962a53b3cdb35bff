// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Store provisioning orchestration.
//!
//! [`StoreProvisioner`] admits store requests against the configured limits,
//! runs each admitted store through a background job (namespace, helm
//! install, readiness) and tears down whatever a failed attempt left behind.
//!
//! # Components
//!
//! - [`engine`]: per-engine charts, install values and readiness targets
//! - [`ReadinessMonitor`]: polls workloads, the ingress and the storefront
//! - [`cleanup`]: release and namespace teardown with a per-step report
//! - [`detail`]: read models for status and detail views
//! - `testing` (feature `testing`): in-memory cluster, installer and probe

pub mod cleanup;
mod config;
pub mod detail;
pub mod engine;
mod error;
mod health;
mod monitor;
pub mod naming;
mod probe;
mod provisioner;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cleanup::{CleanupReport, CleanupStep, CleanupStepKind, StepOutcome, TeardownMode};
pub use config::{ProvisionerConfig, QuotaLimits};
pub use detail::{ProvisioningStep, StoreDetail, StoreQuotas, StoreStatusView};
pub use engine::{EngineRegistry, EngineStrategy, MedusaEngine, WooCommerceEngine};
pub use error::{CapacityKind, ProvisioningError, Result};
pub use health::{ComponentHealth, HealthReport, HealthStatus};
pub use monitor::{NotReady, ReadinessMonitor};
pub use probe::{HealthProbe, HttpProbe};
pub use provisioner::{RecoveryReport, StoreProvisioner};
