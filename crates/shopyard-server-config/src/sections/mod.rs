// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

mod cluster;
mod database;
mod helm;
mod logging;
mod provisioning;

pub use cluster::{ClusterConfig, ClusterConfigLayer, Environment};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use helm::{HelmConfig, HelmConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use provisioning::{ProvisioningConfig, ProvisioningConfigLayer};
