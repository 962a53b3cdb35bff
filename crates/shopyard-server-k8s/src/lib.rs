// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster client abstraction for store namespaces.
//!
//! This crate provides:
//! - The [`ClusterClient`] trait the provisioning layer codes against
//! - A production implementation, [`KubeClient`], using the kube crate
//! - Pure summaries (ages, events, quotas) over listed objects in [`inspect`]

mod client;
mod error;
pub mod inspect;
mod kube_client;
mod types;

pub use client::ClusterClient;
pub use error::{K8sError, K8sResult};
pub use kube_client::{managed_namespace, KubeClient, MANAGED_BY_LABEL, NAMESPACE_LABEL};
pub use types::{
	format_gib, ControllerKind, Deployment, Event, EventSummary, EventType, Ingress, K8sSecret,
	Namespace, PersistentVolumeClaim, Pod, ReplicaCounts, ResourceKind, ResourceSummary,
	ResourceUsage, Service, StatefulSet,
};
