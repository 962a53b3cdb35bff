// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster object re-exports and the summaries derived from them.

use serde::{Deserialize, Serialize};

pub use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
pub use k8s_openapi::api::core::v1::{
	Event, Namespace, PersistentVolumeClaim, Pod, Secret as K8sSecret, Service,
};
pub use k8s_openapi::api::networking::v1::Ingress;

/// Workload controllers whose replica counts gate readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerKind {
	Deployment,
	StatefulSet,
}

impl std::fmt::Display for ControllerKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ControllerKind::Deployment => f.write_str("Deployment"),
			ControllerKind::StatefulSet => f.write_str("StatefulSet"),
		}
	}
}

/// Ready versus desired replicas of a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReplicaCounts {
	pub ready: i32,
	pub desired: i32,
}

impl ReplicaCounts {
	/// Every desired replica is ready and at least one is desired.
	pub fn is_ready(&self) -> bool {
		self.desired > 0 && self.ready == self.desired
	}
}

/// Kinds listed in a namespace resource summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceKind {
	Deployment,
	StatefulSet,
	Service,
	#[serde(rename = "PVC")]
	Pvc,
}

/// One row of a namespace resource listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
	pub kind: ResourceKind,
	pub name: String,
	/// Running, Pending, Active or Bound
	pub status: String,
	/// `ready/desired`, controllers only
	#[serde(skip_serializing_if = "Option::is_none")]
	pub replicas: Option<String>,
	/// Coarse age such as `42s`, `5m`, `3h`, `2d`; empty when unknown
	pub age: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
	Normal,
	Warning,
	Error,
}

/// One namespace event, flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
	/// `HH:MM:SS` (UTC) of the last occurrence; empty when unknown
	pub timestamp: String,
	pub message: String,
	#[serde(rename = "type")]
	pub event_type: EventType,
}

/// Requested compute and provisioned storage across a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
	pub cpu_millicores: u64,
	pub memory_mib: u64,
	pub storage_gib: f64,
}

impl ResourceUsage {
	pub fn cpu_display(&self) -> String {
		format!("{}m", self.cpu_millicores)
	}

	pub fn memory_display(&self) -> String {
		format!("{}Mi", self.memory_mib)
	}

	pub fn storage_display(&self) -> String {
		format_gib(self.storage_gib)
	}
}

/// Render GiB without trailing zeros: `5Gi`, `0.5Gi`, `1.25Gi`.
pub fn format_gib(value: f64) -> String {
	let rounded = (value * 100.0).round() / 100.0;
	let text = format!("{rounded:.2}");
	let text = text.trim_end_matches('0').trim_end_matches('.');
	format!("{text}Gi")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn replica_counts_ready_requires_nonzero_match() {
		assert!(ReplicaCounts { ready: 1, desired: 1 }.is_ready());
		assert!(ReplicaCounts { ready: 3, desired: 3 }.is_ready());
		assert!(!ReplicaCounts { ready: 0, desired: 0 }.is_ready());
		assert!(!ReplicaCounts { ready: 1, desired: 2 }.is_ready());
	}

	#[test]
	fn usage_display_units() {
		let usage = ResourceUsage {
			cpu_millicores: 350,
			memory_mib: 768,
			storage_gib: 2.5,
		};
		assert_eq!(usage.cpu_display(), "350m");
		assert_eq!(usage.memory_display(), "768Mi");
		assert_eq!(usage.storage_display(), "2.5Gi");
	}

	#[test]
	fn gib_formatting_trims_zeros() {
		assert_eq!(format_gib(5.0), "5Gi");
		assert_eq!(format_gib(0.0), "0Gi");
		assert_eq!(format_gib(0.25), "0.25Gi");
		assert_eq!(format_gib(1.0 / 3.0), "0.33Gi");
	}

	#[test]
	fn pvc_kind_serializes_upper() {
		assert_eq!(serde_json::to_string(&ResourceKind::Pvc).unwrap(), r#""PVC""#);
	}
}
