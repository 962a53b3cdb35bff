// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-store diagnostics assembled from the record and its namespace.

use serde::Serialize;
use shopyard_server_db::{Store, StoreId, StoreStatus};
use shopyard_server_k8s::{EventSummary, ResourceKind, ResourceSummary, ResourceUsage};

use crate::cleanup::CleanupReport;
use crate::config::QuotaLimits;

/// Id, status, url and error of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatusView {
	pub id: StoreId,
	pub status: StoreStatus,
	pub url: Option<String>,
	pub error_message: Option<String>,
}

impl From<&Store> for StoreStatusView {
	fn from(store: &Store) -> Self {
		Self {
			id: store.id,
			status: store.status,
			url: store.url.clone(),
			error_message: store.error_message.clone(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningStep {
	pub label: &'static str,
	pub completed: bool,
	/// The step a failed store got stuck on.
	#[serde(skip_serializing_if = "std::ops::Not::not")]
	pub error: bool,
}

/// Requested usage next to the configured limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreQuotas {
	pub cpu_used: String,
	pub cpu_limit: String,
	pub memory_used: String,
	pub memory_limit: String,
	pub storage_used: String,
	pub storage_limit: String,
}

impl StoreQuotas {
	pub fn new(usage: &ResourceUsage, limits: &QuotaLimits) -> Self {
		Self {
			cpu_used: usage.cpu_display(),
			cpu_limit: limits.cpu.clone(),
			memory_used: usage.memory_display(),
			memory_limit: limits.memory.clone(),
			storage_used: usage.storage_display(),
			storage_limit: limits.storage.clone(),
		}
	}
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreDetail {
	pub store: Store,
	pub resources: Vec<ResourceSummary>,
	pub events: Vec<EventSummary>,
	pub pod_restarts: u64,
	pub provisioning_steps: Vec<ProvisioningStep>,
	pub quotas: StoreQuotas,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_cleanup: Option<CleanupReport>,
}

/// Cluster facts the provisioning steps are derived from.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepFacts {
	pub namespace_exists: bool,
	pub has_secrets: bool,
	pub has_ingress: bool,
}

/// The five provisioning milestones of a store.
///
/// For a failed store the first incomplete step is flagged as the error.
pub fn provisioning_steps(
	store: &Store,
	resources: &[ResourceSummary],
	facts: StepFacts,
) -> Vec<ProvisioningStep> {
	let running = |kind: ResourceKind| {
		resources
			.iter()
			.any(|r| r.kind == kind && r.status == "Running")
	};
	let database_ready = running(ResourceKind::StatefulSet);
	let app_deployed = running(ResourceKind::Deployment) || database_ready;
	let ingress_ready = store.url.is_some() || facts.has_ingress;

	let mut steps: Vec<ProvisioningStep> = [
		("Namespace created", facts.namespace_exists),
		("Secrets generated", facts.has_secrets),
		("Database ready", database_ready),
		("App deployed", app_deployed),
		("Ingress ready", ingress_ready),
	]
	.into_iter()
	.map(|(label, completed)| ProvisioningStep {
		label,
		completed,
		error: false,
	})
	.collect();

	if store.status == StoreStatus::Failed {
		if let Some(step) = steps.iter_mut().find(|s| !s.completed) {
			step.error = true;
		}
	}

	steps
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Utc;
	use shopyard_server_db::EngineKind;

	fn store(status: StoreStatus, url: Option<&str>) -> Store {
		Store {
			id: StoreId::new(),
			engine: EngineKind::WooCommerce,
			name: "Acme".to_string(),
			namespace: "store-acme".to_string(),
			status,
			url: url.map(str::to_string),
			admin_url: None,
			error_message: None,
			owner_id: None,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		}
	}

	fn row(kind: ResourceKind, status: &str) -> ResourceSummary {
		ResourceSummary {
			kind,
			name: "x".to_string(),
			status: status.to_string(),
			replicas: None,
			age: "1m".to_string(),
		}
	}

	#[test]
	fn fresh_namespace_has_only_first_step() {
		let facts = StepFacts {
			namespace_exists: true,
			..Default::default()
		};
		let steps = provisioning_steps(&store(StoreStatus::Provisioning, None), &[], facts);

		let completed: Vec<bool> = steps.iter().map(|s| s.completed).collect();
		assert_eq!(completed, vec![true, false, false, false, false]);
		assert!(steps.iter().all(|s| !s.error));
	}

	#[test]
	fn ready_store_completes_every_step() {
		let facts = StepFacts {
			namespace_exists: true,
			has_secrets: true,
			has_ingress: false,
		};
		let resources = vec![
			row(ResourceKind::Deployment, "Running"),
			row(ResourceKind::StatefulSet, "Running"),
		];
		let steps = provisioning_steps(
			&store(StoreStatus::Ready, Some("http://acme.localhost")),
			&resources,
			facts,
		);
		assert!(steps.iter().all(|s| s.completed));
	}

	#[test]
	fn pending_database_is_not_ready() {
		let facts = StepFacts {
			namespace_exists: true,
			has_secrets: true,
			has_ingress: true,
		};
		let resources = vec![
			row(ResourceKind::Deployment, "Running"),
			row(ResourceKind::StatefulSet, "Pending"),
		];
		let steps = provisioning_steps(&store(StoreStatus::Provisioning, None), &resources, facts);
		assert!(!steps[2].completed);
		assert!(steps[3].completed);
		assert!(steps[4].completed);
	}

	#[test]
	fn failed_store_flags_first_incomplete_step() {
		let facts = StepFacts {
			namespace_exists: true,
			has_secrets: true,
			has_ingress: false,
		};
		let steps = provisioning_steps(&store(StoreStatus::Failed, None), &[], facts);

		let flagged: Vec<&str> = steps.iter().filter(|s| s.error).map(|s| s.label).collect();
		assert_eq!(flagged, vec!["Database ready"]);
	}

	#[test]
	fn quotas_render_usage_and_limits() {
		let usage = ResourceUsage {
			cpu_millicores: 350,
			memory_mib: 384,
			storage_gib: 1.5,
		};
		let quotas = StoreQuotas::new(&usage, &QuotaLimits::default());
		assert_eq!(quotas.cpu_used, "350m");
		assert_eq!(quotas.cpu_limit, "500m");
		assert_eq!(quotas.memory_used, "384Mi");
		assert_eq!(quotas.storage_used, "1.5Gi");
		assert_eq!(quotas.storage_limit, "5Gi");
	}

	#[test]
	fn status_view_copies_fields() {
		let mut s = store(StoreStatus::Failed, None);
		s.error_message = Some("Helm install failed: boom".to_string());
		let view = StoreStatusView::from(&s);
		assert_eq!(view.id, s.id);
		assert_eq!(view.status, StoreStatus::Failed);
		assert_eq!(view.error_message.as_deref(), Some("Helm install failed: boom"));
	}

	#[test]
	fn error_flag_is_omitted_when_false() {
		let step = ProvisioningStep {
			label: "Namespace created",
			completed: true,
			error: false,
		};
		let json = serde_json::to_value(&step).unwrap();
		assert!(json.get("error").is_none());
	}
}
