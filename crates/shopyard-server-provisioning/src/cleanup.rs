// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Store teardown: uninstall the release, then delete the namespace.

use chrono::{DateTime, Utc};
use serde::Serialize;
use shopyard_server_db::StoreId;
use shopyard_server_helm::{Installer, InstallerError};
use shopyard_server_k8s::ClusterClient;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStepKind {
	Uninstall,
	DeleteNamespace,
}

impl std::fmt::Display for CleanupStepKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			CleanupStepKind::Uninstall => f.write_str("uninstall release"),
			CleanupStepKind::DeleteNamespace => f.write_str("delete namespace"),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
	Succeeded,
	Skipped { reason: String },
	Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupStep {
	pub kind: CleanupStepKind,
	#[serde(flatten)]
	pub outcome: StepOutcome,
}

/// What happened during one teardown of a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
	pub store_id: StoreId,
	pub namespace: String,
	pub steps: Vec<CleanupStep>,
	pub finished_at: DateTime<Utc>,
}

impl CleanupReport {
	/// No step failed.
	pub fn is_clean(&self) -> bool {
		self.first_failure().is_none()
	}

	/// `<step>: <error>` of the first failed step.
	pub fn first_failure(&self) -> Option<String> {
		self.steps.iter().find_map(|step| match &step.outcome {
			StepOutcome::Failed { error } => Some(format!("{}: {error}", step.kind)),
			_ => None,
		})
	}
}

/// Whether later steps still run after one fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownMode {
	/// Attempt every step, used after a failed provisioning attempt.
	BestEffort,
	/// Skip the remaining steps after a failure, used by explicit deletes.
	StopOnFailure,
}

/// Uninstall the store's release and delete its namespace.
///
/// A release that is already gone counts as a skipped uninstall, a namespace
/// that is already gone as a successful delete.
#[tracing::instrument(skip(installer, cluster), fields(store_id = %store_id))]
pub async fn teardown(
	installer: &dyn Installer,
	cluster: &dyn ClusterClient,
	store_id: StoreId,
	namespace: &str,
	mode: TeardownMode,
) -> CleanupReport {
	let release = store_id.to_string();
	let mut steps = Vec::with_capacity(2);

	let uninstall = match installer.uninstall(&release, namespace).await {
		Ok(()) => StepOutcome::Succeeded,
		Err(InstallerError::ReleaseNotFound { .. }) => {
			info!("Helm release not found, continuing with namespace cleanup");
			StepOutcome::Skipped {
				reason: "release not found".to_string(),
			}
		}
		Err(e) => {
			warn!(error = %e, "Failed to uninstall release");
			StepOutcome::Failed {
				error: e.to_string(),
			}
		}
	};
	let uninstall_failed = matches!(uninstall, StepOutcome::Failed { .. });
	steps.push(CleanupStep {
		kind: CleanupStepKind::Uninstall,
		outcome: uninstall,
	});

	let delete = if uninstall_failed && mode == TeardownMode::StopOnFailure {
		StepOutcome::Skipped {
			reason: "uninstall failed".to_string(),
		}
	} else {
		match cluster.delete_namespace(namespace).await {
			Ok(()) => StepOutcome::Succeeded,
			Err(e) => {
				warn!(error = %e, "Failed to delete namespace");
				StepOutcome::Failed {
					error: e.to_string(),
				}
			}
		}
	};
	steps.push(CleanupStep {
		kind: CleanupStepKind::DeleteNamespace,
		outcome: delete,
	});

	CleanupReport {
		store_id,
		namespace: namespace.to_string(),
		steps,
		finished_at: Utc::now(),
	}
}
