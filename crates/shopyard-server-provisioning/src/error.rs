// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning error types.

use serde::Serialize;
use shopyard_server_db::{DbError, StoreStatus};
use shopyard_server_helm::InstallerError;
use shopyard_server_k8s::K8sError;

pub type Result<T> = std::result::Result<T, ProvisioningError>;

/// The capacity limit an admission check ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityKind {
	GlobalStores,
	OwnerStores,
	ConcurrentProvisions,
}

impl std::fmt::Display for CapacityKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			CapacityKind::GlobalStores => f.write_str("maximum number of stores"),
			CapacityKind::OwnerStores => f.write_str("maximum number of stores for this owner"),
			CapacityKind::ConcurrentProvisions => f.write_str("maximum concurrent provisions"),
		}
	}
}

/// Errors that can occur during store provisioning operations.
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
	/// A capacity check refused the request; nothing was persisted.
	#[error("Admission rejected: {capacity} ({limit}) reached")]
	AdmissionRejected { capacity: CapacityKind, limit: u32 },

	#[error("Invalid request: {0}")]
	Validation(String),

	#[error("Store not found: {id}")]
	NotFound { id: String },

	#[error("Cannot {action} store {id} while it is {status}")]
	InvalidTransition {
		id: String,
		status: StoreStatus,
		action: &'static str,
	},

	#[error(transparent)]
	Installer(#[from] InstallerError),

	#[error("Store did not become ready within {secs} seconds")]
	ReadinessTimeout { secs: u64 },

	#[error(transparent)]
	Cluster(#[from] K8sError),

	#[error("Teardown failed: {0}")]
	Teardown(String),

	#[error(transparent)]
	Database(#[from] DbError),

	#[error("Unexpected error: {0}")]
	Unexpected(String),
}

impl ProvisioningError {
	/// Errors the caller caused, as opposed to infrastructure failures.
	pub fn is_client_error(&self) -> bool {
		matches!(
			self,
			ProvisioningError::AdmissionRejected { .. }
				| ProvisioningError::Validation(_)
				| ProvisioningError::NotFound { .. }
				| ProvisioningError::InvalidTransition { .. }
		)
	}
}
