// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Reachability of the systems the provisioner depends on.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
	Healthy,
	Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
	pub status: HealthStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub detail: Option<String>,
}

impl ComponentHealth {
	pub fn healthy(detail: Option<String>) -> Self {
		Self {
			status: HealthStatus::Healthy,
			detail,
		}
	}

	pub fn unhealthy(detail: impl Into<String>) -> Self {
		Self {
			status: HealthStatus::Unhealthy,
			detail: Some(detail.into()),
		}
	}

	pub fn is_healthy(&self) -> bool {
		self.status == HealthStatus::Healthy
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
	pub database: ComponentHealth,
	pub kubernetes: ComponentHealth,
	pub helm: ComponentHealth,
}

impl HealthReport {
	pub fn is_healthy(&self) -> bool {
		self.database.is_healthy() && self.kubernetes.is_healthy() && self.helm.is_healthy()
	}
}
