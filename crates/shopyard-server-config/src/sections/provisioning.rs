// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning limits and store defaults.

use serde::Deserialize;

/// Provisioning configuration layer (for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProvisioningConfigLayer {
	#[serde(default)]
	pub max_stores: Option<u32>,
	#[serde(default)]
	pub max_stores_per_owner: Option<u32>,
	#[serde(default)]
	pub max_concurrent_provisions: Option<u32>,
	#[serde(default)]
	pub ready_timeout_secs: Option<u64>,
	#[serde(default)]
	pub poll_interval_secs: Option<u64>,
	#[serde(default)]
	pub probe_timeout_secs: Option<u64>,
	#[serde(default)]
	pub admin_email: Option<String>,
	#[serde(default)]
	pub seed_demo_data: Option<bool>,
	#[serde(default)]
	pub quota_cpu: Option<String>,
	#[serde(default)]
	pub quota_memory: Option<String>,
	#[serde(default)]
	pub quota_storage: Option<String>,
}

impl ProvisioningConfigLayer {
	pub fn merge(&mut self, other: ProvisioningConfigLayer) {
		if other.max_stores.is_some() {
			self.max_stores = other.max_stores;
		}
		if other.max_stores_per_owner.is_some() {
			self.max_stores_per_owner = other.max_stores_per_owner;
		}
		if other.max_concurrent_provisions.is_some() {
			self.max_concurrent_provisions = other.max_concurrent_provisions;
		}
		if other.ready_timeout_secs.is_some() {
			self.ready_timeout_secs = other.ready_timeout_secs;
		}
		if other.poll_interval_secs.is_some() {
			self.poll_interval_secs = other.poll_interval_secs;
		}
		if other.probe_timeout_secs.is_some() {
			self.probe_timeout_secs = other.probe_timeout_secs;
		}
		if other.admin_email.is_some() {
			self.admin_email = other.admin_email;
		}
		if other.seed_demo_data.is_some() {
			self.seed_demo_data = other.seed_demo_data;
		}
		if other.quota_cpu.is_some() {
			self.quota_cpu = other.quota_cpu;
		}
		if other.quota_memory.is_some() {
			self.quota_memory = other.quota_memory;
		}
		if other.quota_storage.is_some() {
			self.quota_storage = other.quota_storage;
		}
	}

	pub fn finalize(self) -> ProvisioningConfig {
		let defaults = ProvisioningConfig::default();
		ProvisioningConfig {
			max_stores: self.max_stores.unwrap_or(defaults.max_stores),
			max_stores_per_owner: self
				.max_stores_per_owner
				.unwrap_or(defaults.max_stores_per_owner),
			max_concurrent_provisions: self
				.max_concurrent_provisions
				.unwrap_or(defaults.max_concurrent_provisions),
			ready_timeout_secs: self
				.ready_timeout_secs
				.unwrap_or(defaults.ready_timeout_secs),
			poll_interval_secs: self
				.poll_interval_secs
				.unwrap_or(defaults.poll_interval_secs),
			probe_timeout_secs: self
				.probe_timeout_secs
				.unwrap_or(defaults.probe_timeout_secs),
			admin_email: self.admin_email.unwrap_or(defaults.admin_email),
			seed_demo_data: self.seed_demo_data.unwrap_or(defaults.seed_demo_data),
			quota_cpu: self.quota_cpu.unwrap_or(defaults.quota_cpu),
			quota_memory: self.quota_memory.unwrap_or(defaults.quota_memory),
			quota_storage: self.quota_storage.unwrap_or(defaults.quota_storage),
		}
	}
}

/// Provisioning configuration (runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningConfig {
	/// Total stores allowed across all owners.
	pub max_stores: u32,
	/// Non-deleting stores allowed per owner.
	pub max_stores_per_owner: u32,
	/// Provisioning jobs allowed to run at once.
	pub max_concurrent_provisions: u32,
	pub ready_timeout_secs: u64,
	pub poll_interval_secs: u64,
	/// Per-request timeout for the outbound storefront probe.
	pub probe_timeout_secs: u64,
	/// Admin account email for Medusa stores.
	pub admin_email: String,
	pub seed_demo_data: bool,
	pub quota_cpu: String,
	pub quota_memory: String,
	pub quota_storage: String,
}

impl Default for ProvisioningConfig {
	fn default() -> Self {
		Self {
			max_stores: 50,
			max_stores_per_owner: 100,
			max_concurrent_provisions: 3,
			ready_timeout_secs: 300,
			poll_interval_secs: 5,
			probe_timeout_secs: 5,
			admin_email: "admin@example.com".to_string(),
			seed_demo_data: true,
			quota_cpu: "500m".to_string(),
			quota_memory: "512Mi".to_string(),
			quota_storage: "5Gi".to_string(),
		}
	}
}
