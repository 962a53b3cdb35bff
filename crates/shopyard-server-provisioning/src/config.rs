// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Store provisioner configuration.

use std::path::PathBuf;
use std::time::Duration;

use shopyard_server_config::ServerConfig;

/// Resource limits shown next to a store's requested usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaLimits {
	pub cpu: String,
	pub memory: String,
	pub storage: String,
}

impl Default for QuotaLimits {
	fn default() -> Self {
		Self {
			cpu: "500m".to_string(),
			memory: "512Mi".to_string(),
			storage: "5Gi".to_string(),
		}
	}
}

/// Configuration for the store provisioner.
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
	/// Stores allowed in total
	pub max_stores: u32,
	/// Non-deleting stores allowed per owner
	pub max_stores_per_owner: u32,
	/// Provisioning jobs allowed to run at once
	pub max_concurrent_provisions: u32,
	/// How long a store may take to pass readiness after its install
	pub ready_timeout: Duration,
	pub poll_interval: Duration,
	pub probe_timeout: Duration,
	/// Domain store hostnames are placed under
	pub ingress_domain: String,
	/// `http` or `https`
	pub scheme: String,
	/// Values file looked up inside each chart directory
	pub values_file_name: String,
	pub woocommerce_chart: PathBuf,
	pub medusa_chart: PathBuf,
	/// Admin account email for Medusa stores
	pub admin_email: String,
	pub seed_demo_data: bool,
	pub quota: QuotaLimits,
}

impl Default for ProvisionerConfig {
	fn default() -> Self {
		Self {
			max_stores: 50,
			max_stores_per_owner: 100,
			max_concurrent_provisions: 3,
			ready_timeout: Duration::from_secs(300),
			poll_interval: Duration::from_secs(5),
			probe_timeout: Duration::from_secs(5),
			ingress_domain: "localhost".to_string(),
			scheme: "http".to_string(),
			values_file_name: "values-local.yaml".to_string(),
			woocommerce_chart: PathBuf::from("helm/store"),
			medusa_chart: PathBuf::from("helm/medusa-store"),
			admin_email: "admin@example.com".to_string(),
			seed_demo_data: true,
			quota: QuotaLimits::default(),
		}
	}
}

impl ProvisionerConfig {
	pub fn from_server_config(config: &ServerConfig) -> Self {
		let provisioning = &config.provisioning;
		Self {
			max_stores: provisioning.max_stores,
			max_stores_per_owner: provisioning.max_stores_per_owner,
			max_concurrent_provisions: provisioning.max_concurrent_provisions,
			ready_timeout: Duration::from_secs(provisioning.ready_timeout_secs),
			poll_interval: Duration::from_secs(provisioning.poll_interval_secs),
			probe_timeout: Duration::from_secs(provisioning.probe_timeout_secs),
			ingress_domain: config.cluster.ingress_domain().to_string(),
			scheme: config.cluster.scheme().to_string(),
			values_file_name: config.cluster.values_file_name().to_string(),
			woocommerce_chart: config.helm.woocommerce_chart.clone(),
			medusa_chart: config.helm.medusa_chart.clone(),
			admin_email: provisioning.admin_email.clone(),
			seed_demo_data: provisioning.seed_demo_data,
			quota: QuotaLimits {
				cpu: provisioning.quota_cpu.clone(),
				memory: provisioning.quota_memory.clone(),
				storage: provisioning.quota_storage.clone(),
			},
		}
	}
}
