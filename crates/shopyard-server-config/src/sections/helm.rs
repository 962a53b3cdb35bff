// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Helm CLI configuration section.

use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_BINARY: &str = "helm";
const DEFAULT_WOOCOMMERCE_CHART: &str = "helm/store";
const DEFAULT_MEDUSA_CHART: &str = "helm/medusa-store";
const DEFAULT_UNINSTALL_WAIT_SECS: u64 = 180;
const DEFAULT_KILL_GRACE_SECS: u64 = 60;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelmConfigLayer {
	#[serde(default)]
	pub binary: Option<String>,
	#[serde(default)]
	pub woocommerce_chart: Option<PathBuf>,
	#[serde(default)]
	pub medusa_chart: Option<PathBuf>,
	#[serde(default)]
	pub uninstall_wait_secs: Option<u64>,
	#[serde(default)]
	pub kill_grace_secs: Option<u64>,
}

impl HelmConfigLayer {
	pub fn merge(&mut self, other: HelmConfigLayer) {
		if other.binary.is_some() {
			self.binary = other.binary;
		}
		if other.woocommerce_chart.is_some() {
			self.woocommerce_chart = other.woocommerce_chart;
		}
		if other.medusa_chart.is_some() {
			self.medusa_chart = other.medusa_chart;
		}
		if other.uninstall_wait_secs.is_some() {
			self.uninstall_wait_secs = other.uninstall_wait_secs;
		}
		if other.kill_grace_secs.is_some() {
			self.kill_grace_secs = other.kill_grace_secs;
		}
	}

	pub fn finalize(self) -> HelmConfig {
		HelmConfig {
			binary: self.binary.unwrap_or_else(|| DEFAULT_BINARY.to_string()),
			woocommerce_chart: self
				.woocommerce_chart
				.unwrap_or_else(|| PathBuf::from(DEFAULT_WOOCOMMERCE_CHART)),
			medusa_chart: self
				.medusa_chart
				.unwrap_or_else(|| PathBuf::from(DEFAULT_MEDUSA_CHART)),
			uninstall_wait_secs: self
				.uninstall_wait_secs
				.unwrap_or(DEFAULT_UNINSTALL_WAIT_SECS),
			kill_grace_secs: self.kill_grace_secs.unwrap_or(DEFAULT_KILL_GRACE_SECS),
		}
	}
}

/// Helm configuration (runtime).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelmConfig {
	pub binary: String,
	/// Chart directory for WooCommerce stores.
	pub woocommerce_chart: PathBuf,
	/// Chart directory for Medusa stores.
	pub medusa_chart: PathBuf,
	pub uninstall_wait_secs: u64,
	/// Extra time a helm process gets past its own `--timeout` before it is killed.
	pub kill_grace_secs: u64,
}

impl Default for HelmConfig {
	fn default() -> Self {
		HelmConfigLayer::default().finalize()
	}
}
