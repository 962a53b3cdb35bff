// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cluster environment configuration.
//!
//! The environment decides three things for every store: the ingress domain
//! its hostname is built from, the URL scheme, and which values file inside
//! the chart directory is handed to Helm.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_LOCAL_DOMAIN: &str = "localhost";
const DEFAULT_PRODUCTION_DOMAIN: &str = "yourdomain.com";

/// Deployment environment of the target cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
	#[default]
	Local,
	Production,
}

impl Environment {
	pub fn as_str(&self) -> &'static str {
		match self {
			Environment::Local => "local",
			Environment::Production => "production",
		}
	}
}

impl std::fmt::Display for Environment {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"production" | "prod" => Ok(Environment::Production),
			"local" | "development" | "dev" => Ok(Environment::Local),
			other => Err(ConfigError::InvalidValue {
				key: "cluster.environment".to_string(),
				message: format!("unknown environment '{other}' (expected local or production)"),
			}),
		}
	}
}

/// Cluster configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterConfigLayer {
	#[serde(default)]
	pub environment: Option<Environment>,
	#[serde(default)]
	pub local_ingress_domain: Option<String>,
	#[serde(default)]
	pub production_ingress_domain: Option<String>,
}

impl ClusterConfigLayer {
	pub fn merge(&mut self, other: ClusterConfigLayer) {
		if other.environment.is_some() {
			self.environment = other.environment;
		}
		if other.local_ingress_domain.is_some() {
			self.local_ingress_domain = other.local_ingress_domain;
		}
		if other.production_ingress_domain.is_some() {
			self.production_ingress_domain = other.production_ingress_domain;
		}
	}

	pub fn finalize(self) -> ClusterConfig {
		ClusterConfig {
			environment: self.environment.unwrap_or_default(),
			local_ingress_domain: normalize_domain(self.local_ingress_domain, DEFAULT_LOCAL_DOMAIN),
			production_ingress_domain: normalize_domain(
				self.production_ingress_domain,
				DEFAULT_PRODUCTION_DOMAIN,
			),
		}
	}
}

// Accepts both "localhost" and ".localhost".
fn normalize_domain(value: Option<String>, default: &str) -> String {
	value
		.map(|v| v.trim().trim_start_matches('.').to_string())
		.filter(|v| !v.is_empty())
		.unwrap_or_else(|| default.to_string())
}

/// Cluster configuration (runtime, fully resolved).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
	pub environment: Environment,
	pub local_ingress_domain: String,
	pub production_ingress_domain: String,
}

impl Default for ClusterConfig {
	fn default() -> Self {
		ClusterConfigLayer::default().finalize()
	}
}

impl ClusterConfig {
	pub fn is_production(&self) -> bool {
		self.environment == Environment::Production
	}

	/// Domain store hostnames are placed under.
	pub fn ingress_domain(&self) -> &str {
		if self.is_production() {
			&self.production_ingress_domain
		} else {
			&self.local_ingress_domain
		}
	}

	pub fn scheme(&self) -> &'static str {
		if self.is_production() {
			"https"
		} else {
			"http"
		}
	}

	/// Values file name looked up inside each chart directory.
	pub fn values_file_name(&self) -> &'static str {
		if self.is_production() {
			"values-prod.yaml"
		} else {
			"values-local.yaml"
		}
	}
}
