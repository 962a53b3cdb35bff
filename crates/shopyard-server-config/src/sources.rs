// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	ClusterConfigLayer, DatabaseConfigLayer, Environment, HelmConfigLayer, LoggingConfigLayer,
	ProvisioningConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/shopyard/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: SHOPYARD_SERVER_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			database: Some(load_database_from_env()),
			logging: Some(load_logging_from_env()),
			cluster: Some(load_cluster_from_env()?),
			helm: Some(load_helm_from_env()?),
			provisioning: Some(load_provisioning_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_u32(name: &str) -> Result<Option<u32>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u32 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn env_u64(name: &str) -> Result<Option<u64>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u64 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("SHOPYARD_SERVER_DATABASE_URL"),
	}
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("SHOPYARD_SERVER_LOG_LEVEL"),
	}
}

fn load_cluster_from_env() -> Result<ClusterConfigLayer, ConfigError> {
	let environment = env_var("SHOPYARD_SERVER_ENV")
		.map(|v| v.parse::<Environment>())
		.transpose()?;

	Ok(ClusterConfigLayer {
		environment,
		local_ingress_domain: env_var("SHOPYARD_SERVER_LOCAL_INGRESS_DOMAIN"),
		production_ingress_domain: env_var("SHOPYARD_SERVER_PROD_INGRESS_DOMAIN"),
	})
}

fn load_helm_from_env() -> Result<HelmConfigLayer, ConfigError> {
	Ok(HelmConfigLayer {
		binary: env_var("SHOPYARD_SERVER_HELM_BINARY"),
		woocommerce_chart: env_var("SHOPYARD_SERVER_HELM_CHART_PATH").map(PathBuf::from),
		medusa_chart: env_var("SHOPYARD_SERVER_HELM_CHART_PATH_MEDUSA").map(PathBuf::from),
		uninstall_wait_secs: env_u64("SHOPYARD_SERVER_HELM_UNINSTALL_WAIT_SECS")?,
		kill_grace_secs: env_u64("SHOPYARD_SERVER_HELM_KILL_GRACE_SECS")?,
	})
}

fn load_provisioning_from_env() -> Result<ProvisioningConfigLayer, ConfigError> {
	Ok(ProvisioningConfigLayer {
		max_stores: env_u32("SHOPYARD_SERVER_MAX_STORES")?,
		max_stores_per_owner: env_u32("SHOPYARD_SERVER_MAX_STORES_PER_OWNER")?,
		max_concurrent_provisions: env_u32("SHOPYARD_SERVER_MAX_CONCURRENT_PROVISIONS")?,
		ready_timeout_secs: env_u64("SHOPYARD_SERVER_READY_TIMEOUT_SECS")?,
		poll_interval_secs: env_u64("SHOPYARD_SERVER_POLL_INTERVAL_SECS")?,
		probe_timeout_secs: env_u64("SHOPYARD_SERVER_PROBE_TIMEOUT_SECS")?,
		admin_email: env_var("SHOPYARD_SERVER_ADMIN_EMAIL"),
		seed_demo_data: env_bool("SHOPYARD_SERVER_SEED_DEMO_DATA"),
		quota_cpu: env_var("SHOPYARD_SERVER_QUOTA_CPU"),
		quota_memory: env_var("SHOPYARD_SERVER_QUOTA_MEMORY"),
		quota_storage: env_var("SHOPYARD_SERVER_QUOTA_STORAGE"),
	})
}
