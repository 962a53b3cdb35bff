// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Centralized configuration management for the Shopyard server.
//!
//! This crate provides:
//! - Layered configuration from multiple sources (defaults, TOML file, environment)
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`SHOPYARD_SERVER_*`)
//!
//! # Usage
//!
//! ```ignore
//! use shopyard_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("stores are served under {}", config.cluster.ingress_domain());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub cluster: ClusterConfig,
	pub helm: HelmConfig,
	pub provisioning: ProvisioningConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Environment variables (`SHOPYARD_SERVER_*`)
/// 2. Config file (`/etc/shopyard/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (for testing or simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a custom config file path.
pub fn load_config_with_file(
	config_path: impl Into<std::path::PathBuf>,
) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
pub fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();
	let cluster = layer.cluster.unwrap_or_default().finalize();
	let helm = layer.helm.unwrap_or_default().finalize();
	let provisioning = layer.provisioning.unwrap_or_default().finalize();

	validate_config(&provisioning)?;

	info!(
		database = %database.url,
		environment = %cluster.environment,
		ingress_domain = %cluster.ingress_domain(),
		max_stores = provisioning.max_stores,
		max_concurrent_provisions = provisioning.max_concurrent_provisions,
		"Server configuration loaded"
	);

	Ok(ServerConfig {
		database,
		logging,
		cluster,
		helm,
		provisioning,
	})
}

/// Validate cross-field configuration rules.
fn validate_config(provisioning: &ProvisioningConfig) -> Result<(), ConfigError> {
	let caps = [
		("max_stores", provisioning.max_stores),
		("max_stores_per_owner", provisioning.max_stores_per_owner),
		(
			"max_concurrent_provisions",
			provisioning.max_concurrent_provisions,
		),
	];
	for (name, value) in caps {
		if value == 0 {
			return Err(ConfigError::Validation(format!(
				"provisioning.{name} must be greater than zero"
			)));
		}
	}

	if provisioning.ready_timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"provisioning.ready_timeout_secs must be greater than zero".to_string(),
		));
	}

	if provisioning.poll_interval_secs == 0
		|| provisioning.poll_interval_secs > provisioning.ready_timeout_secs
	{
		return Err(ConfigError::Validation(format!(
			"provisioning.poll_interval_secs ({}) must be between 1 and ready_timeout_secs ({})",
			provisioning.poll_interval_secs, provisioning.ready_timeout_secs
		)));
	}

	if provisioning.probe_timeout_secs == 0 {
		return Err(ConfigError::Validation(
			"provisioning.probe_timeout_secs must be greater than zero".to_string(),
		));
	}

	Ok(())
}
