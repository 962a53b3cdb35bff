// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-engine install and readiness knowledge.
//!
//! Each supported engine is an [`EngineStrategy`] registered in an
//! [`EngineRegistry`]. The provisioner looks strategies up by [`EngineKind`]
//! and never branches on the engine itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use shopyard_common_secret::generate_password;
use shopyard_server_db::EngineKind;
use shopyard_server_helm::ValueOverride;

use crate::error::{ProvisioningError, Result};

/// Workload names the readiness monitor waits on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessTargets {
	pub deployment: String,
	pub stateful_set: String,
	pub ingress: String,
	/// Path requested from the storefront once the ingress has a host
	pub probe_path: &'static str,
}

/// Inputs to an engine's install values for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct InstallContext<'a> {
	pub store_id: &'a str,
	pub host: &'a str,
	pub admin_email: &'a str,
	pub seed_demo_data: bool,
}

pub trait EngineStrategy: Send + Sync {
	fn kind(&self) -> EngineKind;

	/// Chart directory installed for this engine.
	fn chart(&self) -> &Path;

	/// Helm `--wait` timeout for an install.
	fn install_timeout(&self) -> Duration;

	/// Path appended to the store url for the admin url.
	fn admin_path(&self) -> &'static str;

	fn readiness_targets(&self, release: &str) -> ReadinessTargets;

	/// Values for one install attempt. Credentials are generated on every call.
	fn install_values(&self, ctx: &InstallContext<'_>) -> Vec<ValueOverride>;
}

/// WordPress with WooCommerce backed by MySQL.
#[derive(Debug, Clone)]
pub struct WooCommerceEngine {
	chart: PathBuf,
}

impl WooCommerceEngine {
	pub fn new(chart: impl Into<PathBuf>) -> Self {
		Self {
			chart: chart.into(),
		}
	}
}

impl EngineStrategy for WooCommerceEngine {
	fn kind(&self) -> EngineKind {
		EngineKind::WooCommerce
	}

	fn chart(&self) -> &Path {
		&self.chart
	}

	fn install_timeout(&self) -> Duration {
		Duration::from_secs(5 * 60)
	}

	fn admin_path(&self) -> &'static str {
		"/wp-admin"
	}

	fn readiness_targets(&self, _release: &str) -> ReadinessTargets {
		ReadinessTargets {
			deployment: "wordpress".to_string(),
			stateful_set: "mysql".to_string(),
			ingress: "wordpress-ingress".to_string(),
			probe_path: "/",
		}
	}

	fn install_values(&self, ctx: &InstallContext<'_>) -> Vec<ValueOverride> {
		// The chart uses one database password for both MySQL accounts.
		let db_password = generate_password(24);

		vec![
			ValueOverride::string("storeId", ctx.store_id),
			ValueOverride::secret("wordpress.adminPassword", generate_password(24)),
			ValueOverride::secret("mysql.auth.rootPassword", db_password.clone()),
			ValueOverride::secret("mysql.auth.password", db_password),
			ValueOverride::string("ingress.hosts[0].host", ctx.host),
		]
	}
}

/// Medusa backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct MedusaEngine {
	chart: PathBuf,
}

impl MedusaEngine {
	pub fn new(chart: impl Into<PathBuf>) -> Self {
		Self {
			chart: chart.into(),
		}
	}
}

impl EngineStrategy for MedusaEngine {
	fn kind(&self) -> EngineKind {
		EngineKind::Medusa
	}

	fn chart(&self) -> &Path {
		&self.chart
	}

	fn install_timeout(&self) -> Duration {
		Duration::from_secs(10 * 60)
	}

	fn admin_path(&self) -> &'static str {
		"/app"
	}

	fn readiness_targets(&self, release: &str) -> ReadinessTargets {
		ReadinessTargets {
			deployment: format!("{release}-medusa"),
			stateful_set: format!("{release}-postgres"),
			ingress: format!("{release}-ingress"),
			probe_path: "/health",
		}
	}

	fn install_values(&self, ctx: &InstallContext<'_>) -> Vec<ValueOverride> {
		// The chart derives its resource names from storeName, which must
		// therefore be the release name.
		vec![
			ValueOverride::string("storeName", ctx.store_id),
			ValueOverride::string("storeId", ctx.store_id),
			ValueOverride::string("ingress.host", ctx.host),
			ValueOverride::secret("postgres.password", generate_password(24)),
			ValueOverride::string("medusa.adminEmail", ctx.admin_email),
			ValueOverride::secret("medusa.adminPassword", generate_password(16)),
			ValueOverride::secret("medusa.jwtSecret", generate_password(32)),
			ValueOverride::secret("medusa.cookieSecret", generate_password(32)),
			ValueOverride::set("medusa.seedDemoData", ctx.seed_demo_data),
		]
	}
}

/// Engine strategies keyed by kind.
#[derive(Clone, Default)]
pub struct EngineRegistry {
	engines: HashMap<EngineKind, Arc<dyn EngineStrategy>>,
}

impl EngineRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry with both built-in engines.
	pub fn with_charts(woocommerce_chart: impl Into<PathBuf>, medusa_chart: impl Into<PathBuf>) -> Self {
		let mut registry = Self::new();
		registry.register(Arc::new(WooCommerceEngine::new(woocommerce_chart)));
		registry.register(Arc::new(MedusaEngine::new(medusa_chart)));
		registry
	}

	/// Register a strategy, replacing any previous one for the same kind.
	pub fn register(&mut self, engine: Arc<dyn EngineStrategy>) {
		self.engines.insert(engine.kind(), engine);
	}

	pub fn get(&self, kind: EngineKind) -> Result<Arc<dyn EngineStrategy>> {
		self
			.engines
			.get(&kind)
			.cloned()
			.ok_or_else(|| ProvisioningError::Unexpected(format!("no engine registered for {kind}")))
	}
}

impl std::fmt::Debug for EngineRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut kinds: Vec<_> = self.engines.keys().map(|k| k.as_str()).collect();
		kinds.sort_unstable();
		f.debug_struct("EngineRegistry").field("engines", &kinds).finish()
	}
}
