// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use shopyard_common_secret::SecretString;

use crate::error::InstallerResult;

/// One `--set`/`--set-string` override on the install command line.
#[derive(Debug, Clone)]
pub enum ValueOverride {
	/// Typed value (`--set`), for booleans and numbers.
	Set { key: String, value: String },
	/// Literal string (`--set-string`).
	SetString { key: String, value: String },
	/// Generated credential (`--set-string`), redacted everywhere but the command line.
	Secret { key: String, value: SecretString },
}

impl ValueOverride {
	pub fn set(key: impl Into<String>, value: impl ToString) -> Self {
		Self::Set {
			key: key.into(),
			value: value.to_string(),
		}
	}

	pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
		Self::SetString {
			key: key.into(),
			value: value.into(),
		}
	}

	pub fn secret(key: impl Into<String>, value: SecretString) -> Self {
		Self::Secret {
			key: key.into(),
			value,
		}
	}

	pub fn key(&self) -> &str {
		match self {
			Self::Set { key, .. } | Self::SetString { key, .. } | Self::Secret { key, .. } => key,
		}
	}

	/// The non-secret value, `None` for credentials.
	pub fn plain_value(&self) -> Option<&str> {
		match self {
			Self::Set { value, .. } | Self::SetString { value, .. } => Some(value),
			Self::Secret { .. } => None,
		}
	}

	pub(crate) fn secret_value(&self) -> Option<&str> {
		match self {
			Self::Secret { value, .. } => Some(value.expose().as_str()),
			_ => None,
		}
	}
}

/// Everything needed to install one store release.
#[derive(Debug, Clone)]
pub struct InstallRequest {
	pub release: String,
	pub namespace: String,
	pub chart: PathBuf,
	pub values_file: Option<PathBuf>,
	pub values: Vec<ValueOverride>,
	pub wait_timeout: Duration,
}

impl InstallRequest {
	pub fn value(&self, key: &str) -> Option<&ValueOverride> {
		self.values.iter().find(|v| v.key() == key)
	}
}

/// Installs and removes store releases.
#[async_trait]
pub trait Installer: Send + Sync {
	/// Install the release and wait for its resources.
	async fn install(&self, request: &InstallRequest) -> InstallerResult<()>;

	/// Remove a release. A missing release is `ReleaseNotFound`.
	async fn uninstall(&self, release: &str, namespace: &str) -> InstallerResult<()>;

	/// Report the installer version, failing if it cannot run.
	async fn check(&self) -> InstallerResult<String>;
}
