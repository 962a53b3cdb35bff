// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use shopyard_common_secret::REDACTED;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::error::{InstallerError, InstallerResult};
use crate::installer::{InstallRequest, Installer, ValueOverride};

const DEFAULT_BINARY: &str = "helm";
const DEFAULT_GRACE: Duration = Duration::from_secs(60);
const DEFAULT_UNINSTALL_WAIT: Duration = Duration::from_secs(180);
const CHECK_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_STDERR_CHARS: usize = 2000;

/// Installer backed by the `helm` CLI.
///
/// The process is killed once it outlives its `--timeout` plus a grace period.
#[derive(Debug, Clone)]
pub struct HelmInstaller {
	binary: String,
	grace: Duration,
	uninstall_wait: Duration,
}

impl HelmInstaller {
	pub fn new(binary: impl Into<String>) -> Self {
		Self {
			binary: binary.into(),
			grace: DEFAULT_GRACE,
			uninstall_wait: DEFAULT_UNINSTALL_WAIT,
		}
	}

	pub fn with_grace(mut self, grace: Duration) -> Self {
		self.grace = grace;
		self
	}

	pub fn with_uninstall_wait(mut self, wait: Duration) -> Self {
		self.uninstall_wait = wait;
		self
	}

	async fn run(
		&self,
		operation: &'static str,
		args: &[String],
		limit: Duration,
		secrets: &[&str],
	) -> InstallerResult<String> {
		let mut cmd = Command::new(&self.binary);
		cmd
			.args(args)
			.stdin(Stdio::null())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		debug!(binary = %self.binary, operation, "running helm");

		let output = match tokio::time::timeout(limit, cmd.output()).await {
			Err(_) => {
				warn!(operation, after_secs = limit.as_secs(), "helm timed out, killed");
				return Err(InstallerError::Timeout {
					operation,
					after_secs: limit.as_secs(),
				});
			}
			Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
				warn!(binary = %self.binary, "helm not found in PATH");
				return Err(InstallerError::NotInstalled {
					binary: self.binary.clone(),
				});
			}
			Ok(Err(e)) => return Err(e.into()),
			Ok(Ok(output)) => output,
		};

		if output.status.success() {
			Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
		} else {
			let stderr = String::from_utf8_lossy(&output.stderr);
			Err(InstallerError::CommandFailed {
				operation,
				stderr: scrub(stderr.trim(), secrets),
			})
		}
	}
}

impl Default for HelmInstaller {
	fn default() -> Self {
		Self::new(DEFAULT_BINARY)
	}
}

/// Format a duration as a helm `--timeout` argument.
pub fn helm_duration(duration: Duration) -> String {
	format!("{}s", duration.as_secs())
}

/// Escape a `--set` value so commas and backslashes stay literal.
fn escape_set_value(value: &str) -> String {
	value.replace('\\', "\\\\").replace(',', "\\,")
}

/// Command-line arguments for an install. Contains secrets in clear text.
pub(crate) fn install_args(request: &InstallRequest) -> Vec<String> {
	let mut args = vec![
		"install".to_string(),
		request.release.clone(),
		request.chart.display().to_string(),
		"--namespace".to_string(),
		request.namespace.clone(),
		"--create-namespace".to_string(),
	];

	if let Some(values_file) = &request.values_file {
		args.push("--values".to_string());
		args.push(values_file.display().to_string());
	}

	for value in &request.values {
		let (flag, key, raw) = match value {
			ValueOverride::Set { key, value } => ("--set", key, value.as_str()),
			ValueOverride::SetString { key, value } => ("--set-string", key, value.as_str()),
			ValueOverride::Secret { key, value } => ("--set-string", key, value.expose().as_str()),
		};
		args.push(flag.to_string());
		args.push(format!("{key}={}", escape_set_value(raw)));
	}

	args.push("--wait".to_string());
	args.push("--timeout".to_string());
	args.push(helm_duration(request.wait_timeout));
	args
}

/// Replace every secret in `text` and cap its length.
pub(crate) fn scrub(text: &str, secrets: &[&str]) -> String {
	let mut scrubbed = text.to_string();
	for secret in secrets.iter().filter(|s| !s.is_empty()) {
		scrubbed = scrubbed.replace(secret, REDACTED);
		let escaped = escape_set_value(secret);
		if escaped != *secret {
			scrubbed = scrubbed.replace(&escaped, REDACTED);
		}
	}

	if scrubbed.chars().count() > MAX_STDERR_CHARS {
		let truncated: String = scrubbed.chars().take(MAX_STDERR_CHARS).collect();
		format!("{truncated}...")
	} else {
		scrubbed
	}
}

#[async_trait]
impl Installer for HelmInstaller {
	#[instrument(skip(self, request), fields(release = %request.release, namespace = %request.namespace))]
	async fn install(&self, request: &InstallRequest) -> InstallerResult<()> {
		let args = install_args(request);
		let secrets: Vec<&str> = request
			.values
			.iter()
			.filter_map(ValueOverride::secret_value)
			.collect();

		info!(
			chart = %request.chart.display(),
			wait_secs = request.wait_timeout.as_secs(),
			"Installing Helm chart"
		);
		self
			.run("install", &args, request.wait_timeout + self.grace, &secrets)
			.await?;
		info!("Helm chart installed");
		Ok(())
	}

	#[instrument(skip(self))]
	async fn uninstall(&self, release: &str, namespace: &str) -> InstallerResult<()> {
		let args = vec![
			"uninstall".to_string(),
			release.to_string(),
			"--namespace".to_string(),
			namespace.to_string(),
			"--wait".to_string(),
			"--timeout".to_string(),
			helm_duration(self.uninstall_wait),
		];

		info!("Uninstalling Helm chart");
		match self
			.run("uninstall", &args, self.uninstall_wait + self.grace, &[])
			.await
		{
			Ok(_) => {
				info!("Helm chart uninstalled");
				Ok(())
			}
			Err(InstallerError::CommandFailed { stderr, .. }) if is_missing_release(&stderr) => {
				debug!("release already absent");
				Err(InstallerError::ReleaseNotFound {
					release: release.to_string(),
				})
			}
			Err(e) => Err(e),
		}
	}

	async fn check(&self) -> InstallerResult<String> {
		let args = vec!["version".to_string(), "--short".to_string()];
		self.run("version", &args, CHECK_TIMEOUT, &[]).await
	}
}

/// Helm's own wording for an absent release. Other "not found" errors
/// (kube context, shell lookup of the binary) are real failures.
fn is_missing_release(stderr: &str) -> bool {
	stderr.contains("release: not found") || stderr.contains("Release not loaded")
}
