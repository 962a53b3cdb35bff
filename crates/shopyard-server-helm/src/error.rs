// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

pub type InstallerResult<T> = Result<T, InstallerError>;

/// Errors from driving the helm CLI.
///
/// Messages never carry generated secrets: captured stderr is scrubbed and
/// the command line is never included.
#[derive(Error, Debug)]
pub enum InstallerError {
	#[error("helm binary not found: {binary}")]
	NotInstalled { binary: String },

	#[error("failed to run helm: {0}")]
	Io(#[from] std::io::Error),

	#[error("helm {operation} timed out after {after_secs}s")]
	Timeout {
		operation: &'static str,
		after_secs: u64,
	},

	#[error("Helm {operation} failed: {stderr}")]
	CommandFailed {
		operation: &'static str,
		stderr: String,
	},

	#[error("release not found: {release}")]
	ReleaseNotFound { release: String },
}
