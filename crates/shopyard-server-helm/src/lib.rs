// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Helm release management for store installs.
//!
//! [`Installer`] is the seam the provisioning layer codes against;
//! [`HelmInstaller`] shells out to the `helm` CLI. Generated credentials are
//! passed as [`ValueOverride::Secret`] and scrubbed from any captured output.

mod error;
mod helm;
mod installer;

pub use error::{InstallerError, InstallerResult};
pub use helm::{helm_duration, HelmInstaller};
pub use installer::{InstallRequest, Installer, ValueOverride};
