// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Store record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a store, using UUID7 (time-ordered).
///
/// The id doubles as the Helm release name of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(uuid7::Uuid);

impl StoreId {
	/// Create a new store ID with UUID7.
	pub fn new() -> Self {
		Self(uuid7::uuid7())
	}

	pub fn into_inner(self) -> uuid7::Uuid {
		self.0
	}
}

impl Default for StoreId {
	fn default() -> Self {
		Self::new()
	}
}

impl From<uuid7::Uuid> for StoreId {
	fn from(id: uuid7::Uuid) -> Self {
		Self(id)
	}
}

impl std::fmt::Display for StoreId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl std::str::FromStr for StoreId {
	type Err = uuid7::ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let uuid = s.parse::<uuid7::Uuid>()?;
		Ok(Self(uuid))
	}
}

/// The e-commerce engine a store runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
	WooCommerce,
	Medusa,
}

impl EngineKind {
	pub const ALL: [EngineKind; 2] = [EngineKind::WooCommerce, EngineKind::Medusa];

	pub fn as_str(&self) -> &'static str {
		match self {
			EngineKind::WooCommerce => "woocommerce",
			EngineKind::Medusa => "medusa",
		}
	}
}

impl std::fmt::Display for EngineKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for EngineKind {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"woocommerce" => Ok(EngineKind::WooCommerce),
			"medusa" => Ok(EngineKind::Medusa),
			_ => Err(format!("unknown store engine: {s}")),
		}
	}
}

/// Lifecycle status of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
	/// A provisioning job is installing or verifying the store
	Provisioning,
	/// Installed and reachable
	Ready,
	/// Provisioning or teardown failed; see `error_message`
	Failed,
	/// Teardown in progress
	Deleting,
}

impl StoreStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			StoreStatus::Provisioning => "provisioning",
			StoreStatus::Ready => "ready",
			StoreStatus::Failed => "failed",
			StoreStatus::Deleting => "deleting",
		}
	}
}

impl std::fmt::Display for StoreStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for StoreStatus {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"provisioning" => Ok(StoreStatus::Provisioning),
			"ready" => Ok(StoreStatus::Ready),
			"failed" => Ok(StoreStatus::Failed),
			"deleting" => Ok(StoreStatus::Deleting),
			_ => Err(format!("unknown store status: {s}")),
		}
	}
}

/// A persisted store record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
	pub id: StoreId,
	pub engine: EngineKind,
	pub name: String,
	pub namespace: String,
	pub status: StoreStatus,
	pub url: Option<String>,
	pub admin_url: Option<String>,
	pub error_message: Option<String>,
	pub owner_id: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a store. New stores always start Provisioning.
#[derive(Debug, Clone)]
pub struct NewStore {
	pub id: StoreId,
	pub engine: EngineKind,
	pub name: String,
	pub namespace: String,
	pub owner_id: Option<String>,
}

/// A status change plus the columns that move with it.
///
/// For the optional columns, `None` leaves the stored value untouched and
/// `Some(v)` overwrites it (with `Some(None)` clearing it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
	pub status: StoreStatus,
	pub url: Option<Option<String>>,
	pub admin_url: Option<Option<String>>,
	pub error_message: Option<Option<String>>,
}

impl StatusUpdate {
	/// Back to Provisioning for a retry; clears the previous error.
	pub fn provisioning() -> Self {
		Self {
			status: StoreStatus::Provisioning,
			url: None,
			admin_url: None,
			error_message: Some(None),
		}
	}

	/// Ready always carries a url.
	pub fn ready(url: impl Into<String>, admin_url: impl Into<String>) -> Self {
		Self {
			status: StoreStatus::Ready,
			url: Some(Some(url.into())),
			admin_url: Some(Some(admin_url.into())),
			error_message: Some(None),
		}
	}

	pub fn failed(message: impl Into<String>) -> Self {
		Self {
			status: StoreStatus::Failed,
			url: None,
			admin_url: None,
			error_message: Some(Some(message.into())),
		}
	}

	pub fn deleting() -> Self {
		Self {
			status: StoreStatus::Deleting,
			url: None,
			admin_url: None,
			error_message: None,
		}
	}
}
