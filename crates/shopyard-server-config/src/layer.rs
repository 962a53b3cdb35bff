// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration layer for merging from multiple sources.

use serde::Deserialize;

use crate::sections::{
	ClusterConfigLayer, DatabaseConfigLayer, HelmConfigLayer, LoggingConfigLayer,
	ProvisioningConfigLayer,
};

/// Server configuration layer - all fields are Option for merging.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub cluster: Option<ClusterConfigLayer>,
	#[serde(default)]
	pub helm: Option<HelmConfigLayer>,
	#[serde(default)]
	pub provisioning: Option<ProvisioningConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(
			&mut self.database,
			other.database,
			DatabaseConfigLayer::merge,
		);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_option(&mut self.cluster, other.cluster, ClusterConfigLayer::merge);
		merge_option(&mut self.helm, other.helm, HelmConfigLayer::merge);
		merge_option(
			&mut self.provisioning,
			other.provisioning,
			ProvisioningConfigLayer::merge,
		);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_merge_empty_layers() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer::default());
		assert!(base.provisioning.is_none());
		assert!(base.cluster.is_none());
	}

	#[test]
	fn test_merge_preserves_base_when_other_empty() {
		let mut base = ServerConfigLayer {
			provisioning: Some(ProvisioningConfigLayer {
				max_stores: Some(7),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(ServerConfigLayer::default());
		assert_eq!(base.provisioning.as_ref().unwrap().max_stores, Some(7));
	}

	#[test]
	fn test_merge_other_overwrites_field_by_field() {
		let mut base = ServerConfigLayer {
			provisioning: Some(ProvisioningConfigLayer {
				max_stores: Some(7),
				max_concurrent_provisions: Some(2),
				..Default::default()
			}),
			..Default::default()
		};
		let other = ServerConfigLayer {
			provisioning: Some(ProvisioningConfigLayer {
				max_stores: Some(12),
				..Default::default()
			}),
			..Default::default()
		};
		base.merge(other);

		let provisioning = base.provisioning.as_ref().unwrap();
		assert_eq!(provisioning.max_stores, Some(12));
		assert_eq!(provisioning.max_concurrent_provisions, Some(2));
	}

	#[test]
	fn test_merge_adds_missing_sections() {
		let mut base = ServerConfigLayer::default();
		base.merge(ServerConfigLayer {
			database: Some(DatabaseConfigLayer {
				url: Some("sqlite::memory:".to_string()),
			}),
			..Default::default()
		});
		assert_eq!(
			base.database.as_ref().unwrap().url.as_deref(),
			Some("sqlite::memory:")
		);
	}

	#[test]
	fn test_deserialize_full_document() {
		let layer: ServerConfigLayer = toml::from_str(
			r#"
[database]
url = "sqlite:/var/lib/shopyard/stores.db"

[cluster]
environment = "production"

[helm]
medusa_chart = "/srv/charts/medusa"

[provisioning]
max_concurrent_provisions = 5
"#,
		)
		.unwrap();

		assert!(layer.database.is_some());
		assert!(layer.logging.is_none());
		assert_eq!(
			layer.provisioning.unwrap().max_concurrent_provisions,
			Some(5)
		);
	}
}
