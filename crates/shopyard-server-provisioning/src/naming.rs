// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Store names, namespaces and hostnames.

use crate::error::{ProvisioningError, Result};

pub const NAMESPACE_PREFIX: &str = "store-";
pub const MAX_NAME_LENGTH: usize = 200;
/// Length of the random token appended when a namespace is taken.
pub const SUFFIX_LENGTH: usize = 6;

const MAX_LABEL_LENGTH: usize = 63;
const FALLBACK_SLUG: &str = "store";
// Leaves room for the prefix plus `-<suffix>` inside one DNS label.
const MAX_SLUG_LENGTH: usize = MAX_LABEL_LENGTH - NAMESPACE_PREFIX.len() - 1 - SUFFIX_LENGTH;

/// Trim a display name and check its length.
pub fn validate_name(name: &str) -> Result<String> {
	let trimmed = name.trim();
	if trimmed.is_empty() {
		return Err(ProvisioningError::Validation(
			"store name must not be empty".to_string(),
		));
	}
	if trimmed.chars().count() > MAX_NAME_LENGTH {
		return Err(ProvisioningError::Validation(format!(
			"store name must be at most {MAX_NAME_LENGTH} characters"
		)));
	}
	Ok(trimmed.to_string())
}

/// Lowercase the name, collapse runs of anything that is not `[a-z0-9]` into
/// one `-`, strip `-` from both ends and truncate.
pub fn slugify(name: &str) -> String {
	let mut slug = String::with_capacity(name.len());
	let mut pending_dash = false;

	for c in name.trim().chars().flat_map(char::to_lowercase) {
		if c.is_ascii_lowercase() || c.is_ascii_digit() {
			if pending_dash && !slug.is_empty() {
				slug.push('-');
			}
			pending_dash = false;
			slug.push(c);
		} else {
			pending_dash = true;
		}
	}

	slug.truncate(MAX_SLUG_LENGTH);
	let slug = slug.trim_end_matches('-');

	if slug.is_empty() {
		FALLBACK_SLUG.to_string()
	} else {
		slug.to_string()
	}
}

/// `store-<slug>` for a display name.
pub fn namespace_for(name: &str) -> String {
	format!("{NAMESPACE_PREFIX}{}", slugify(name))
}

/// `<base>-<suffix>`, used when the plain namespace is already taken.
pub fn with_suffix(base: &str, suffix: &str) -> String {
	format!("{base}-{suffix}")
}

/// Public hostname of the store living in `namespace`.
pub fn store_host(namespace: &str, domain: &str) -> String {
	let label = namespace
		.strip_prefix(NAMESPACE_PREFIX)
		.unwrap_or(namespace);
	format!("{label}.{domain}")
}

pub fn store_url(scheme: &str, host: &str) -> String {
	format!("{scheme}://{host}")
}
