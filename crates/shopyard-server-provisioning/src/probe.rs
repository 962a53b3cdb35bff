// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Outbound HTTP reachability probe.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ProvisioningError, Result};

const MAX_REDIRECTS: usize = 5;

/// Checks whether a store answers over HTTP.
#[async_trait]
pub trait HealthProbe: Send + Sync {
	/// True when the url answers with a status below 500.
	async fn probe(&self, url: &str) -> bool;
}

/// [`HealthProbe`] backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct HttpProbe {
	http_client: reqwest::Client,
}

impl HttpProbe {
	pub fn new(timeout: Duration) -> Result<Self> {
		let http_client = reqwest::Client::builder()
			.timeout(timeout)
			.redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
			.build()
			.map_err(|e| ProvisioningError::Unexpected(format!("failed to build HTTP client: {e}")))?;

		Ok(Self { http_client })
	}
}

#[async_trait]
impl HealthProbe for HttpProbe {
	async fn probe(&self, url: &str) -> bool {
		match self.http_client.get(url).send().await {
			Ok(response) => {
				let status = response.status();
				debug!(url = %url, status = %status, "store probe answered");
				!status.is_server_error()
			}
			Err(e) => {
				debug!(url = %url, error = %e, "store probe failed");
				false
			}
		}
	}
}
