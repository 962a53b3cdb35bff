// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subcommand handlers. Every handler writes one JSON document.

use std::io::Write;

use anyhow::{anyhow, Context};
use serde::Serialize;
use shopyard_server_db::{StoreId, StoreStatus};
use shopyard_server_provisioning::StoreProvisioner;

use crate::Command;

/// Whether the command achieved what it was asked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Success,
	/// The command ran but reported a failed store or an unhealthy component.
	Failure,
}

pub async fn run(
	provisioner: &StoreProvisioner,
	command: Command,
	out: &mut impl Write,
) -> anyhow::Result<Outcome> {
	match command {
		Command::Create {
			name,
			engine,
			owner,
		} => {
			let store = provisioner
				.create_store(&name, engine, owner.as_deref())
				.await?;
			print_json(out, &store)?;
			finish_job(provisioner, &store.id, out).await
		}
		Command::List { owner } => {
			let stores = provisioner.list_stores(owner.as_deref()).await?;
			print_json(out, &stores)?;
			Ok(Outcome::Success)
		}
		Command::Status { id } => {
			let status = provisioner.get_store_status(&parse_id(&id)?).await?;
			print_json(out, &status)?;
			Ok(Outcome::Success)
		}
		Command::Detail { id } => {
			let detail = provisioner.get_store_detail(&parse_id(&id)?).await?;
			print_json(out, &detail)?;
			Ok(Outcome::Success)
		}
		Command::Retry { id } => {
			let id = parse_id(&id)?;
			let store = provisioner.retry_store(&id).await?;
			print_json(out, &store)?;
			finish_job(provisioner, &id, out).await
		}
		Command::Delete { id } => {
			let id = parse_id(&id)?;
			provisioner.delete_store(&id).await?;
			print_json(out, &serde_json::json!({ "id": id, "deleted": true }))?;
			Ok(Outcome::Success)
		}
		Command::Health => {
			let report = provisioner.health().await;
			print_json(out, &report)?;
			Ok(if report.is_healthy() {
				Outcome::Success
			} else {
				Outcome::Failure
			})
		}
		Command::Recover => {
			let report = provisioner.recover_interrupted().await?;
			print_json(out, &report)?;
			Ok(Outcome::Success)
		}
		Command::Version => {
			writeln!(out, "{}", crate::version::format_version_info())?;
			Ok(Outcome::Success)
		}
	}
}

/// Wait for the job started for `id`, then print the store as it ended up.
///
/// The job runs on this process's runtime, so returning earlier would drop it.
/// Interrupting the wait leaves the store in Provisioning; `recover` settles it.
async fn finish_job(
	provisioner: &StoreProvisioner,
	id: &StoreId,
	out: &mut impl Write,
) -> anyhow::Result<Outcome> {
	tokio::select! {
		_ = provisioner.drain() => {}
		_ = tokio::signal::ctrl_c() => {
			tracing::warn!(store_id = %id, "Interrupted while provisioning, run `recover` to settle the store");
			return Ok(Outcome::Failure);
		}
	}

	let store = provisioner.get_store(id).await?;
	print_json(out, &store)?;
	Ok(match store.status {
		StoreStatus::Ready => Outcome::Success,
		_ => Outcome::Failure,
	})
}

fn parse_id(raw: &str) -> anyhow::Result<StoreId> {
	raw.trim()
		.parse::<StoreId>()
		.map_err(|e| anyhow!("invalid store id '{raw}': {e}"))
}

fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
	serde_json::to_writer_pretty(&mut *out, value).context("failed to encode output")?;
	writeln!(out)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use shopyard_server_db::testing::create_store_test_pool;
	use shopyard_server_db::{EngineKind, StoreRepository};
	use shopyard_server_provisioning::testing::{MockClusterClient, MockHealthProbe, MockInstaller};
	use shopyard_server_provisioning::ProvisionerConfig;
	use std::sync::Arc;
	use std::time::Duration;

	async fn provisioner(installer: MockInstaller) -> StoreProvisioner {
		let repo = StoreRepository::new(create_store_test_pool().await);
		StoreProvisioner::new(
			Arc::new(repo),
			Arc::new(MockClusterClient::ready_on_create()),
			Arc::new(installer),
			Arc::new(MockHealthProbe::healthy()),
			ProvisionerConfig {
				ready_timeout: Duration::from_millis(100),
				poll_interval: Duration::from_millis(10),
				..Default::default()
			},
		)
	}

	fn documents(out: &[u8]) -> Vec<serde_json::Value> {
		serde_json::Deserializer::from_slice(out)
			.into_iter::<serde_json::Value>()
			.collect::<Result<_, _>>()
			.unwrap()
	}

	fn create(name: &str) -> Command {
		Command::Create {
			name: name.to_string(),
			engine: EngineKind::WooCommerce,
			owner: None,
		}
	}

	#[tokio::test]
	async fn create_prints_admitted_then_final_record() {
		let provisioner = provisioner(MockInstaller::new()).await;
		let mut out = Vec::new();

		let outcome = run(&provisioner, create("Acme"), &mut out).await.unwrap();
		assert_eq!(outcome, Outcome::Success);

		let docs = documents(&out);
		assert_eq!(docs.len(), 2);
		assert_eq!(docs[0]["status"], "provisioning");
		assert_eq!(docs[1]["status"], "ready");
		assert_eq!(docs[1]["url"], "http://acme.localhost");
	}

	#[tokio::test]
	async fn failed_provisioning_is_a_failure_outcome() {
		let provisioner = provisioner(MockInstaller::new().failing("boom")).await;
		let mut out = Vec::new();

		let outcome = run(&provisioner, create("Acme"), &mut out).await.unwrap();
		assert_eq!(outcome, Outcome::Failure);
		assert_eq!(documents(&out)[1]["status"], "failed");
	}

	#[tokio::test]
	async fn create_returns_only_after_the_job_settles() {
		let installer = MockInstaller::new().gated();
		let provisioner = provisioner(installer.clone()).await;

		let gate = installer.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(50)).await;
			gate.release(1);
		});

		let mut out = Vec::new();
		let outcome = run(&provisioner, create("Slow"), &mut out).await.unwrap();

		assert_eq!(outcome, Outcome::Success);
		assert_eq!(provisioner.in_flight(), 0);
		assert_eq!(installer.install_count(), 1);
		let docs = documents(&out);
		assert_eq!(docs.last().unwrap()["status"], "ready");
	}

	#[tokio::test]
	async fn retry_waits_for_the_new_job() {
		let provisioner = provisioner(MockInstaller::new().with_install_failures(1, "boom")).await;
		let mut out = Vec::new();
		run(&provisioner, create("Acme"), &mut out).await.unwrap();
		let id = documents(&out)[0]["id"].as_str().unwrap().to_string();

		let mut out = Vec::new();
		let outcome = run(&provisioner, Command::Retry { id }, &mut out)
			.await
			.unwrap();

		assert_eq!(outcome, Outcome::Success);
		assert_eq!(provisioner.in_flight(), 0);
		let docs = documents(&out);
		assert_eq!(docs.len(), 2);
		assert_eq!(docs[1]["status"], "ready");
	}

	#[tokio::test]
	async fn status_rejects_malformed_ids() {
		let provisioner = provisioner(MockInstaller::new()).await;
		let mut out = Vec::new();

		let err = run(
			&provisioner,
			Command::Status {
				id: "not-an-id".to_string(),
			},
			&mut out,
		)
		.await
		.unwrap_err();
		assert!(err.to_string().contains("invalid store id"));
		assert!(out.is_empty());
	}

	#[tokio::test]
	async fn delete_then_list_is_empty() {
		let provisioner = provisioner(MockInstaller::new()).await;
		let mut out = Vec::new();
		run(&provisioner, create("Acme"), &mut out).await.unwrap();
		let id = documents(&out)[0]["id"].as_str().unwrap().to_string();

		let mut out = Vec::new();
		run(&provisioner, Command::Delete { id }, &mut out)
			.await
			.unwrap();
		assert_eq!(documents(&out)[0]["deleted"], true);

		let mut out = Vec::new();
		run(&provisioner, Command::List { owner: None }, &mut out)
			.await
			.unwrap();
		assert_eq!(documents(&out)[0], serde_json::json!([]));
	}

	#[tokio::test]
	async fn unhealthy_helm_is_a_failure_outcome() {
		let provisioner = provisioner(MockInstaller::new().broken()).await;
		let mut out = Vec::new();

		let outcome = run(&provisioner, Command::Health, &mut out).await.unwrap();
		assert_eq!(outcome, Outcome::Failure);
		assert_eq!(documents(&out)[0]["helm"]["status"], "unhealthy");
	}
}
