// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shopyard store provisioning binary.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shopyard_server_config::ServerConfig;
use shopyard_server_db::{EngineKind, StoreRepository};
use shopyard_server_helm::HelmInstaller;
use shopyard_server_k8s::KubeClient;
use shopyard_server_provisioning::{HttpProbe, ProvisionerConfig, StoreProvisioner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod version;

use commands::Outcome;

/// Shopyard - isolated e-commerce stores on Kubernetes.
#[derive(Parser, Debug)]
#[command(name = "shopyard-server", about = "Provision e-commerce stores on Kubernetes", version)]
struct Args {
	/// Config file to read instead of /etc/shopyard/server.toml
	#[arg(long, global = true, env = "SHOPYARD_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
	/// Create a store and wait for its provisioning job
	Create {
		/// Display name, slugified into the namespace
		name: String,
		/// `woocommerce` or `medusa`
		#[arg(long, default_value = "woocommerce")]
		engine: EngineKind,
		#[arg(long)]
		owner: Option<String>,
	},
	/// List stores, newest first
	List {
		#[arg(long)]
		owner: Option<String>,
	},
	/// Show a store's status
	Status { id: String },
	/// Show a store's workloads, events, progress and quotas
	Detail { id: String },
	/// Provision a failed store again and wait for the job
	Retry { id: String },
	/// Uninstall a store and delete its namespace and record
	Delete { id: String },
	/// Check the database, the cluster API and helm
	Health,
	/// Mark stores left mid-flight by a previous process as failed
	Recover,
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> ExitCode {
	let args = Args::parse();

	if args.command == Command::Version {
		println!("{}", version::format_version_info());
		return ExitCode::SUCCESS;
	}

	match run(args).await {
		Ok(Outcome::Success) => ExitCode::SUCCESS,
		Ok(Outcome::Failure) => ExitCode::FAILURE,
		Err(e) => {
			tracing::error!(error = %e, "command failed");
			eprintln!("error: {e:#}");
			ExitCode::FAILURE
		}
	}
}

async fn run(args: Args) -> anyhow::Result<Outcome> {
	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => shopyard_server_config::load_config_with_file(path),
		None => shopyard_server_config::load_config(),
	}
	.context("failed to load configuration")?;

	// stdout carries command output, logs go to stderr
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	tracing::debug!(
		database = %config.database.url,
		environment = %config.cluster.environment,
		ingress_domain = %config.cluster.ingress_domain(),
		"configuration loaded"
	);

	let provisioner = build_provisioner(&config).await?;
	let mut stdout = std::io::stdout().lock();
	commands::run(&provisioner, args.command, &mut stdout).await
}

async fn build_provisioner(config: &ServerConfig) -> anyhow::Result<StoreProvisioner> {
	let pool = shopyard_server_db::create_pool(&config.database.url)
		.await
		.context("failed to open the store database")?;
	shopyard_server_db::run_migrations(&pool)
		.await
		.context("failed to migrate the store database")?;

	let cluster = KubeClient::new()
		.await
		.context("failed to initialise the Kubernetes client")?;

	let installer = HelmInstaller::new(&config.helm.binary)
		.with_grace(Duration::from_secs(config.helm.kill_grace_secs))
		.with_uninstall_wait(Duration::from_secs(config.helm.uninstall_wait_secs));

	let provisioner_config = ProvisionerConfig::from_server_config(config);
	let probe = HttpProbe::new(provisioner_config.probe_timeout)?;

	Ok(StoreProvisioner::new(
		Arc::new(StoreRepository::new(pool)),
		Arc::new(cluster),
		Arc::new(installer),
		Arc::new(probe),
		provisioner_config,
	))
}
