// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Readiness polling for freshly installed stores.

use std::sync::Arc;
use std::time::Duration;

use shopyard_server_k8s::{ClusterClient, ControllerKind, K8sError, ReplicaCounts};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::engine::EngineStrategy;
use crate::probe::HealthProbe;

/// Why a single poll did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotReady {
	NamespaceMissing,
	ControllerMissing {
		kind: ControllerKind,
		name: String,
	},
	ReplicasPending {
		kind: ControllerKind,
		name: String,
		counts: ReplicaCounts,
	},
	PodsNotReady,
	IngressHostMissing {
		name: String,
	},
	ProbeFailed {
		url: String,
	},
	Cluster(String),
}

impl std::fmt::Display for NotReady {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			NotReady::NamespaceMissing => f.write_str("namespace does not exist"),
			NotReady::ControllerMissing { kind, name } => write!(f, "{kind} {name} not found"),
			NotReady::ReplicasPending { kind, name, counts } => write!(
				f,
				"{kind} {name} has {}/{} ready replicas",
				counts.ready, counts.desired
			),
			NotReady::PodsNotReady => f.write_str("not all pods are ready"),
			NotReady::IngressHostMissing { name } => write!(f, "ingress {name} has no host"),
			NotReady::ProbeFailed { url } => write!(f, "{url} is not answering"),
			NotReady::Cluster(message) => write!(f, "cluster error: {message}"),
		}
	}
}

impl From<K8sError> for NotReady {
	fn from(err: K8sError) -> Self {
		NotReady::Cluster(err.to_string())
	}
}

/// Polls the cluster and the storefront until a store is ready.
pub struct ReadinessMonitor {
	cluster: Arc<dyn ClusterClient>,
	probe: Arc<dyn HealthProbe>,
	poll_interval: Duration,
}

impl ReadinessMonitor {
	pub fn new(
		cluster: Arc<dyn ClusterClient>,
		probe: Arc<dyn HealthProbe>,
		poll_interval: Duration,
	) -> Self {
		Self {
			cluster,
			probe,
			poll_interval,
		}
	}

	/// Poll until the store passes every check or `deadline` has elapsed.
	///
	/// Errors during a poll only mean "not ready yet". A poll that is still
	/// waiting on the cluster when the deadline passes is abandoned.
	#[tracing::instrument(skip(self, engine), fields(engine = %engine.kind()))]
	pub async fn wait_for_ready(
		&self,
		namespace: &str,
		release: &str,
		engine: &dyn EngineStrategy,
		deadline: Duration,
	) -> bool {
		let start = Instant::now();
		let mut attempt: u32 = 0;

		loop {
			attempt += 1;
			let remaining = deadline.saturating_sub(start.elapsed());
			match tokio::time::timeout(remaining, self.check_once(namespace, release, engine)).await {
				Ok(Ok(())) => {
					info!(attempt, elapsed_ms = start.elapsed().as_millis() as u64, "store is ready");
					return true;
				}
				Ok(Err(reason)) => {
					debug!(attempt, reason = %reason, "store not ready yet");
				}
				Err(_) => {
					debug!(attempt, "readiness check outlived the deadline");
				}
			}

			let elapsed = start.elapsed();
			if elapsed >= deadline {
				return false;
			}
			tokio::time::sleep(self.poll_interval.min(deadline - elapsed)).await;
		}
	}

	/// Run every readiness check once, in order, stopping at the first failure.
	pub async fn check_once(
		&self,
		namespace: &str,
		release: &str,
		engine: &dyn EngineStrategy,
	) -> Result<(), NotReady> {
		if !self.cluster.namespace_exists(namespace).await? {
			return Err(NotReady::NamespaceMissing);
		}

		let targets = engine.readiness_targets(release);
		self
			.check_controller(namespace, ControllerKind::Deployment, &targets.deployment)
			.await?;
		self
			.check_controller(namespace, ControllerKind::StatefulSet, &targets.stateful_set)
			.await?;

		if !self.cluster.all_pods_ready(namespace).await {
			return Err(NotReady::PodsNotReady);
		}

		let host = self
			.cluster
			.ingress_host(namespace, &targets.ingress)
			.await?
			.ok_or_else(|| NotReady::IngressHostMissing {
				name: targets.ingress.clone(),
			})?;

		let url = format!("http://{host}{}", targets.probe_path);
		if !self.probe.probe(&url).await {
			return Err(NotReady::ProbeFailed { url });
		}

		Ok(())
	}

	async fn check_controller(
		&self,
		namespace: &str,
		kind: ControllerKind,
		name: &str,
	) -> Result<(), NotReady> {
		match self.cluster.controller_replicas(namespace, kind, name).await? {
			None => Err(NotReady::ControllerMissing {
				kind,
				name: name.to_string(),
			}),
			Some(counts) if !counts.is_ready() => Err(NotReady::ReplicasPending {
				kind,
				name: name.to_string(),
				counts,
			}),
			Some(_) => Ok(()),
		}
	}
}
