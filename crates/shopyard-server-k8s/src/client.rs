// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use chrono::Utc;

use crate::error::K8sResult;
use crate::inspect;
use crate::types::{
	ControllerKind, Deployment, Event, EventSummary, Ingress, K8sSecret, PersistentVolumeClaim, Pod,
	ReplicaCounts, ResourceSummary, ResourceUsage, Service, StatefulSet,
};

/// Trait for cluster operations on store namespaces.
///
/// Lifecycle and readiness calls return errors. Listings never do: a
/// namespace that is missing or not readable lists as empty, because
/// they only feed diagnostics.
#[async_trait]
pub trait ClusterClient: Send + Sync {
	/// Create a namespace labelled as managed by Shopyard. Already-exists is success.
	async fn create_namespace(&self, name: &str) -> K8sResult<()>;

	/// Delete a namespace. Not-found is success.
	async fn delete_namespace(&self, name: &str) -> K8sResult<()>;

	async fn namespace_exists(&self, name: &str) -> K8sResult<bool>;

	/// Replica counts of a Deployment or StatefulSet, `None` if it does not exist.
	async fn controller_replicas(
		&self,
		namespace: &str,
		kind: ControllerKind,
		name: &str,
	) -> K8sResult<Option<ReplicaCounts>>;

	/// Host of the first rule of an ingress, `None` if the ingress or host is missing.
	async fn ingress_host(&self, namespace: &str, name: &str) -> K8sResult<Option<String>>;

	async fn pods(&self, namespace: &str) -> Vec<Pod>;
	async fn deployments(&self, namespace: &str) -> Vec<Deployment>;
	async fn stateful_sets(&self, namespace: &str) -> Vec<StatefulSet>;
	async fn services(&self, namespace: &str) -> Vec<Service>;
	async fn ingresses(&self, namespace: &str) -> Vec<Ingress>;
	async fn secrets(&self, namespace: &str) -> Vec<K8sSecret>;
	async fn pvcs(&self, namespace: &str) -> Vec<PersistentVolumeClaim>;

	/// Namespace events, at most 50.
	async fn events(&self, namespace: &str) -> Vec<Event>;

	/// Whether the API server answers a namespace listing.
	async fn check_connectivity(&self) -> bool;

	async fn all_pods_ready(&self, namespace: &str) -> bool {
		inspect::pods_ready(&self.pods(namespace).await)
	}

	async fn list_resources(&self, namespace: &str) -> Vec<ResourceSummary> {
		let (deployments, stateful_sets, services, pvcs) = tokio::join!(
			self.deployments(namespace),
			self.stateful_sets(namespace),
			self.services(namespace),
			self.pvcs(namespace),
		);
		inspect::summarize_resources(Utc::now(), &deployments, &stateful_sets, &services, &pvcs)
	}

	async fn list_events(&self, namespace: &str) -> Vec<EventSummary> {
		inspect::summarize_events(&self.events(namespace).await)
	}

	async fn pod_restarts(&self, namespace: &str) -> u64 {
		inspect::count_restarts(&self.pods(namespace).await)
	}

	async fn resource_usage(&self, namespace: &str) -> ResourceUsage {
		let (pods, pvcs) = tokio::join!(self.pods(namespace), self.pvcs(namespace));
		inspect::summarize_usage(&pods, &pvcs)
	}

	async fn has_ingress(&self, namespace: &str) -> bool {
		!self.ingresses(namespace).await.is_empty()
	}

	async fn has_secrets(&self, namespace: &str) -> bool {
		!self.secrets(namespace).await.is_empty()
	}
}
