// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::NamespaceResourceScope;
use kube::{
	api::{Api, DeleteParams, ListParams, PostParams},
	Client, Resource,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::client::ClusterClient;
use crate::error::{K8sError, K8sResult};
use crate::inspect;
use crate::types::{
	ControllerKind, Deployment, Event, Ingress, K8sSecret, Namespace, PersistentVolumeClaim, Pod,
	ReplicaCounts, Service, StatefulSet,
};

pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
pub const MANAGED_BY_VALUE: &str = "shopyard";
pub const NAMESPACE_LABEL: &str = "shopyard.dev/namespace";
const EVENT_LIMIT: u32 = 50;

/// Production cluster client using the kube crate.
pub struct KubeClient {
	client: Client,
}

impl KubeClient {
	/// Create a new KubeClient that auto-discovers cluster configuration.
	///
	/// This will attempt to load config from:
	/// 1. In-cluster service account (when running in K8s)
	/// 2. KUBECONFIG environment variable
	/// 3. ~/.kube/config
	pub async fn new() -> K8sResult<Self> {
		let client = Client::try_default().await.map_err(|e| K8sError::Config {
			message: e.to_string(),
		})?;
		debug!("K8s client initialized");
		Ok(Self { client })
	}

	pub fn from_client(client: Client) -> Self {
		Self { client }
	}

	async fn list_namespaced<K>(&self, namespace: &str, params: &ListParams) -> Vec<K>
	where
		K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
		<K as Resource>::DynamicType: Default,
	{
		let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
		match api.list(params).await {
			Ok(list) => list.items,
			Err(e) => {
				debug!(
					namespace,
					kind = %K::kind(&Default::default()),
					error = %e,
					"Listing failed, treating as empty"
				);
				Vec::new()
			}
		}
	}
}

/// Namespace object with the management labels applied.
pub fn managed_namespace(name: &str) -> Namespace {
	let mut labels = BTreeMap::new();
	labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string());
	labels.insert(NAMESPACE_LABEL.to_string(), name.to_string());

	Namespace {
		metadata: ObjectMeta {
			name: Some(name.to_string()),
			labels: Some(labels),
			..Default::default()
		},
		..Default::default()
	}
}

#[async_trait]
impl ClusterClient for KubeClient {
	#[instrument(skip(self))]
	async fn create_namespace(&self, name: &str) -> K8sResult<()> {
		let namespaces: Api<Namespace> = Api::all(self.client.clone());
		match namespaces
			.create(&PostParams::default(), &managed_namespace(name))
			.await
		{
			Ok(_) => {
				info!(namespace = name, "Namespace created");
				Ok(())
			}
			Err(kube::Error::Api(err)) if err.code == 409 => {
				warn!(namespace = name, "Namespace already exists");
				Ok(())
			}
			Err(e) => Err(e.into()),
		}
	}

	#[instrument(skip(self))]
	async fn delete_namespace(&self, name: &str) -> K8sResult<()> {
		let namespaces: Api<Namespace> = Api::all(self.client.clone());
		match namespaces.delete(name, &DeleteParams::default()).await {
			Ok(_) => {
				info!(namespace = name, "Namespace deleted");
				Ok(())
			}
			Err(kube::Error::Api(err)) if err.code == 404 => Ok(()),
			Err(e) => Err(e.into()),
		}
	}

	async fn namespace_exists(&self, name: &str) -> K8sResult<bool> {
		let namespaces: Api<Namespace> = Api::all(self.client.clone());
		match namespaces.get(name).await {
			Ok(_) => Ok(true),
			Err(kube::Error::Api(err)) if err.code == 404 => Ok(false),
			Err(e) => Err(e.into()),
		}
	}

	async fn controller_replicas(
		&self,
		namespace: &str,
		kind: ControllerKind,
		name: &str,
	) -> K8sResult<Option<ReplicaCounts>> {
		let result = match kind {
			ControllerKind::Deployment => {
				let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
				api.get(name).await.map(|d| inspect::deployment_replicas(&d))
			}
			ControllerKind::StatefulSet => {
				let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
				api
					.get(name)
					.await
					.map(|s| inspect::stateful_set_replicas(&s))
			}
		};

		match result {
			Ok(counts) => Ok(Some(counts)),
			Err(kube::Error::Api(err)) if err.code == 404 => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	async fn ingress_host(&self, namespace: &str, name: &str) -> K8sResult<Option<String>> {
		let api: Api<Ingress> = Api::namespaced(self.client.clone(), namespace);
		match api.get(name).await {
			Ok(ingress) => Ok(inspect::ingress_first_host(&ingress)),
			Err(kube::Error::Api(err)) if err.code == 404 => Ok(None),
			Err(e) => Err(e.into()),
		}
	}

	async fn pods(&self, namespace: &str) -> Vec<Pod> {
		self
			.list_namespaced(namespace, &ListParams::default())
			.await
	}

	async fn deployments(&self, namespace: &str) -> Vec<Deployment> {
		self
			.list_namespaced(namespace, &ListParams::default())
			.await
	}

	async fn stateful_sets(&self, namespace: &str) -> Vec<StatefulSet> {
		self
			.list_namespaced(namespace, &ListParams::default())
			.await
	}

	async fn services(&self, namespace: &str) -> Vec<Service> {
		self
			.list_namespaced(namespace, &ListParams::default())
			.await
	}

	async fn ingresses(&self, namespace: &str) -> Vec<Ingress> {
		self
			.list_namespaced(namespace, &ListParams::default())
			.await
	}

	async fn secrets(&self, namespace: &str) -> Vec<K8sSecret> {
		self
			.list_namespaced(namespace, &ListParams::default())
			.await
	}

	async fn pvcs(&self, namespace: &str) -> Vec<PersistentVolumeClaim> {
		self
			.list_namespaced(namespace, &ListParams::default())
			.await
	}

	async fn events(&self, namespace: &str) -> Vec<Event> {
		self
			.list_namespaced(namespace, &ListParams::default().limit(EVENT_LIMIT))
			.await
	}

	async fn check_connectivity(&self) -> bool {
		let namespaces: Api<Namespace> = Api::all(self.client.clone());
		match namespaces.list(&ListParams::default().limit(1)).await {
			Ok(_) => true,
			Err(e) => {
				debug!(error = %e, "Cluster connectivity check failed");
				false
			}
		}
	}
}
