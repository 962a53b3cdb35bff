// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory stand-ins for the cluster, the installer and the HTTP probe.
//!
//! Each mock is cheap to clone and clones share state, so a test can hand one
//! copy to the provisioner and inspect recorded calls through another.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PodCondition, PodStatus};
use shopyard_server_helm::{InstallRequest, Installer, InstallerError, InstallerResult};
use shopyard_server_k8s::{
	ClusterClient, ControllerKind, Deployment, Event, Ingress, K8sError, K8sResult, K8sSecret,
	PersistentVolumeClaim, Pod, ReplicaCounts, Service, StatefulSet,
};
use tokio::sync::Semaphore;

use crate::probe::HealthProbe;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A pod whose `Ready` condition is `True`.
pub fn ready_pod(name: &str) -> Pod {
	Pod {
		metadata: k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
			name: Some(name.to_string()),
			..Default::default()
		},
		spec: None,
		status: Some(PodStatus {
			conditions: Some(vec![PodCondition {
				type_: "Ready".to_string(),
				status: "True".to_string(),
				..Default::default()
			}]),
			..Default::default()
		}),
	}
}

/// Recorded call to the mock cluster client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClusterCall {
	CreateNamespace(String),
	DeleteNamespace(String),
}

#[derive(Default)]
struct ClusterState {
	namespaces: HashSet<String>,
	replicas: HashMap<(String, ControllerKind, String), ReplicaCounts>,
	ingress_hosts: HashMap<(String, String), String>,
	pods: HashMap<String, Vec<Pod>>,
	deployments: HashMap<String, Vec<Deployment>>,
	stateful_sets: HashMap<String, Vec<StatefulSet>>,
	services: HashMap<String, Vec<Service>>,
	ingresses: HashMap<String, Vec<Ingress>>,
	secrets: HashMap<String, Vec<K8sSecret>>,
	pvcs: HashMap<String, Vec<PersistentVolumeClaim>>,
	events: HashMap<String, Vec<Event>>,
	ready_on_create: bool,
	api_error: Option<String>,
	create_namespace_error: Option<String>,
	delete_namespace_error: Option<String>,
	disconnected: bool,
	stalled: bool,
	calls: Vec<ClusterCall>,
}

/// Mock cluster client for testing.
#[derive(Clone, Default)]
pub struct MockClusterClient {
	state: Arc<Mutex<ClusterState>>,
}

impl MockClusterClient {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every namespace created through the client immediately looks like a
	/// fully ready store: ready controllers, one ready pod and an ingress
	/// host of `<namespace>.test`.
	pub fn ready_on_create() -> Self {
		let client = Self::new();
		lock(&client.state).ready_on_create = true;
		client
	}

	pub fn with_namespace(self, namespace: &str) -> Self {
		lock(&self.state).namespaces.insert(namespace.to_string());
		self
	}

	/// A namespace holding a ready store with the given workload names.
	pub fn with_ready_store(
		self,
		namespace: &str,
		deployment: &str,
		stateful_set: &str,
		ingress: &str,
		host: &str,
	) -> Self {
		{
			let mut state = lock(&self.state);
			state.namespaces.insert(namespace.to_string());
			let ready = ReplicaCounts {
				ready: 1,
				desired: 1,
			};
			state.replicas.insert(
				(
					namespace.to_string(),
					ControllerKind::Deployment,
					deployment.to_string(),
				),
				ready,
			);
			state.replicas.insert(
				(
					namespace.to_string(),
					ControllerKind::StatefulSet,
					stateful_set.to_string(),
				),
				ready,
			);
			state
				.pods
				.insert(namespace.to_string(), vec![ready_pod("app-0")]);
			state.ingress_hosts.insert(
				(namespace.to_string(), ingress.to_string()),
				host.to_string(),
			);
		}
		self
	}

	pub fn with_replicas(
		self,
		namespace: &str,
		kind: ControllerKind,
		name: &str,
		ready: i32,
		desired: i32,
	) -> Self {
		lock(&self.state).replicas.insert(
			(namespace.to_string(), kind, name.to_string()),
			ReplicaCounts { ready, desired },
		);
		self
	}

	pub fn with_pods(self, namespace: &str, pods: Vec<Pod>) -> Self {
		lock(&self.state).pods.insert(namespace.to_string(), pods);
		self
	}

	pub fn with_deployments(self, namespace: &str, deployments: Vec<Deployment>) -> Self {
		lock(&self.state)
			.deployments
			.insert(namespace.to_string(), deployments);
		self
	}

	pub fn with_stateful_sets(self, namespace: &str, stateful_sets: Vec<StatefulSet>) -> Self {
		lock(&self.state)
			.stateful_sets
			.insert(namespace.to_string(), stateful_sets);
		self
	}

	pub fn with_services(self, namespace: &str, services: Vec<Service>) -> Self {
		lock(&self.state)
			.services
			.insert(namespace.to_string(), services);
		self
	}

	pub fn with_ingresses(self, namespace: &str, ingresses: Vec<Ingress>) -> Self {
		lock(&self.state)
			.ingresses
			.insert(namespace.to_string(), ingresses);
		self
	}

	pub fn with_secrets(self, namespace: &str, secrets: Vec<K8sSecret>) -> Self {
		lock(&self.state)
			.secrets
			.insert(namespace.to_string(), secrets);
		self
	}

	pub fn with_pvcs(self, namespace: &str, pvcs: Vec<PersistentVolumeClaim>) -> Self {
		lock(&self.state).pvcs.insert(namespace.to_string(), pvcs);
		self
	}

	pub fn with_events(self, namespace: &str, events: Vec<Event>) -> Self {
		lock(&self.state)
			.events
			.insert(namespace.to_string(), events);
		self
	}

	/// Lifecycle and readiness calls fail with this API error.
	pub fn with_api_error(self, message: impl Into<String>) -> Self {
		lock(&self.state).api_error = Some(message.into());
		self
	}

	pub fn with_create_namespace_error(self, message: impl Into<String>) -> Self {
		lock(&self.state).create_namespace_error = Some(message.into());
		self
	}

	pub fn with_delete_namespace_error(self, message: impl Into<String>) -> Self {
		lock(&self.state).delete_namespace_error = Some(message.into());
		self
	}

	pub fn disconnected(self) -> Self {
		lock(&self.state).disconnected = true;
		self
	}

	/// `namespace_exists` never returns, like an API call stuck on a dead
	/// connection.
	pub fn stalled(self) -> Self {
		lock(&self.state).stalled = true;
		self
	}

	/// Returns the recorded calls.
	pub fn get_calls(&self) -> Vec<ClusterCall> {
		lock(&self.state).calls.clone()
	}

	/// Number of `delete_namespace` calls for one namespace.
	pub fn delete_calls(&self, namespace: &str) -> usize {
		lock(&self.state)
			.calls
			.iter()
			.filter(|c| **c == ClusterCall::DeleteNamespace(namespace.to_string()))
			.count()
	}

	pub fn has_namespace(&self, namespace: &str) -> bool {
		lock(&self.state).namespaces.contains(namespace)
	}

	fn api_error(&self) -> K8sResult<()> {
		match &lock(&self.state).api_error {
			Some(message) => Err(K8sError::ApiError {
				message: message.clone(),
			}),
			None => Ok(()),
		}
	}

	fn listed<T: Clone>(
		&self,
		namespace: &str,
		pick: impl FnOnce(&ClusterState) -> &HashMap<String, Vec<T>>,
	) -> Vec<T> {
		let state = lock(&self.state);
		pick(&state).get(namespace).cloned().unwrap_or_default()
	}
}

#[async_trait]
impl ClusterClient for MockClusterClient {
	async fn create_namespace(&self, name: &str) -> K8sResult<()> {
		let mut state = lock(&self.state);
		state.calls.push(ClusterCall::CreateNamespace(name.to_string()));
		if let Some(message) = state.api_error.clone().or(state.create_namespace_error.clone()) {
			return Err(K8sError::ApiError { message });
		}
		state.namespaces.insert(name.to_string());
		Ok(())
	}

	async fn delete_namespace(&self, name: &str) -> K8sResult<()> {
		let mut state = lock(&self.state);
		state.calls.push(ClusterCall::DeleteNamespace(name.to_string()));
		if let Some(message) = state.api_error.clone().or(state.delete_namespace_error.clone()) {
			return Err(K8sError::ApiError { message });
		}
		state.namespaces.remove(name);
		Ok(())
	}

	async fn namespace_exists(&self, name: &str) -> K8sResult<bool> {
		let stalled = lock(&self.state).stalled;
		if stalled {
			std::future::pending::<()>().await;
		}
		self.api_error()?;
		Ok(lock(&self.state).namespaces.contains(name))
	}

	async fn controller_replicas(
		&self,
		namespace: &str,
		kind: ControllerKind,
		name: &str,
	) -> K8sResult<Option<ReplicaCounts>> {
		self.api_error()?;
		let state = lock(&self.state);
		let key = (namespace.to_string(), kind, name.to_string());
		if let Some(counts) = state.replicas.get(&key) {
			return Ok(Some(*counts));
		}
		if state.ready_on_create && state.namespaces.contains(namespace) {
			return Ok(Some(ReplicaCounts {
				ready: 1,
				desired: 1,
			}));
		}
		Ok(None)
	}

	async fn ingress_host(&self, namespace: &str, name: &str) -> K8sResult<Option<String>> {
		self.api_error()?;
		let state = lock(&self.state);
		let key = (namespace.to_string(), name.to_string());
		if let Some(host) = state.ingress_hosts.get(&key) {
			return Ok(Some(host.clone()));
		}
		if state.ready_on_create && state.namespaces.contains(namespace) {
			return Ok(Some(format!("{namespace}.test")));
		}
		Ok(None)
	}

	async fn pods(&self, namespace: &str) -> Vec<Pod> {
		let state = lock(&self.state);
		if let Some(pods) = state.pods.get(namespace) {
			return pods.clone();
		}
		if state.ready_on_create && state.namespaces.contains(namespace) {
			return vec![ready_pod("store-0")];
		}
		Vec::new()
	}

	async fn deployments(&self, namespace: &str) -> Vec<Deployment> {
		self.listed(namespace, |s| &s.deployments)
	}

	async fn stateful_sets(&self, namespace: &str) -> Vec<StatefulSet> {
		self.listed(namespace, |s| &s.stateful_sets)
	}

	async fn services(&self, namespace: &str) -> Vec<Service> {
		self.listed(namespace, |s| &s.services)
	}

	async fn ingresses(&self, namespace: &str) -> Vec<Ingress> {
		self.listed(namespace, |s| &s.ingresses)
	}

	async fn secrets(&self, namespace: &str) -> Vec<K8sSecret> {
		self.listed(namespace, |s| &s.secrets)
	}

	async fn pvcs(&self, namespace: &str) -> Vec<PersistentVolumeClaim> {
		self.listed(namespace, |s| &s.pvcs)
	}

	async fn events(&self, namespace: &str) -> Vec<Event> {
		self.listed(namespace, |s| &s.events)
	}

	async fn check_connectivity(&self) -> bool {
		!lock(&self.state).disconnected
	}
}

/// Recorded call to the mock installer.
#[derive(Clone, Debug)]
pub enum InstallerCall {
	Install(InstallRequest),
	Uninstall { release: String, namespace: String },
	Check,
}

#[derive(Default)]
struct InstallerState {
	failing_installs: u32,
	install_error: String,
	panic_on_install: bool,
	failing_namespaces: HashMap<String, String>,
	panicking_namespaces: HashSet<String>,
	uninstall_error: Option<String>,
	release_missing: bool,
	check_error: bool,
	calls: Vec<InstallerCall>,
}

/// Mock installer for testing.
#[derive(Clone)]
pub struct MockInstaller {
	state: Arc<Mutex<InstallerState>>,
	gate: Option<Arc<Semaphore>>,
}

impl Default for MockInstaller {
	fn default() -> Self {
		Self::new()
	}
}

impl MockInstaller {
	pub fn new() -> Self {
		Self {
			state: Arc::new(Mutex::new(InstallerState::default())),
			gate: None,
		}
	}

	/// Every install fails with `stderr`.
	pub fn failing(self, stderr: impl Into<String>) -> Self {
		self.with_install_failures(u32::MAX, stderr)
	}

	/// The first `count` installs fail with `stderr`, later ones succeed.
	pub fn with_install_failures(self, count: u32, stderr: impl Into<String>) -> Self {
		{
			let mut state = lock(&self.state);
			state.failing_installs = count;
			state.install_error = stderr.into();
		}
		self
	}

	pub fn panicking(self) -> Self {
		lock(&self.state).panic_on_install = true;
		self
	}

	/// Installs into `namespace` fail with `stderr`.
	pub fn failing_in(self, namespace: &str, stderr: impl Into<String>) -> Self {
		lock(&self.state)
			.failing_namespaces
			.insert(namespace.to_string(), stderr.into());
		self
	}

	/// Installs into `namespace` panic.
	pub fn panicking_in(self, namespace: &str) -> Self {
		lock(&self.state)
			.panicking_namespaces
			.insert(namespace.to_string());
		self
	}

	pub fn with_uninstall_error(self, stderr: impl Into<String>) -> Self {
		lock(&self.state).uninstall_error = Some(stderr.into());
		self
	}

	/// Uninstall reports the release as already gone.
	pub fn with_missing_release(self) -> Self {
		lock(&self.state).release_missing = true;
		self
	}

	pub fn broken(self) -> Self {
		lock(&self.state).check_error = true;
		self
	}

	/// Installs block until [`MockInstaller::release`] lets them through.
	pub fn gated(mut self) -> Self {
		self.gate = Some(Arc::new(Semaphore::new(0)));
		self
	}

	/// Let `count` blocked installs proceed.
	pub fn release(&self, count: usize) {
		if let Some(gate) = &self.gate {
			gate.add_permits(count);
		}
	}

	/// Returns the recorded calls.
	pub fn get_calls(&self) -> Vec<InstallerCall> {
		lock(&self.state).calls.clone()
	}

	pub fn install_requests(&self) -> Vec<InstallRequest> {
		self
			.get_calls()
			.into_iter()
			.filter_map(|c| match c {
				InstallerCall::Install(request) => Some(request),
				_ => None,
			})
			.collect()
	}

	pub fn install_count(&self) -> usize {
		self.install_requests().len()
	}

	pub fn uninstall_count(&self) -> usize {
		self
			.get_calls()
			.iter()
			.filter(|c| matches!(c, InstallerCall::Uninstall { .. }))
			.count()
	}
}

#[async_trait]
impl Installer for MockInstaller {
	async fn install(&self, request: &InstallRequest) -> InstallerResult<()> {
		lock(&self.state)
			.calls
			.push(InstallerCall::Install(request.clone()));

		if let Some(gate) = &self.gate {
			if let Ok(permit) = gate.acquire().await {
				permit.forget();
			}
		}

		let mut state = lock(&self.state);
		if state.panic_on_install || state.panicking_namespaces.contains(&request.namespace) {
			drop(state);
			panic!("installer blew up");
		}
		if let Some(stderr) = state.failing_namespaces.get(&request.namespace) {
			return Err(InstallerError::CommandFailed {
				operation: "install",
				stderr: stderr.clone(),
			});
		}
		if state.failing_installs > 0 {
			state.failing_installs -= 1;
			return Err(InstallerError::CommandFailed {
				operation: "install",
				stderr: state.install_error.clone(),
			});
		}
		Ok(())
	}

	async fn uninstall(&self, release: &str, namespace: &str) -> InstallerResult<()> {
		let mut state = lock(&self.state);
		state.calls.push(InstallerCall::Uninstall {
			release: release.to_string(),
			namespace: namespace.to_string(),
		});
		if let Some(stderr) = &state.uninstall_error {
			return Err(InstallerError::CommandFailed {
				operation: "uninstall",
				stderr: stderr.clone(),
			});
		}
		if state.release_missing {
			return Err(InstallerError::ReleaseNotFound {
				release: release.to_string(),
			});
		}
		Ok(())
	}

	async fn check(&self) -> InstallerResult<String> {
		let mut state = lock(&self.state);
		state.calls.push(InstallerCall::Check);
		if state.check_error {
			return Err(InstallerError::NotInstalled {
				binary: "helm".to_string(),
			});
		}
		Ok("v3.16.2+g13654a5".to_string())
	}
}

/// Mock HTTP probe for testing.
#[derive(Clone)]
pub struct MockHealthProbe {
	healthy: Arc<AtomicBool>,
	urls: Arc<Mutex<Vec<String>>>,
}

impl MockHealthProbe {
	pub fn healthy() -> Self {
		Self {
			healthy: Arc::new(AtomicBool::new(true)),
			urls: Arc::new(Mutex::new(Vec::new())),
		}
	}

	pub fn unhealthy() -> Self {
		let probe = Self::healthy();
		probe.set_healthy(false);
		probe
	}

	pub fn set_healthy(&self, healthy: bool) {
		self.healthy.store(healthy, Ordering::SeqCst);
	}

	/// Urls probed so far, in order.
	pub fn urls(&self) -> Vec<String> {
		lock(&self.urls).clone()
	}
}

#[async_trait]
impl HealthProbe for MockHealthProbe {
	async fn probe(&self, url: &str) -> bool {
		lock(&self.urls).push(url.to_string());
		self.healthy.load(Ordering::SeqCst)
	}
}
