// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core provisioner implementation for store lifecycle management.
//!
//! A create or retry is admitted synchronously and then handed to a
//! supervised background job:
//!
//! ```text
//! create_store ─► admission ─► Provisioning ─► job: namespace ─► install ─► readiness ─► Ready
//!                                                    │ any error or panic
//!                                                    └─► uninstall + delete namespace ─► Failed
//! ```
//!
//! Every admitted job holds one permit of a semaphore sized by
//! `max_concurrent_provisions`. The permit lives in the job's task and is
//! released when that task ends, whatever the outcome.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use shopyard_common_secret::random_lowercase_token;
use shopyard_server_db::{
	DbError, EngineKind, NewStore, StatusUpdate, Store, StoreId, StoreStatus, StoreStore,
};
use shopyard_server_helm::{InstallRequest, Installer};
use shopyard_server_k8s::ClusterClient;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinError;
use tracing::{debug, error, info, warn};

use crate::cleanup::{self, CleanupReport, TeardownMode};
use crate::config::ProvisionerConfig;
use crate::detail::{provisioning_steps, StepFacts, StoreDetail, StoreQuotas, StoreStatusView};
use crate::engine::{EngineRegistry, EngineStrategy, InstallContext};
use crate::error::{CapacityKind, ProvisioningError, Result};
use crate::health::{ComponentHealth, HealthReport};
use crate::monitor::ReadinessMonitor;
use crate::naming::{
	namespace_for, store_host, store_url, validate_name, with_suffix, SUFFIX_LENGTH,
};
use crate::probe::HealthProbe;

const MAX_NAMESPACE_ATTEMPTS: u32 = 5;
const INTERRUPTED_PROVISIONING: &str = "Provisioning interrupted by a server restart";
const INTERRUPTED_DELETION: &str = "Deletion failed: interrupted";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Stores moved to Failed by [`StoreProvisioner::recover_interrupted`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
	/// Stores whose provisioning job did not survive the restart.
	pub provisioning: Vec<StoreId>,
	/// Stores whose deletion did not survive the restart.
	pub deleting: Vec<StoreId>,
	/// Stores skipped because this process is still working on them.
	pub skipped_active: Vec<StoreId>,
}

impl RecoveryReport {
	pub fn recovered(&self) -> usize {
		self.provisioning.len() + self.deleting.len()
	}
}

struct ProvisionerInner {
	store: Arc<dyn StoreStore>,
	cluster: Arc<dyn ClusterClient>,
	installer: Arc<dyn Installer>,
	monitor: ReadinessMonitor,
	engines: EngineRegistry,
	config: ProvisionerConfig,
	permits: Arc<Semaphore>,
	admission: tokio::sync::Mutex<()>,
	active: Mutex<HashSet<StoreId>>,
	cleanups: Mutex<HashMap<StoreId, CleanupReport>>,
}

/// Removes a store from the active set when its job task ends.
struct ActiveJob {
	inner: Arc<ProvisionerInner>,
	id: StoreId,
}

impl Drop for ActiveJob {
	fn drop(&mut self) {
		lock(&self.inner.active).remove(&self.id);
	}
}

/// The provisioning orchestrator.
///
/// Cheap to clone; clones share limits, jobs and cleanup history.
#[derive(Clone)]
pub struct StoreProvisioner {
	inner: Arc<ProvisionerInner>,
}

impl StoreProvisioner {
	pub fn new(
		store: Arc<dyn StoreStore>,
		cluster: Arc<dyn ClusterClient>,
		installer: Arc<dyn Installer>,
		probe: Arc<dyn HealthProbe>,
		config: ProvisionerConfig,
	) -> Self {
		let engines = EngineRegistry::with_charts(&config.woocommerce_chart, &config.medusa_chart);
		Self::with_engines(store, cluster, installer, probe, config, engines)
	}

	pub fn with_engines(
		store: Arc<dyn StoreStore>,
		cluster: Arc<dyn ClusterClient>,
		installer: Arc<dyn Installer>,
		probe: Arc<dyn HealthProbe>,
		config: ProvisionerConfig,
		engines: EngineRegistry,
	) -> Self {
		let monitor = ReadinessMonitor::new(Arc::clone(&cluster), probe, config.poll_interval);
		let permits = Arc::new(Semaphore::new(config.max_concurrent_provisions as usize));

		Self {
			inner: Arc::new(ProvisionerInner {
				store,
				cluster,
				installer,
				monitor,
				engines,
				config,
				permits,
				admission: tokio::sync::Mutex::new(()),
				active: Mutex::new(HashSet::new()),
				cleanups: Mutex::new(HashMap::new()),
			}),
		}
	}

	pub fn config(&self) -> &ProvisionerConfig {
		&self.inner.config
	}

	/// Admit a new store and start provisioning it in the background.
	///
	/// Returns the Provisioning record as soon as it is persisted.
	#[tracing::instrument(skip(self, name), fields(engine = %engine))]
	pub async fn create_store(
		&self,
		name: &str,
		engine: EngineKind,
		owner_id: Option<&str>,
	) -> Result<Store> {
		let name = validate_name(name)?;
		let owner_id = owner_id
			.map(str::trim)
			.filter(|o| !o.is_empty())
			.map(str::to_string);
		self.inner.engines.get(engine)?;

		let config = &self.inner.config;
		let _admission = self.inner.admission.lock().await;

		let total = self.inner.store.count_stores().await?;
		if total >= i64::from(config.max_stores) {
			info!(total, limit = config.max_stores, "Store limit reached");
			return Err(ProvisioningError::AdmissionRejected {
				capacity: CapacityKind::GlobalStores,
				limit: config.max_stores,
			});
		}

		if let Some(owner) = owner_id.as_deref() {
			let owned = self.inner.store.count_stores_by_owner(owner).await?;
			if owned >= i64::from(config.max_stores_per_owner) {
				info!(owned, limit = config.max_stores_per_owner, "Owner store limit reached");
				return Err(ProvisioningError::AdmissionRejected {
					capacity: CapacityKind::OwnerStores,
					limit: config.max_stores_per_owner,
				});
			}
		}

		let permit = self.try_acquire_permit()?;
		let store = self
			.insert_with_free_namespace(&name, engine, owner_id)
			.await?;

		info!(store_id = %store.id, namespace = %store.namespace, "Store admitted");
		self.spawn_job(store.clone(), permit);
		Ok(store)
	}

	/// Every store, or one owner's stores, newest first.
	pub async fn list_stores(&self, owner_id: Option<&str>) -> Result<Vec<Store>> {
		let stores = match owner_id {
			Some(owner) => self.inner.store.list_stores_by_owner(owner).await?,
			None => self.inner.store.list_stores().await?,
		};
		Ok(stores)
	}

	pub async fn get_store(&self, id: &StoreId) -> Result<Store> {
		self
			.inner
			.store
			.get_store_by_id(id)
			.await?
			.ok_or_else(|| ProvisioningError::NotFound { id: id.to_string() })
	}

	pub async fn get_store_status(&self, id: &StoreId) -> Result<StoreStatusView> {
		let store = self.get_store(id).await?;
		Ok(StoreStatusView::from(&store))
	}

	/// The store record plus what its namespace currently looks like.
	#[tracing::instrument(skip(self), fields(store_id = %id))]
	pub async fn get_store_detail(&self, id: &StoreId) -> Result<StoreDetail> {
		let store = self.get_store(id).await?;
		let namespace = store.namespace.as_str();
		let cluster = &self.inner.cluster;

		let (resources, events, pod_restarts, usage, has_ingress, namespace_exists, has_secrets) = tokio::join!(
			cluster.list_resources(namespace),
			cluster.list_events(namespace),
			cluster.pod_restarts(namespace),
			cluster.resource_usage(namespace),
			cluster.has_ingress(namespace),
			cluster.namespace_exists(namespace),
			cluster.has_secrets(namespace),
		);

		let namespace_exists = namespace_exists.unwrap_or_else(|e| {
			debug!(error = %e, "Could not check namespace");
			false
		});

		let facts = StepFacts {
			namespace_exists,
			has_secrets,
			has_ingress,
		};
		let provisioning_steps = provisioning_steps(&store, &resources, facts);
		let quotas = StoreQuotas::new(&usage, &self.inner.config.quota);
		let last_cleanup = self.last_cleanup(id);

		Ok(StoreDetail {
			store,
			resources,
			events,
			pod_restarts,
			provisioning_steps,
			quotas,
			last_cleanup,
		})
	}

	/// Start a new provisioning attempt for a Failed store.
	#[tracing::instrument(skip(self), fields(store_id = %id))]
	pub async fn retry_store(&self, id: &StoreId) -> Result<Store> {
		let store = self.get_store(id).await?;
		if store.status != StoreStatus::Failed {
			return Err(ProvisioningError::InvalidTransition {
				id: id.to_string(),
				status: store.status,
				action: "retry",
			});
		}

		let _admission = self.inner.admission.lock().await;
		let permit = self.try_acquire_permit()?;

		let moved = self
			.inner
			.store
			.transition_store_status(id, StoreStatus::Failed, &StatusUpdate::provisioning())
			.await?;
		if !moved {
			let current = self.get_store(id).await?;
			return Err(ProvisioningError::InvalidTransition {
				id: id.to_string(),
				status: current.status,
				action: "retry",
			});
		}

		let store = self.get_store(id).await?;
		info!(namespace = %store.namespace, "Retrying store provisioning");
		self.spawn_job(store.clone(), permit);
		Ok(store)
	}

	/// Tear a store down and remove its record.
	///
	/// If teardown or the record removal fails the record stays, marked
	/// Failed with the cause.
	#[tracing::instrument(skip(self), fields(store_id = %id))]
	pub async fn delete_store(&self, id: &StoreId) -> Result<()> {
		let store = self.get_store(id).await?;

		info!(namespace = %store.namespace, "Starting store deletion");
		self
			.inner
			.store
			.update_store_status(id, &StatusUpdate::deleting())
			.await?;

		let report = cleanup::teardown(
			self.inner.installer.as_ref(),
			self.inner.cluster.as_ref(),
			store.id,
			&store.namespace,
			TeardownMode::StopOnFailure,
		)
		.await;

		if let Some(cause) = report.first_failure() {
			error!(error = %cause, "Delete failed");
			self.inner.remember_cleanup(report);
			self
				.inner
				.store
				.update_store_status(id, &StatusUpdate::failed(format!("Deletion failed: {cause}")))
				.await?;
			return Err(ProvisioningError::Teardown(cause));
		}

		if let Err(e) = self.inner.store.delete_store(id).await {
			error!(error = %e, "Failed to remove store record after teardown");
			if let Err(mark) = self
				.inner
				.store
				.update_store_status(id, &StatusUpdate::failed(format!("Deletion failed: {e}")))
				.await
			{
				error!(error = %mark, "Failed to mark store as failed");
			}
			return Err(e.into());
		}
		lock(&self.inner.cleanups).remove(id);
		info!("Store deleted");
		Ok(())
	}

	/// Check the database, the cluster API and the helm binary.
	pub async fn health(&self) -> HealthReport {
		let (database, kubernetes, helm) = tokio::join!(
			self.inner.store.ping(),
			self.inner.cluster.check_connectivity(),
			self.inner.installer.check(),
		);

		HealthReport {
			database: match database {
				Ok(()) => ComponentHealth::healthy(None),
				Err(e) => ComponentHealth::unhealthy(e.to_string()),
			},
			kubernetes: if kubernetes {
				ComponentHealth::healthy(None)
			} else {
				ComponentHealth::unhealthy("cluster API is not reachable")
			},
			helm: match helm {
				Ok(version) => ComponentHealth::healthy(Some(version)),
				Err(e) => ComponentHealth::unhealthy(e.to_string()),
			},
		}
	}

	/// Settle stores a previous process left mid-flight.
	///
	/// Provisioning stores are torn down and marked Failed so they can be
	/// retried; Deleting stores are marked Failed so the delete can be
	/// issued again. Stores with a job in this process are left alone.
	#[tracing::instrument(skip(self))]
	pub async fn recover_interrupted(&self) -> Result<RecoveryReport> {
		let mut report = RecoveryReport::default();

		for store in self
			.inner
			.store
			.list_stores_by_status(StoreStatus::Provisioning)
			.await?
		{
			if self.is_active(&store.id) {
				report.skipped_active.push(store.id);
				continue;
			}

			warn!(store_id = %store.id, namespace = %store.namespace, "Recovering interrupted provisioning");
			let cleanup = cleanup::teardown(
				self.inner.installer.as_ref(),
				self.inner.cluster.as_ref(),
				store.id,
				&store.namespace,
				TeardownMode::BestEffort,
			)
			.await;
			self.inner.remember_cleanup(cleanup);

			let moved = self
				.inner
				.store
				.transition_store_status(
					&store.id,
					StoreStatus::Provisioning,
					&StatusUpdate::failed(INTERRUPTED_PROVISIONING),
				)
				.await?;
			if moved {
				report.provisioning.push(store.id);
			}
		}

		for store in self
			.inner
			.store
			.list_stores_by_status(StoreStatus::Deleting)
			.await?
		{
			warn!(store_id = %store.id, namespace = %store.namespace, "Recovering interrupted deletion");
			let moved = self
				.inner
				.store
				.transition_store_status(
					&store.id,
					StoreStatus::Deleting,
					&StatusUpdate::failed(INTERRUPTED_DELETION),
				)
				.await?;
			if moved {
				report.deleting.push(store.id);
			}
		}

		info!(
			provisioning = report.provisioning.len(),
			deleting = report.deleting.len(),
			"Recovery complete"
		);
		Ok(report)
	}

	/// Number of provisioning jobs currently holding a permit.
	pub fn in_flight(&self) -> usize {
		self.capacity() - self.inner.permits.available_permits()
	}

	/// Wait until every in-flight job has finished.
	pub async fn drain(&self) {
		let capacity = u32::try_from(self.capacity()).unwrap_or(u32::MAX);
		if let Ok(all) = self.inner.permits.acquire_many(capacity).await {
			drop(all);
		}
	}

	/// The most recent teardown of a store, if one ran in this process.
	pub fn last_cleanup(&self, id: &StoreId) -> Option<CleanupReport> {
		lock(&self.inner.cleanups).get(id).cloned()
	}

	fn capacity(&self) -> usize {
		self.inner.config.max_concurrent_provisions as usize
	}

	fn is_active(&self, id: &StoreId) -> bool {
		lock(&self.inner.active).contains(id)
	}

	fn try_acquire_permit(&self) -> Result<OwnedSemaphorePermit> {
		Arc::clone(&self.inner.permits)
			.try_acquire_owned()
			.map_err(|_| {
				info!(
					limit = self.inner.config.max_concurrent_provisions,
					"Concurrent provisioning limit reached"
				);
				ProvisioningError::AdmissionRejected {
					capacity: CapacityKind::ConcurrentProvisions,
					limit: self.inner.config.max_concurrent_provisions,
				}
			})
	}

	/// Insert the record under `store-<slug>`, adding a random suffix when
	/// that namespace is taken.
	async fn insert_with_free_namespace(
		&self,
		name: &str,
		engine: EngineKind,
		owner_id: Option<String>,
	) -> Result<Store> {
		let base = namespace_for(name);
		let mut namespace = base.clone();
		if self.inner.store.namespace_exists(&namespace).await? {
			namespace = with_suffix(&base, &random_lowercase_token(SUFFIX_LENGTH));
		}

		for attempt in 1..=MAX_NAMESPACE_ATTEMPTS {
			let new = NewStore {
				id: StoreId::new(),
				engine,
				name: name.to_string(),
				namespace: namespace.clone(),
				owner_id: owner_id.clone(),
			};

			match self.inner.store.create_store(&new).await {
				Ok(store) => return Ok(store),
				Err(DbError::Conflict(reason)) => {
					debug!(attempt, namespace = %namespace, reason = %reason, "Namespace taken, choosing another");
					namespace = with_suffix(&base, &random_lowercase_token(SUFFIX_LENGTH));
				}
				Err(e) => return Err(e.into()),
			}
		}

		Err(ProvisioningError::Unexpected(format!(
			"no free namespace for {base} after {MAX_NAMESPACE_ATTEMPTS} attempts"
		)))
	}

	fn spawn_job(&self, store: Store, permit: OwnedSemaphorePermit) {
		lock(&self.inner.active).insert(store.id);
		let active = ActiveJob {
			inner: Arc::clone(&self.inner),
			id: store.id,
		};
		let inner = Arc::clone(&self.inner);

		tokio::spawn(async move {
			let _permit = permit;
			let _active = active;
			inner.supervise(store).await;
		});
	}
}

impl ProvisionerInner {
	/// Run the job body in its own task so a panic surfaces as a
	/// `JoinError` here instead of unwinding past the failure path.
	async fn supervise(self: &Arc<Self>, store: Store) {
		let body = {
			let inner = Arc::clone(self);
			let store = store.clone();
			tokio::spawn(async move { inner.run_job(&store).await })
		};

		let outcome = match body.await {
			Ok(result) => result,
			Err(join_error) => Err(ProvisioningError::Unexpected(panic_message(join_error))),
		};

		if let Err(err) = outcome {
			self.fail_store(&store, &err).await;
		}
	}

	#[tracing::instrument(skip(self, store), fields(store_id = %store.id, namespace = %store.namespace, engine = %store.engine))]
	async fn run_job(&self, store: &Store) -> Result<()> {
		let engine = self.engines.get(store.engine)?;

		self.cluster.create_namespace(&store.namespace).await?;

		let host = store_host(&store.namespace, &self.config.ingress_domain);
		let request = self.install_request(store, engine.as_ref(), &host);
		info!(chart = %request.chart.display(), "Installing store release");
		self.installer.install(&request).await?;

		info!("Helm install completed, waiting for readiness");
		let release = store.id.to_string();
		let ready = self
			.monitor
			.wait_for_ready(
				&store.namespace,
				&release,
				engine.as_ref(),
				self.config.ready_timeout,
			)
			.await;
		if !ready {
			return Err(ProvisioningError::ReadinessTimeout {
				secs: self.config.ready_timeout.as_secs(),
			});
		}

		let url = store_url(&self.config.scheme, &host);
		let admin_url = format!("{url}{}", engine.admin_path());
		self
			.store
			.update_store_status(&store.id, &StatusUpdate::ready(&url, admin_url))
			.await?;

		info!(url = %url, "Store is ready");
		Ok(())
	}

	fn install_request(
		&self,
		store: &Store,
		engine: &dyn EngineStrategy,
		host: &str,
	) -> InstallRequest {
		let release = store.id.to_string();
		let values = engine.install_values(&InstallContext {
			store_id: &release,
			host,
			admin_email: &self.config.admin_email,
			seed_demo_data: self.config.seed_demo_data,
		});

		InstallRequest {
			release: release.clone(),
			namespace: store.namespace.clone(),
			chart: engine.chart().to_path_buf(),
			values_file: Some(engine.chart().join(&self.config.values_file_name)),
			values,
			wait_timeout: engine.install_timeout(),
		}
	}

	/// Tear down what the attempt left behind, then persist Failed.
	async fn fail_store(&self, store: &Store, err: &ProvisioningError) {
		let message = err.to_string();
		error!(store_id = %store.id, namespace = %store.namespace, error = %message, "Provisioning failed, cleaning up");

		let report = cleanup::teardown(
			self.installer.as_ref(),
			self.cluster.as_ref(),
			store.id,
			&store.namespace,
			TeardownMode::BestEffort,
		)
		.await;
		if let Some(failure) = report.first_failure() {
			warn!(store_id = %store.id, error = %failure, "Cleanup after failed provisioning was incomplete");
		}
		self.remember_cleanup(report);

		if let Err(e) = self
			.store
			.update_store_status(&store.id, &StatusUpdate::failed(message))
			.await
		{
			error!(store_id = %store.id, error = %e, "Failed to mark store as failed");
		}
	}

	fn remember_cleanup(&self, report: CleanupReport) {
		lock(&self.cleanups).insert(report.store_id, report);
	}
}

fn panic_message(join_error: JoinError) -> String {
	if !join_error.is_panic() {
		return format!("provisioning job was cancelled: {join_error}");
	}

	let payload = join_error.into_panic();
	let detail = payload
		.downcast_ref::<&str>()
		.map(|s| s.to_string())
		.or_else(|| payload.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| "unknown panic".to_string());
	format!("provisioning job panicked: {detail}")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{MockClusterClient, MockHealthProbe, MockInstaller};
	use shopyard_server_db::testing::create_store_test_pool;
	use shopyard_server_db::StoreRepository;
	use std::time::Duration;

	struct Harness {
		provisioner: StoreProvisioner,
		repo: Arc<StoreRepository>,
		cluster: MockClusterClient,
		installer: MockInstaller,
	}

	fn fast_config() -> ProvisionerConfig {
		ProvisionerConfig {
			ready_timeout: Duration::from_millis(100),
			poll_interval: Duration::from_millis(10),
			..Default::default()
		}
	}

	async fn harness(
		cluster: MockClusterClient,
		installer: MockInstaller,
		probe: MockHealthProbe,
		config: ProvisionerConfig,
	) -> Harness {
		let repo = Arc::new(StoreRepository::new(create_store_test_pool().await));
		let provisioner = StoreProvisioner::new(
			repo.clone(),
			Arc::new(cluster.clone()),
			Arc::new(installer.clone()),
			Arc::new(probe),
			config,
		);
		Harness {
			provisioner,
			repo,
			cluster,
			installer,
		}
	}

	async fn happy_harness() -> Harness {
		harness(
			MockClusterClient::ready_on_create(),
			MockInstaller::new(),
			MockHealthProbe::healthy(),
			fast_config(),
		)
		.await
	}

	mod admission {
		use super::*;

		#[tokio::test]
		async fn rejects_blank_names() {
			let h = happy_harness().await;
			let err = h
				.provisioner
				.create_store("   ", EngineKind::WooCommerce, None)
				.await
				.unwrap_err();
			assert!(matches!(err, ProvisioningError::Validation(_)));
			assert_eq!(h.repo.count_stores().await.unwrap(), 0);
		}

		#[tokio::test]
		async fn global_cap_persists_nothing() {
			let config = ProvisionerConfig {
				max_stores: 1,
				..fast_config()
			};
			let h = harness(
				MockClusterClient::ready_on_create(),
				MockInstaller::new(),
				MockHealthProbe::healthy(),
				config,
			)
			.await;

			h.provisioner
				.create_store("First", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			let err = h
				.provisioner
				.create_store("Second", EngineKind::WooCommerce, None)
				.await
				.unwrap_err();
			assert!(matches!(
				err,
				ProvisioningError::AdmissionRejected {
					capacity: CapacityKind::GlobalStores,
					..
				}
			));
			assert_eq!(h.repo.count_stores().await.unwrap(), 1);
			assert_eq!(h.installer.install_count(), 1);
		}

		#[tokio::test]
		async fn owner_cap_only_counts_that_owner() {
			let config = ProvisionerConfig {
				max_stores_per_owner: 1,
				..fast_config()
			};
			let h = harness(
				MockClusterClient::ready_on_create(),
				MockInstaller::new(),
				MockHealthProbe::healthy(),
				config,
			)
			.await;

			h.provisioner
				.create_store("One", EngineKind::Medusa, Some("u1"))
				.await
				.unwrap();
			let err = h
				.provisioner
				.create_store("Two", EngineKind::Medusa, Some("u1"))
				.await
				.unwrap_err();
			assert!(matches!(
				err,
				ProvisioningError::AdmissionRejected {
					capacity: CapacityKind::OwnerStores,
					..
				}
			));

			h.provisioner
				.create_store("Other", EngineKind::Medusa, Some("u2"))
				.await
				.unwrap();
			h.provisioner
				.create_store("Anonymous", EngineKind::Medusa, None)
				.await
				.unwrap();
			h.provisioner.drain().await;
			assert_eq!(h.repo.count_stores().await.unwrap(), 3);
		}

		#[tokio::test]
		async fn concurrency_cap_rejects_while_jobs_run() {
			let config = ProvisionerConfig {
				max_concurrent_provisions: 1,
				..fast_config()
			};
			let installer = MockInstaller::new().gated();
			let h = harness(
				MockClusterClient::ready_on_create(),
				installer.clone(),
				MockHealthProbe::healthy(),
				config,
			)
			.await;

			h.provisioner
				.create_store("Busy", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			assert_eq!(h.provisioner.in_flight(), 1);

			let err = h
				.provisioner
				.create_store("Waiting", EngineKind::WooCommerce, None)
				.await
				.unwrap_err();
			assert!(matches!(
				err,
				ProvisioningError::AdmissionRejected {
					capacity: CapacityKind::ConcurrentProvisions,
					..
				}
			));
			assert_eq!(h.repo.count_stores().await.unwrap(), 1);

			installer.release(2);
			h.provisioner.drain().await;
			assert_eq!(h.provisioner.in_flight(), 0);

			h.provisioner
				.create_store("Waiting", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;
		}

		#[tokio::test]
		async fn duplicate_names_get_a_suffix() {
			let h = happy_harness().await;
			let first = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			let second = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			assert_eq!(first.namespace, "store-acme");
			assert!(second.namespace.starts_with("store-acme-"));
			assert_eq!(second.namespace.len(), "store-acme-".len() + SUFFIX_LENGTH);
		}

		#[tokio::test]
		async fn concurrent_creates_never_share_a_namespace() {
			let h = happy_harness().await;
			let (a, b) = tokio::join!(
				h.provisioner
					.create_store("Acme", EngineKind::WooCommerce, None),
				h.provisioner
					.create_store("Acme", EngineKind::WooCommerce, None),
			);
			let (a, b) = (a.unwrap(), b.unwrap());
			h.provisioner.drain().await;

			assert_ne!(a.namespace, b.namespace);
			assert_eq!(h.repo.count_stores().await.unwrap(), 2);
		}
	}

	mod jobs {
		use super::*;

		#[tokio::test]
		async fn successful_job_marks_ready() {
			let h = happy_harness().await;
			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, Some("u1"))
				.await
				.unwrap();
			assert_eq!(created.status, StoreStatus::Provisioning);
			assert_eq!(created.namespace, "store-acme");

			h.provisioner.drain().await;

			let store = h.provisioner.get_store(&created.id).await.unwrap();
			assert_eq!(store.status, StoreStatus::Ready);
			assert_eq!(store.url.as_deref(), Some("http://acme.localhost"));
			assert_eq!(
				store.admin_url.as_deref(),
				Some("http://acme.localhost/wp-admin")
			);
			assert_eq!(store.error_message, None);
			assert_eq!(h.installer.uninstall_count(), 0);
			assert_eq!(h.provisioner.in_flight(), 0);
		}

		#[tokio::test]
		async fn install_request_is_engine_specific() {
			let h = happy_harness().await;
			let created = h
				.provisioner
				.create_store("Medusa Shop", EngineKind::Medusa, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			let requests = h.installer.install_requests();
			assert_eq!(requests.len(), 1);
			let request = &requests[0];
			assert_eq!(request.release, created.id.to_string());
			assert_eq!(request.namespace, "store-medusa-shop");
			assert_eq!(request.chart, std::path::PathBuf::from("helm/medusa-store"));
			assert_eq!(
				request.values_file,
				Some(std::path::PathBuf::from("helm/medusa-store/values-local.yaml"))
			);
			assert_eq!(request.wait_timeout, Duration::from_secs(600));
			assert_eq!(
				request.value("ingress.host").and_then(|v| v.plain_value()),
				Some("medusa-shop.localhost")
			);

			let store = h.provisioner.get_store(&created.id).await.unwrap();
			assert_eq!(
				store.admin_url.as_deref(),
				Some("http://medusa-shop.localhost/app")
			);
		}

		#[tokio::test]
		async fn install_failure_cleans_up_then_fails() {
			let h = harness(
				MockClusterClient::ready_on_create(),
				MockInstaller::new().failing("chart not found"),
				MockHealthProbe::healthy(),
				fast_config(),
			)
			.await;

			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			let store = h.provisioner.get_store(&created.id).await.unwrap();
			assert_eq!(store.status, StoreStatus::Failed);
			assert_eq!(
				store.error_message.as_deref(),
				Some("Helm install failed: chart not found")
			);
			assert_eq!(h.installer.uninstall_count(), 1);
			assert_eq!(h.cluster.delete_calls("store-acme"), 1);

			let report = h.provisioner.last_cleanup(&created.id).unwrap();
			assert!(report.is_clean());
		}

		#[tokio::test]
		async fn readiness_timeout_fails_store() {
			let h = harness(
				MockClusterClient::ready_on_create(),
				MockInstaller::new(),
				MockHealthProbe::unhealthy(),
				fast_config(),
			)
			.await;

			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			let store = h.provisioner.get_store(&created.id).await.unwrap();
			assert_eq!(store.status, StoreStatus::Failed);
			assert!(store
				.error_message
				.unwrap()
				.contains("did not become ready"));
			assert_eq!(h.installer.uninstall_count(), 1);
			assert_eq!(h.cluster.delete_calls("store-acme"), 1);
		}

		#[tokio::test]
		async fn namespace_error_fails_store() {
			let h = harness(
				MockClusterClient::new().with_create_namespace_error("quota exceeded"),
				MockInstaller::new(),
				MockHealthProbe::healthy(),
				fast_config(),
			)
			.await;

			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			let store = h.provisioner.get_store(&created.id).await.unwrap();
			assert_eq!(store.status, StoreStatus::Failed);
			assert_eq!(
				store.error_message.as_deref(),
				Some("K8s API error: quota exceeded")
			);
			assert_eq!(h.installer.install_count(), 0);
			assert_eq!(h.installer.uninstall_count(), 1);
		}

		#[tokio::test]
		async fn panicking_job_still_fails_and_releases_permit() {
			let h = harness(
				MockClusterClient::ready_on_create(),
				MockInstaller::new().panicking(),
				MockHealthProbe::healthy(),
				fast_config(),
			)
			.await;

			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			let store = h.provisioner.get_store(&created.id).await.unwrap();
			assert_eq!(store.status, StoreStatus::Failed);
			assert!(store.error_message.unwrap().contains("panicked"));
			assert_eq!(h.installer.uninstall_count(), 1);
			assert_eq!(h.provisioner.in_flight(), 0);
		}
	}

	mod concurrency {
		use super::*;
		use shopyard_server_k8s::ControllerKind;
		use tokio::task::JoinSet;

		#[tokio::test]
		async fn mixed_outcomes_all_settle_and_release_slots() {
			let cluster = MockClusterClient::ready_on_create()
				.with_replicas("store-slow-a", ControllerKind::Deployment, "wordpress", 0, 1)
				.with_replicas("store-slow-b", ControllerKind::Deployment, "wordpress", 0, 1);
			let installer = MockInstaller::new()
				.gated()
				.failing_in("store-broken-a", "chart rejected")
				.failing_in("store-broken-b", "chart rejected")
				.panicking_in("store-crash-a")
				.panicking_in("store-crash-b");
			let config = ProvisionerConfig {
				max_concurrent_provisions: 8,
				..fast_config()
			};
			let h = harness(cluster, installer.clone(), MockHealthProbe::healthy(), config).await;

			let names = [
				"Fine A", "Fine B", "Broken A", "Broken B", "Slow A", "Slow B", "Crash A", "Crash B",
			];
			let mut creates = JoinSet::new();
			for name in names {
				let provisioner = h.provisioner.clone();
				creates.spawn(async move {
					provisioner
						.create_store(name, EngineKind::WooCommerce, None)
						.await
				});
			}
			while let Some(created) = creates.join_next().await {
				created.unwrap().unwrap();
			}
			assert_eq!(h.provisioner.in_flight(), names.len());

			installer.release(names.len());
			h.provisioner.drain().await;
			assert_eq!(h.provisioner.in_flight(), 0);

			for store in h.provisioner.list_stores(None).await.unwrap() {
				let expected = if store.namespace.starts_with("store-fine") {
					StoreStatus::Ready
				} else {
					StoreStatus::Failed
				};
				assert_eq!(store.status, expected, "{}", store.namespace);
			}
			assert_eq!(h.installer.uninstall_count(), 6);
			for ns in ["store-broken-a", "store-slow-b", "store-crash-a"] {
				assert_eq!(h.cluster.delete_calls(ns), 1, "{ns}");
			}

			// Every slot is free again.
			for name in ["Again A", "Again B", "Again C"] {
				h.provisioner
					.create_store(name, EngineKind::WooCommerce, None)
					.await
					.unwrap();
			}
			installer.release(3);
			h.provisioner.drain().await;
			assert_eq!(h.provisioner.in_flight(), 0);
		}
	}

	mod failure_ordering {
		use super::*;
		use async_trait::async_trait;
		use shopyard_server_helm::InstallerResult;
		use shopyard_server_k8s::{
			ControllerKind, Deployment, Event, Ingress, K8sResult, K8sSecret,
			PersistentVolumeClaim, Pod, ReplicaCounts, Service, StatefulSet,
		};

		/// Records the persisted store status whenever teardown touches the
		/// installer or the cluster.
		#[derive(Clone)]
		struct Recorder {
			installer: MockInstaller,
			cluster: MockClusterClient,
			repo: Arc<StoreRepository>,
			seen: Arc<Mutex<Vec<(&'static str, Option<StoreStatus>)>>>,
		}

		impl Recorder {
			async fn record(&self, step: &'static str, namespace: &str) {
				let status = self
					.repo
					.get_store_by_namespace(namespace)
					.await
					.unwrap()
					.map(|s| s.status);
				lock(&self.seen).push((step, status));
			}

			fn seen(&self) -> Vec<(&'static str, Option<StoreStatus>)> {
				lock(&self.seen).clone()
			}
		}

		#[async_trait]
		impl Installer for Recorder {
			async fn install(&self, request: &InstallRequest) -> InstallerResult<()> {
				self.installer.install(request).await
			}

			async fn uninstall(&self, release: &str, namespace: &str) -> InstallerResult<()> {
				self.record("uninstall", namespace).await;
				self.installer.uninstall(release, namespace).await
			}

			async fn check(&self) -> InstallerResult<String> {
				self.installer.check().await
			}
		}

		#[async_trait]
		impl ClusterClient for Recorder {
			async fn create_namespace(&self, name: &str) -> K8sResult<()> {
				self.cluster.create_namespace(name).await
			}

			async fn delete_namespace(&self, name: &str) -> K8sResult<()> {
				self.record("delete_namespace", name).await;
				self.cluster.delete_namespace(name).await
			}

			async fn namespace_exists(&self, name: &str) -> K8sResult<bool> {
				self.cluster.namespace_exists(name).await
			}

			async fn controller_replicas(
				&self,
				namespace: &str,
				kind: ControllerKind,
				name: &str,
			) -> K8sResult<Option<ReplicaCounts>> {
				self.cluster.controller_replicas(namespace, kind, name).await
			}

			async fn ingress_host(&self, namespace: &str, name: &str) -> K8sResult<Option<String>> {
				self.cluster.ingress_host(namespace, name).await
			}

			async fn pods(&self, namespace: &str) -> Vec<Pod> {
				self.cluster.pods(namespace).await
			}

			async fn deployments(&self, namespace: &str) -> Vec<Deployment> {
				self.cluster.deployments(namespace).await
			}

			async fn stateful_sets(&self, namespace: &str) -> Vec<StatefulSet> {
				self.cluster.stateful_sets(namespace).await
			}

			async fn services(&self, namespace: &str) -> Vec<Service> {
				self.cluster.services(namespace).await
			}

			async fn ingresses(&self, namespace: &str) -> Vec<Ingress> {
				self.cluster.ingresses(namespace).await
			}

			async fn secrets(&self, namespace: &str) -> Vec<K8sSecret> {
				self.cluster.secrets(namespace).await
			}

			async fn pvcs(&self, namespace: &str) -> Vec<PersistentVolumeClaim> {
				self.cluster.pvcs(namespace).await
			}

			async fn events(&self, namespace: &str) -> Vec<Event> {
				self.cluster.events(namespace).await
			}

			async fn check_connectivity(&self) -> bool {
				self.cluster.check_connectivity().await
			}
		}

		async fn run_failing(installer: MockInstaller, storefront: MockHealthProbe) -> (Recorder, Store) {
			let repo = Arc::new(StoreRepository::new(create_store_test_pool().await));
			let recorder = Recorder {
				installer,
				cluster: MockClusterClient::ready_on_create(),
				repo: repo.clone(),
				seen: Arc::new(Mutex::new(Vec::new())),
			};
			let provisioner = StoreProvisioner::new(
				repo,
				Arc::new(recorder.clone()),
				Arc::new(recorder.clone()),
				Arc::new(storefront),
				fast_config(),
			);

			let created = provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			provisioner.drain().await;
			let store = provisioner.get_store(&created.id).await.unwrap();
			(recorder, store)
		}

		fn assert_cleaned_while_provisioning(recorder: &Recorder) {
			assert_eq!(
				recorder.seen(),
				vec![
					("uninstall", Some(StoreStatus::Provisioning)),
					("delete_namespace", Some(StoreStatus::Provisioning)),
				]
			);
		}

		#[tokio::test]
		async fn install_failure_tears_down_before_marking_failed() {
			let (recorder, store) =
				run_failing(MockInstaller::new().failing("boom"), MockHealthProbe::healthy()).await;
			assert_cleaned_while_provisioning(&recorder);
			assert_eq!(store.status, StoreStatus::Failed);
		}

		#[tokio::test]
		async fn readiness_timeout_tears_down_before_marking_failed() {
			let (recorder, store) =
				run_failing(MockInstaller::new(), MockHealthProbe::unhealthy()).await;
			assert_cleaned_while_provisioning(&recorder);
			assert_eq!(store.status, StoreStatus::Failed);
		}

		#[tokio::test]
		async fn panic_tears_down_before_marking_failed() {
			let (recorder, store) =
				run_failing(MockInstaller::new().panicking(), MockHealthProbe::healthy()).await;
			assert_cleaned_while_provisioning(&recorder);
			assert_eq!(store.status, StoreStatus::Failed);
		}
	}

	mod retry {
		use super::*;

		#[tokio::test]
		async fn retry_of_non_failed_store_is_rejected() {
			let h = happy_harness().await;
			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			let before = h.provisioner.get_store(&created.id).await.unwrap();
			let err = h.provisioner.retry_store(&created.id).await.unwrap_err();
			assert!(matches!(
				err,
				ProvisioningError::InvalidTransition {
					status: StoreStatus::Ready,
					..
				}
			));

			let after = h.provisioner.get_store(&created.id).await.unwrap();
			assert_eq!(before, after);
			assert_eq!(h.installer.install_count(), 1);
		}

		#[tokio::test]
		async fn retry_runs_a_fresh_attempt() {
			let h = harness(
				MockClusterClient::ready_on_create(),
				MockInstaller::new().with_install_failures(1, "timed out waiting for the condition"),
				MockHealthProbe::healthy(),
				fast_config(),
			)
			.await;

			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;
			assert_eq!(
				h.provisioner.get_store(&created.id).await.unwrap().status,
				StoreStatus::Failed
			);

			let retried = h.provisioner.retry_store(&created.id).await.unwrap();
			assert_eq!(retried.status, StoreStatus::Provisioning);
			assert_eq!(retried.error_message, None);

			h.provisioner.drain().await;
			let store = h.provisioner.get_store(&created.id).await.unwrap();
			assert_eq!(store.status, StoreStatus::Ready);

			let requests = h.installer.install_requests();
			assert_eq!(requests.len(), 2);
			let password = |r: &InstallRequest| match r.value("wordpress.adminPassword") {
				Some(shopyard_server_helm::ValueOverride::Secret { value, .. }) => value.clone(),
				other => panic!("expected secret, got {other:?}"),
			};
			assert_ne!(password(&requests[0]), password(&requests[1]));
		}

		#[tokio::test]
		async fn retry_of_missing_store_is_not_found() {
			let h = happy_harness().await;
			let err = h.provisioner.retry_store(&StoreId::new()).await.unwrap_err();
			assert!(matches!(err, ProvisioningError::NotFound { .. }));
		}
	}

	mod delete {
		use super::*;

		#[tokio::test]
		async fn delete_removes_record_and_namespace() {
			let h = happy_harness().await;
			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			h.provisioner.delete_store(&created.id).await.unwrap();

			assert!(matches!(
				h.provisioner.get_store(&created.id).await,
				Err(ProvisioningError::NotFound { .. })
			));
			assert!(!h.cluster.has_namespace("store-acme"));
			assert!(h.provisioner.last_cleanup(&created.id).is_none());
		}

		#[tokio::test]
		async fn missing_release_still_deletes() {
			let h = harness(
				MockClusterClient::ready_on_create(),
				MockInstaller::new().with_missing_release(),
				MockHealthProbe::healthy(),
				fast_config(),
			)
			.await;
			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			h.provisioner.delete_store(&created.id).await.unwrap();
			assert_eq!(h.repo.count_stores().await.unwrap(), 0);
		}

		#[tokio::test]
		async fn uninstall_failure_keeps_record_failed() {
			let h = harness(
				MockClusterClient::ready_on_create(),
				MockInstaller::new().with_uninstall_error("connection reset"),
				MockHealthProbe::healthy(),
				fast_config(),
			)
			.await;
			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			let err = h.provisioner.delete_store(&created.id).await.unwrap_err();
			assert!(matches!(err, ProvisioningError::Teardown(_)));

			let store = h.provisioner.get_store(&created.id).await.unwrap();
			assert_eq!(store.status, StoreStatus::Failed);
			assert!(store
				.error_message
				.unwrap()
				.starts_with("Deletion failed"));
			assert!(h.cluster.has_namespace("store-acme"));
			assert!(h.provisioner.last_cleanup(&created.id).is_some());
		}

		/// Delegates to a real repository but cannot remove records.
		struct UndeletableRecords(Arc<StoreRepository>);

		#[async_trait::async_trait]
		impl StoreStore for UndeletableRecords {
			async fn create_store(&self, new: &NewStore) -> shopyard_server_db::Result<Store> {
				self.0.create_store(new).await
			}

			async fn get_store_by_id(&self, id: &StoreId) -> shopyard_server_db::Result<Option<Store>> {
				self.0.get_store_by_id(id).await
			}

			async fn get_store_by_namespace(
				&self,
				namespace: &str,
			) -> shopyard_server_db::Result<Option<Store>> {
				self.0.get_store_by_namespace(namespace).await
			}

			async fn namespace_exists(&self, namespace: &str) -> shopyard_server_db::Result<bool> {
				self.0.namespace_exists(namespace).await
			}

			async fn list_stores(&self) -> shopyard_server_db::Result<Vec<Store>> {
				self.0.list_stores().await
			}

			async fn list_stores_by_owner(&self, owner_id: &str) -> shopyard_server_db::Result<Vec<Store>> {
				self.0.list_stores_by_owner(owner_id).await
			}

			async fn list_stores_by_status(
				&self,
				status: StoreStatus,
			) -> shopyard_server_db::Result<Vec<Store>> {
				self.0.list_stores_by_status(status).await
			}

			async fn update_store_status(
				&self,
				id: &StoreId,
				update: &StatusUpdate,
			) -> shopyard_server_db::Result<()> {
				self.0.update_store_status(id, update).await
			}

			async fn transition_store_status(
				&self,
				id: &StoreId,
				from: StoreStatus,
				update: &StatusUpdate,
			) -> shopyard_server_db::Result<bool> {
				self.0.transition_store_status(id, from, update).await
			}

			async fn delete_store(&self, _id: &StoreId) -> shopyard_server_db::Result<bool> {
				Err(DbError::Internal("disk I/O error".to_string()))
			}

			async fn count_stores(&self) -> shopyard_server_db::Result<i64> {
				self.0.count_stores().await
			}

			async fn count_stores_by_owner(&self, owner_id: &str) -> shopyard_server_db::Result<i64> {
				self.0.count_stores_by_owner(owner_id).await
			}

			async fn ping(&self) -> shopyard_server_db::Result<()> {
				self.0.ping().await
			}
		}

		#[tokio::test]
		async fn record_removal_failure_marks_failed() {
			let repo = Arc::new(StoreRepository::new(create_store_test_pool().await));
			let cluster = MockClusterClient::ready_on_create();
			let provisioner = StoreProvisioner::new(
				Arc::new(UndeletableRecords(repo.clone())),
				Arc::new(cluster.clone()),
				Arc::new(MockInstaller::new()),
				Arc::new(MockHealthProbe::healthy()),
				fast_config(),
			);
			let created = provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			provisioner.drain().await;

			let err = provisioner.delete_store(&created.id).await.unwrap_err();
			assert!(matches!(err, ProvisioningError::Database(_)));
			assert!(!cluster.has_namespace("store-acme"));

			let store = provisioner.get_store(&created.id).await.unwrap();
			assert_eq!(store.status, StoreStatus::Failed);
			assert_eq!(
				store.error_message.as_deref(),
				Some("Deletion failed: Internal: disk I/O error")
			);
		}

		#[tokio::test]
		async fn delete_missing_store_is_not_found() {
			let h = happy_harness().await;
			let err = h.provisioner.delete_store(&StoreId::new()).await.unwrap_err();
			assert!(matches!(err, ProvisioningError::NotFound { .. }));
		}
	}

	mod reads {
		use super::*;

		#[tokio::test]
		async fn status_view_and_listing() {
			let h = happy_harness().await;
			let a = h
				.provisioner
				.create_store("Alpha", EngineKind::WooCommerce, Some("u1"))
				.await
				.unwrap();
			let b = h
				.provisioner
				.create_store("Beta", EngineKind::Medusa, Some("u2"))
				.await
				.unwrap();
			h.provisioner.drain().await;

			let all = h.provisioner.list_stores(None).await.unwrap();
			assert_eq!(all.len(), 2);
			assert_eq!(all[0].id, b.id);

			let mine = h.provisioner.list_stores(Some("u1")).await.unwrap();
			assert_eq!(mine.len(), 1);
			assert_eq!(mine[0].id, a.id);

			let view = h.provisioner.get_store_status(&a.id).await.unwrap();
			assert_eq!(view.status, StoreStatus::Ready);
			assert_eq!(view.url.as_deref(), Some("http://alpha.localhost"));
		}

		#[tokio::test]
		async fn detail_of_ready_store() {
			let h = happy_harness().await;
			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();
			h.provisioner.drain().await;

			let detail = h.provisioner.get_store_detail(&created.id).await.unwrap();
			assert_eq!(detail.store.id, created.id);
			assert_eq!(detail.provisioning_steps.len(), 5);
			assert!(detail.provisioning_steps[0].completed);
			assert!(detail.provisioning_steps[4].completed);
			assert_eq!(detail.quotas.cpu_limit, "500m");
			assert!(detail.last_cleanup.is_none());
		}

		#[tokio::test]
		async fn detail_of_missing_store_is_not_found() {
			let h = happy_harness().await;
			assert!(matches!(
				h.provisioner.get_store_detail(&StoreId::new()).await,
				Err(ProvisioningError::NotFound { .. })
			));
		}

		#[tokio::test]
		async fn health_reports_each_component() {
			let h = harness(
				MockClusterClient::new().disconnected(),
				MockInstaller::new(),
				MockHealthProbe::healthy(),
				fast_config(),
			)
			.await;

			let report = h.provisioner.health().await;
			assert!(report.database.is_healthy());
			assert!(!report.kubernetes.is_healthy());
			assert!(report.helm.is_healthy());
			assert!(!report.is_healthy());
		}
	}

	mod recovery {
		use super::*;

		#[tokio::test]
		async fn interrupted_stores_become_failed() {
			let h = happy_harness().await;

			let provisioning = NewStore {
				id: StoreId::new(),
				engine: EngineKind::WooCommerce,
				name: "Stuck".to_string(),
				namespace: "store-stuck".to_string(),
				owner_id: None,
			};
			let deleting = NewStore {
				id: StoreId::new(),
				engine: EngineKind::Medusa,
				name: "Going".to_string(),
				namespace: "store-going".to_string(),
				owner_id: None,
			};
			h.repo.create_store(&provisioning).await.unwrap();
			h.repo.create_store(&deleting).await.unwrap();
			h.repo
				.update_store_status(&deleting.id, &StatusUpdate::deleting())
				.await
				.unwrap();

			let report = h.provisioner.recover_interrupted().await.unwrap();
			assert_eq!(report.provisioning, vec![provisioning.id]);
			assert_eq!(report.deleting, vec![deleting.id]);
			assert_eq!(report.recovered(), 2);

			let stuck = h.provisioner.get_store(&provisioning.id).await.unwrap();
			assert_eq!(stuck.status, StoreStatus::Failed);
			assert_eq!(h.installer.uninstall_count(), 1);
			assert_eq!(h.cluster.delete_calls("store-stuck"), 1);

			let going = h.provisioner.get_store(&deleting.id).await.unwrap();
			assert_eq!(going.status, StoreStatus::Failed);
			assert_eq!(
				going.error_message.as_deref(),
				Some("Deletion failed: interrupted")
			);
		}

		#[tokio::test]
		async fn active_jobs_are_not_recovered() {
			let installer = MockInstaller::new().gated();
			let h = harness(
				MockClusterClient::ready_on_create(),
				installer.clone(),
				MockHealthProbe::healthy(),
				fast_config(),
			)
			.await;

			let created = h
				.provisioner
				.create_store("Acme", EngineKind::WooCommerce, None)
				.await
				.unwrap();

			let report = h.provisioner.recover_interrupted().await.unwrap();
			assert_eq!(report.skipped_active, vec![created.id]);
			assert_eq!(report.recovered(), 0);

			installer.release(1);
			h.provisioner.drain().await;
			assert_eq!(
				h.provisioner.get_store(&created.id).await.unwrap().status,
				StoreStatus::Ready
			);
		}
	}
}
