// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Store repository for database operations.
//!
//! One row per provisioned store. The namespace column is UNIQUE so two
//! concurrent admissions can never claim the same cluster namespace.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;

use crate::error::{DbError, Result};
use crate::types::{EngineKind, NewStore, StatusUpdate, Store, StoreId, StoreStatus};

#[async_trait]
pub trait StoreStore: Send + Sync {
	async fn create_store(&self, new: &NewStore) -> Result<Store>;
	async fn get_store_by_id(&self, id: &StoreId) -> Result<Option<Store>>;
	async fn get_store_by_namespace(&self, namespace: &str) -> Result<Option<Store>>;
	async fn namespace_exists(&self, namespace: &str) -> Result<bool>;
	async fn list_stores(&self) -> Result<Vec<Store>>;
	async fn list_stores_by_owner(&self, owner_id: &str) -> Result<Vec<Store>>;
	async fn list_stores_by_status(&self, status: StoreStatus) -> Result<Vec<Store>>;
	async fn update_store_status(&self, id: &StoreId, update: &StatusUpdate) -> Result<()>;
	async fn transition_store_status(
		&self,
		id: &StoreId,
		from: StoreStatus,
		update: &StatusUpdate,
	) -> Result<bool>;
	async fn delete_store(&self, id: &StoreId) -> Result<bool>;
	async fn count_stores(&self) -> Result<i64>;
	async fn count_stores_by_owner(&self, owner_id: &str) -> Result<i64>;
	async fn ping(&self) -> Result<()>;
}

type StoreRow = (
	String,
	String,
	String,
	String,
	String,
	Option<String>,
	Option<String>,
	Option<String>,
	Option<String>,
	DateTime<Utc>,
	DateTime<Utc>,
);

const STORE_COLUMNS: &str = "id, engine, name, namespace, status, url, admin_url, error_message, owner_id, created_at, updated_at";

fn row_to_store(row: StoreRow) -> Result<Store> {
	let (
		id,
		engine,
		name,
		namespace,
		status,
		url,
		admin_url,
		error_message,
		owner_id,
		created_at,
		updated_at,
	) = row;

	Ok(Store {
		id: id
			.parse()
			.map_err(|e| DbError::Internal(format!("invalid store id {id}: {e}")))?,
		engine: engine
			.parse::<EngineKind>()
			.map_err(DbError::Internal)?,
		name,
		namespace,
		status: status
			.parse::<StoreStatus>()
			.map_err(DbError::Internal)?,
		url,
		admin_url,
		error_message,
		owner_id,
		created_at,
		updated_at,
	})
}

#[derive(Clone)]
pub struct StoreRepository {
	pool: SqlitePool,
}

impl StoreRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert a new store in the Provisioning state.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the id or namespace is already taken.
	#[tracing::instrument(skip(self, new), fields(store_id = %new.id, namespace = %new.namespace))]
	pub async fn create_store(&self, new: &NewStore) -> Result<Store> {
		let now = Utc::now();
		sqlx::query(
			r#"
			INSERT INTO stores (id, engine, name, namespace, status, owner_id, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(new.id.to_string())
		.bind(new.engine.as_str())
		.bind(&new.name)
		.bind(&new.namespace)
		.bind(StoreStatus::Provisioning.as_str())
		.bind(&new.owner_id)
		.bind(now)
		.bind(now)
		.execute(&self.pool)
		.await
		.map_err(|e| DbError::from_insert(e, &format!("namespace {}", new.namespace)))?;

		tracing::debug!("store record created");

		Ok(Store {
			id: new.id,
			engine: new.engine,
			name: new.name.clone(),
			namespace: new.namespace.clone(),
			status: StoreStatus::Provisioning,
			url: None,
			admin_url: None,
			error_message: None,
			owner_id: new.owner_id.clone(),
			created_at: now,
			updated_at: now,
		})
	}

	#[tracing::instrument(skip(self), fields(store_id = %id))]
	pub async fn get_store_by_id(&self, id: &StoreId) -> Result<Option<Store>> {
		let row = sqlx::query_as::<_, StoreRow>(&format!(
			"SELECT {STORE_COLUMNS} FROM stores WHERE id = ?"
		))
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(row_to_store).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_store_by_namespace(&self, namespace: &str) -> Result<Option<Store>> {
		let row = sqlx::query_as::<_, StoreRow>(&format!(
			"SELECT {STORE_COLUMNS} FROM stores WHERE namespace = ?"
		))
		.bind(namespace)
		.fetch_optional(&self.pool)
		.await?;

		row.map(row_to_store).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stores WHERE namespace = ?")
			.bind(namespace)
			.fetch_one(&self.pool)
			.await?;

		Ok(count > 0)
	}

	/// All stores, newest first.
	#[tracing::instrument(skip(self))]
	pub async fn list_stores(&self) -> Result<Vec<Store>> {
		let rows = sqlx::query_as::<_, StoreRow>(&format!(
			"SELECT {STORE_COLUMNS} FROM stores ORDER BY created_at DESC, id DESC"
		))
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(row_to_store).collect()
	}

	/// An owner's stores, newest first.
	#[tracing::instrument(skip(self))]
	pub async fn list_stores_by_owner(&self, owner_id: &str) -> Result<Vec<Store>> {
		let rows = sqlx::query_as::<_, StoreRow>(&format!(
			"SELECT {STORE_COLUMNS} FROM stores WHERE owner_id = ? ORDER BY created_at DESC, id DESC"
		))
		.bind(owner_id)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(row_to_store).collect()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_stores_by_status(&self, status: StoreStatus) -> Result<Vec<Store>> {
		let rows = sqlx::query_as::<_, StoreRow>(&format!(
			"SELECT {STORE_COLUMNS} FROM stores WHERE status = ? ORDER BY created_at ASC, id ASC"
		))
		.bind(status.as_str())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(row_to_store).collect()
	}

	/// Apply a status update unconditionally.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if no store has this id.
	#[tracing::instrument(skip(self, update), fields(store_id = %id, status = %update.status))]
	pub async fn update_store_status(&self, id: &StoreId, update: &StatusUpdate) -> Result<()> {
		let result = Self::status_query(update, None)
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("store {id}")));
		}

		Ok(())
	}

	/// Apply a status update only if the store is currently in `from`.
	///
	/// Returns `false` when the store exists but is in another state.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if no store has this id.
	#[tracing::instrument(skip(self, update), fields(store_id = %id, from = %from, status = %update.status))]
	pub async fn transition_store_status(
		&self,
		id: &StoreId,
		from: StoreStatus,
		update: &StatusUpdate,
	) -> Result<bool> {
		let result = Self::status_query(update, Some(from))
			.bind(id.to_string())
			.bind(from.as_str())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() > 0 {
			return Ok(true);
		}

		match self.get_store_by_id(id).await? {
			Some(_) => Ok(false),
			None => Err(DbError::NotFound(format!("store {id}"))),
		}
	}

	fn status_query(
		update: &StatusUpdate,
		guard: Option<StoreStatus>,
	) -> sqlx::query::Query<'static, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'static>> {
		let sql = if guard.is_some() {
			STATUS_UPDATE_SQL_GUARDED
		} else {
			STATUS_UPDATE_SQL
		};

		sqlx::query(sql)
			.bind(update.status.as_str())
			.bind(update.url.is_some())
			.bind(update.url.clone().flatten())
			.bind(update.admin_url.is_some())
			.bind(update.admin_url.clone().flatten())
			.bind(update.error_message.is_some())
			.bind(update.error_message.clone().flatten())
			.bind(Utc::now())
	}

	/// Physically remove a store record.
	#[tracing::instrument(skip(self), fields(store_id = %id))]
	pub async fn delete_store(&self, id: &StoreId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM stores WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self))]
	pub async fn count_stores(&self) -> Result<i64> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stores")
			.fetch_one(&self.pool)
			.await?;

		Ok(count)
	}

	/// Count an owner's stores, not counting ones already being deleted.
	#[tracing::instrument(skip(self))]
	pub async fn count_stores_by_owner(&self, owner_id: &str) -> Result<i64> {
		let (count,): (i64,) =
			sqlx::query_as("SELECT COUNT(*) FROM stores WHERE owner_id = ? AND status != ?")
				.bind(owner_id)
				.bind(StoreStatus::Deleting.as_str())
				.fetch_one(&self.pool)
				.await?;

		Ok(count)
	}

	#[tracing::instrument(skip(self))]
	pub async fn ping(&self) -> Result<()> {
		sqlx::query("SELECT 1").execute(&self.pool).await?;
		Ok(())
	}
}

const STATUS_UPDATE_SQL: &str = r#"
	UPDATE stores
	SET status = ?,
		url = CASE WHEN ? THEN ? ELSE url END,
		admin_url = CASE WHEN ? THEN ? ELSE admin_url END,
		error_message = CASE WHEN ? THEN ? ELSE error_message END,
		updated_at = ?
	WHERE id = ?
"#;

const STATUS_UPDATE_SQL_GUARDED: &str = r#"
	UPDATE stores
	SET status = ?,
		url = CASE WHEN ? THEN ? ELSE url END,
		admin_url = CASE WHEN ? THEN ? ELSE admin_url END,
		error_message = CASE WHEN ? THEN ? ELSE error_message END,
		updated_at = ?
	WHERE id = ? AND status = ?
"#;

#[async_trait]
impl StoreStore for StoreRepository {
	async fn create_store(&self, new: &NewStore) -> Result<Store> {
		self.create_store(new).await
	}

	async fn get_store_by_id(&self, id: &StoreId) -> Result<Option<Store>> {
		self.get_store_by_id(id).await
	}

	async fn get_store_by_namespace(&self, namespace: &str) -> Result<Option<Store>> {
		self.get_store_by_namespace(namespace).await
	}

	async fn namespace_exists(&self, namespace: &str) -> Result<bool> {
		self.namespace_exists(namespace).await
	}

	async fn list_stores(&self) -> Result<Vec<Store>> {
		self.list_stores().await
	}

	async fn list_stores_by_owner(&self, owner_id: &str) -> Result<Vec<Store>> {
		self.list_stores_by_owner(owner_id).await
	}

	async fn list_stores_by_status(&self, status: StoreStatus) -> Result<Vec<Store>> {
		self.list_stores_by_status(status).await
	}

	async fn update_store_status(&self, id: &StoreId, update: &StatusUpdate) -> Result<()> {
		self.update_store_status(id, update).await
	}

	async fn transition_store_status(
		&self,
		id: &StoreId,
		from: StoreStatus,
		update: &StatusUpdate,
	) -> Result<bool> {
		self.transition_store_status(id, from, update).await
	}

	async fn delete_store(&self, id: &StoreId) -> Result<bool> {
		self.delete_store(id).await
	}

	async fn count_stores(&self) -> Result<i64> {
		self.count_stores().await
	}

	async fn count_stores_by_owner(&self, owner_id: &str) -> Result<i64> {
		self.count_stores_by_owner(owner_id).await
	}

	async fn ping(&self) -> Result<()> {
		self.ping().await
	}
}
