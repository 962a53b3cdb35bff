// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal: {0}")]
	Internal(String),
}

impl DbError {
	/// Map a UNIQUE constraint violation to [`DbError::Conflict`], leaving
	/// other errors untouched.
	pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
		if let sqlx::Error::Database(db_err) = &err {
			if db_err.is_unique_violation() {
				return DbError::Conflict(what.to_string());
			}
		}
		DbError::Sqlx(err)
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
