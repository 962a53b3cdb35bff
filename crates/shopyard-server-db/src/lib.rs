// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! # shopyard-server-db
//!
//! Persistence for store records using SQLite via sqlx.
//!
//! The [`StoreStore`] trait is the interface the provisioning layer codes
//! against; [`StoreRepository`] is the SQLite implementation holding a
//! `SqlitePool` and delegating trait methods to its inherent methods.
//!
//! Error mapping follows one rule set:
//!
//! | Variant | When |
//! |---------|------|
//! | `NotFound` | An update named a store id that does not exist |
//! | `Conflict` | A UNIQUE constraint (id or namespace) was violated |
//! | `Sqlx` | Anything else the driver reported |
//! | `Internal` | A stored value failed to parse back into its type |

mod error;
pub mod pool;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{DbError, Result};
pub use pool::{create_pool, run_migrations};
pub use store::{StoreRepository, StoreStore};
pub use types::{EngineKind, NewStore, StatusUpdate, Store, StoreId, StoreStatus};
