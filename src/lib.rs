//! # Tablewright
//!
//! Declarative MySQL schema reconciliation.
//!
//! Each entity's table is declared through a [`TableMapper`](structure::mapper::TableMapper)
//! using the [`Table`] builder. At startup [`Structure::run`] compares every declaration with
//! the live catalog and issues only the DDL needed to converge: `CREATE TABLE` for missing
//! tables, ordered `ALTER TABLE` statements for existing ones, and `DROP VIEW` plus
//! `CREATE VIEW` for views whose definition changed. A second run issues nothing.
//!
//! The database is reached through the [`SchemaExecutor`] trait. With the `mock` feature,
//! `mock::MockExecutor` provides an in-memory implementation for tests.

pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod metrics;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod structure;

pub use cache::{Cache, CacheStorage, MemoryStorage, RedisStorage};
pub use config::{Memoization, StructureConfig};
pub use error::{Result, StructureError};
pub use executor::{inline_parameters, quote_ident, value_to_sql_literal, Row, SchemaExecutor};
pub use structure::column::{Column, DefaultClause};
pub use structure::constraint::{ForeignKeyOptions, ReferentialAction, TableReference};
pub use structure::index::IndexKind;
pub use structure::mapper::{Conventions, Inflector, TableMapper, ViewMapper};
pub use structure::table::Table;
pub use structure::view::View;
pub use structure::{RunSummary, Structure};
