//! # Cask ORM
//!
//! An Active Record layer over `sqlx`'s `Any` driver.
//!
//! A model type declares its conventions (table, primary key, timestamps,
//! soft deletes, JSON projection) through [`Model`], usually with
//! `#[derive(Model)]`. Queries run through a [`QueryBuilder`] opened with
//! [`Database::model`] and return [`Instance`]s, which track their changes
//! and persist themselves with `save` and `delete`.
//!
//! ```rust,ignore
//! use cask_orm::{Database, Model, attributes};
//!
//! #[derive(Model, Debug)]
//! struct Post {
//!     #[orm(primary_key)]
//!     id: i64,
//!     title: String,
//!     body: String,
//! }
//!
//! let db = Database::connect("sqlite::memory:").await?;
//! let post = db.model::<Post>().create(attributes! { "title" => "A", "body" => "B" }).await?;
//! let found = db.model::<Post>().find_or_fail(post.get("id").cloned()).await?;
//! assert_eq!(found.get_as::<String>("title")?, "A");
//! ```

extern crate self as cask_orm;

pub mod attributes;
pub mod config;
pub mod connections;
pub mod database;
pub mod errors;
mod hydration;
pub mod instance;
pub mod model;
pub mod pagination;
mod persistence;
pub mod query_builder;
pub mod scope;
mod sql;
pub mod transaction;
pub mod value;

pub use cask_orm_macro::{CaskEnum, FromAttributes, Model};

pub use attributes::{Attributes, FromAttributes, IntoAttributes};
pub use config::{ConnectionsConfig, DatabaseConfig};
pub use connections::ConnectionManager;
pub use database::{Connection, Database, DatabaseBuilder, Drivers, RawQuery};
pub use errors::{Error, Result};
pub use instance::Instance;
pub use model::{Capability, ColumnInfo, Model, ModelConfig, NoTimestamps, Projection, SoftDeletes};
pub use pagination::{Paginated, Pagination};
pub use query_builder::{Direction, Op, Query, QueryBuilder, Trashed};
pub use scope::{ScopeFn, ScopeRegistry, ScopeSet};
pub use transaction::{Transaction, TransactionHandle};
pub use value::{FromValue, Value};
