//! # Model Module
//!
//! Per-type conventions of a model (table, primary key, timestamps,
//! projection, connection) and the [`Model`] trait tying a Rust type to them.

use heck::ToSnakeCase;

use crate::{attributes::Attributes, scope::ScopeSet};

/// Metadata about a model column.
///
/// Populated by the `#[derive(Model)]` macro; queries select these columns
/// when no explicit `select` is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// The column name in the database.
    pub name: &'static str,
    /// Whether this column is the primary key.
    pub is_primary_key: bool,
}

// ============================================================================
// Projection
// ============================================================================

/// Which attributes `to_json` exposes.
///
/// Being an enum, a visible list and a hidden list can never both be set:
/// choosing one replaces the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    /// Every attribute is serialized.
    #[default]
    All,
    /// Only these attributes are serialized.
    Visible(Vec<String>),
    /// Every attribute except these is serialized.
    Hidden(Vec<String>),
}

impl Projection {
    pub fn visible(&self) -> &[String] {
        match self {
            Projection::Visible(columns) => columns,
            _ => &[],
        }
    }

    pub fn hidden(&self) -> &[String] {
        match self {
            Projection::Hidden(columns) => columns,
            _ => &[],
        }
    }

    /// Filters `attributes` down to what should be serialized.
    pub fn apply(&self, attributes: &Attributes) -> Attributes {
        match self {
            Projection::All => attributes.clone(),
            Projection::Visible(columns) => attributes.only(columns),
            Projection::Hidden(columns) => attributes.except(columns),
        }
    }
}

// ============================================================================
// Model Configuration
// ============================================================================

/// The conventions of a model type.
///
/// | setting        | default                                     |
/// |----------------|---------------------------------------------|
/// | `table`        | pluralized snake case of the type name      |
/// | `primary_key`  | `id`                                        |
/// | `incrementing` | `true`                                      |
/// | `connection`   | the default connection of the manager       |
/// | `created_at`   | `created_at`                                |
/// | `updated_at`   | `updated_at`                                |
/// | `deleted_at`   | none (soft deletes disabled)                |
/// | `projection`   | [`Projection::All`]                         |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    table: String,
    primary_key: String,
    incrementing: bool,
    connection: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
    deleted_at: Option<String>,
    projection: Projection,
}

impl ModelConfig {
    /// Default conventions for a model named `type_name` (e.g. `"BlogPost"`
    /// gets the table `blog_posts`).
    pub fn for_model(type_name: &str) -> Self {
        Self {
            table: table_name_for(type_name),
            primary_key: "id".to_string(),
            incrementing: true,
            connection: None,
            created_at: Some("created_at".to_string()),
            updated_at: Some("updated_at".to_string()),
            deleted_at: None,
            projection: Projection::All,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn incrementing(&self) -> bool {
        self.incrementing
    }

    pub fn connection(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    pub fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }

    pub fn deleted_at(&self) -> Option<&str> {
        self.deleted_at.as_deref()
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Whether `delete` marks rows instead of removing them.
    pub fn soft_deletes(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether `column` is one of the configured timestamp columns.
    pub fn is_timestamp(&self, column: &str) -> bool {
        [&self.created_at, &self.updated_at, &self.deleted_at]
            .into_iter()
            .any(|c| c.as_deref() == Some(column))
    }

    // ------------------------------------------------------------------------
    // Builder setters
    // ------------------------------------------------------------------------

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn with_incrementing(mut self, incrementing: bool) -> Self {
        self.incrementing = incrementing;
        self
    }

    pub fn with_connection(mut self, name: impl Into<String>) -> Self {
        self.connection = Some(name.into());
        self
    }

    /// Sets the creation timestamp column; `None` disables it.
    pub fn with_created_at(mut self, column: Option<&str>) -> Self {
        self.created_at = column.map(str::to_string);
        self
    }

    /// Sets the update timestamp column; `None` disables it.
    pub fn with_updated_at(mut self, column: Option<&str>) -> Self {
        self.updated_at = column.map(str::to_string);
        self
    }

    /// Sets the soft-delete timestamp column; `None` makes deletes hard.
    pub fn with_deleted_at(mut self, column: Option<&str>) -> Self {
        self.deleted_at = column.map(str::to_string);
        self
    }

    /// Disables both the creation and update timestamps.
    pub fn without_timestamps(self) -> Self {
        self.with_created_at(None).with_updated_at(None)
    }

    /// Serializes only `columns`. Clears any hidden list.
    pub fn with_visible<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.set_visible(columns);
        self
    }

    /// Serializes everything but `columns`. Clears any visible list.
    pub fn with_hidden<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.set_hidden(columns);
        self
    }

    pub fn set_visible<S: AsRef<str>>(&mut self, columns: &[S]) {
        self.projection = projection_from(columns, Projection::Visible);
    }

    pub fn set_hidden<S: AsRef<str>>(&mut self, columns: &[S]) {
        self.projection = projection_from(columns, Projection::Hidden);
    }

    /// Applies a capability (the replacement for model traits).
    pub fn with(self, capability: impl Capability) -> Self {
        capability.apply(self)
    }
}

fn projection_from<S: AsRef<str>>(columns: &[S], wrap: fn(Vec<String>) -> Projection) -> Projection {
    if columns.is_empty() {
        Projection::All
    } else {
        wrap(columns.iter().map(|c| c.as_ref().to_string()).collect())
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// A reusable bundle of behaviour applied to a model's configuration at
/// construction time.
///
/// # Example
///
/// ```rust,ignore
/// fn config() -> ModelConfig {
///     ModelConfig::for_model("Post").with(SoftDeletes::default())
/// }
/// ```
pub trait Capability {
    fn apply(self, config: ModelConfig) -> ModelConfig;
}

/// Turns `delete` into an update of a timestamp column.
#[derive(Debug, Clone)]
pub struct SoftDeletes {
    pub column: &'static str,
}

impl Default for SoftDeletes {
    fn default() -> Self {
        Self { column: "deleted_at" }
    }
}

impl Capability for SoftDeletes {
    fn apply(self, config: ModelConfig) -> ModelConfig {
        config.with_deleted_at(Some(self.column))
    }
}

/// Disables automatic `created_at`/`updated_at` maintenance.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTimestamps;

impl Capability for NoTimestamps {
    fn apply(self, config: ModelConfig) -> ModelConfig {
        config.without_timestamps()
    }
}

// ============================================================================
// Model Trait
// ============================================================================

/// The core trait tying a Rust type to a database table.
///
/// This trait is typically implemented via the `#[derive(Model)]` macro, but
/// a hand-written implementation only needs [`Model::config`].
///
/// # Example
///
/// ```rust,ignore
/// use cask_orm::Model;
///
/// #[derive(Model)]
/// #[orm(soft_deletes)]
/// struct Post {
///     #[orm(primary_key)]
///     id: Option<i64>,
///     title: String,
///     created_at: Option<DateTime<Utc>>,
///     updated_at: Option<DateTime<Utc>>,
///     deleted_at: Option<DateTime<Utc>>,
/// }
/// ```
pub trait Model: Send + Sync + 'static {
    /// The conventions of this model.
    fn config() -> ModelConfig;

    /// Column metadata. Empty means "select `*`".
    fn columns() -> Vec<ColumnInfo> {
        Vec::new()
    }

    /// Defines the model's static named and global scopes. Runs once per
    /// database handle.
    fn boot(_scopes: &mut ScopeSet) {}
}

// ============================================================================
// Naming Helpers
// ============================================================================

/// Pluralized snake case of a type name: `BlogPost` → `blog_posts`.
pub fn table_name_for(type_name: &str) -> String {
    let snake = type_name.strip_prefix("r#").unwrap_or(type_name).to_snake_case();
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, pluralize(last)),
        None => pluralize(&snake),
    }
}

/// Simple English pluralization of a single word.
pub fn pluralize(word: &str) -> String {
    let vowel_y = ["ay", "ey", "iy", "oy", "uy"].iter().any(|end| word.ends_with(end));
    if word.ends_with('y') && !vowel_y {
        format!("{}ies", &word[..word.len() - 1])
    } else if ["s", "sh", "ch", "x", "z"].iter().any(|end| word.ends_with(end)) {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}
