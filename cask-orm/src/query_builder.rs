//! # Query Builder Module
//!
//! [`Query`] holds the model-independent part of a query (filters, ordering,
//! limits) and is what scopes operate on. [`QueryBuilder`] binds a `Query` to
//! a model and a connection and materializes results: hydrated instances,
//! key/value pairs, primary keys, counts, and bulk updates or deletes.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::{
    collections::{HashMap, HashSet},
    marker::PhantomData,
    sync::Arc,
};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    attributes::{FromAttributes, IntoAttributes},
    database::{Connection, Drivers},
    errors::{Error, Result},
    hydration::{decode_model_row, decode_value},
    instance::Instance,
    model::{Model, ModelConfig},
    pagination::{Paginated, Pagination},
    scope::{ScopeSet, scope_name},
    sql::SqlWriter,
    value::{FromValue, Value, now},
};

// ============================================================================
// Operators and Clauses
// ============================================================================

/// Comparison operators for `filter` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

impl Op {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::NotEq => "<>",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
        }
    }
}

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// How soft-deleted rows take part in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trashed {
    /// Soft-deleted rows are filtered out.
    #[default]
    Exclude,
    /// Soft-deleted rows are returned alongside the others.
    Include,
    /// Only soft-deleted rows are returned.
    Only,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boolean {
    And,
    Or,
}

#[derive(Debug, Clone)]
enum Condition {
    Compare { column: String, op: Op, value: Value },
    In { column: String, values: Vec<Value> },
    Null { column: String },
    Between { column: String, low: Value, high: Value },
    Raw { sql: String, values: Vec<Value> },
    Group(Vec<Clause>),
}

#[derive(Debug, Clone)]
struct Clause {
    boolean: Boolean,
    negated: bool,
    condition: Condition,
}

impl Clause {
    fn and(condition: Condition) -> Self {
        Self { boolean: Boolean::And, negated: false, condition }
    }
}

#[derive(Debug, Clone)]
enum Order {
    Column(String, Direction),
    Raw(String),
}

// ============================================================================
// Query
// ============================================================================

/// The filters, ordering and window of a query.
///
/// Scopes receive and return a `Query`:
///
/// ```rust,ignore
/// scopes.define("popular", |q, _| q.filter("views", Op::Gt, 1000).order_by("views", Direction::Desc));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    select: Vec<String>,
    clauses: Vec<Clause>,
    orders: Vec<Order>,
    limit: Option<u64>,
    offset: Option<u64>,
    trashed: Trashed,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds columns to the select list. Accepts a comma separated list.
    pub fn select(mut self, columns: &str) -> Self {
        self.select.extend(columns.split(',').map(str::trim).filter(|c| !c.is_empty()).map(str::to_string));
        self
    }

    pub fn filter(self, column: &str, op: Op, value: impl Into<Value>) -> Self {
        self.push(Boolean::And, false, compare(column, op, value))
    }

    pub fn or_filter(self, column: &str, op: Op, value: impl Into<Value>) -> Self {
        self.push(Boolean::Or, false, compare(column, op, value))
    }

    pub fn not_filter(self, column: &str, op: Op, value: impl Into<Value>) -> Self {
        self.push(Boolean::And, true, compare(column, op, value))
    }

    pub fn or_not_filter(self, column: &str, op: Op, value: impl Into<Value>) -> Self {
        self.push(Boolean::Or, true, compare(column, op, value))
    }

    /// Shorthand for `filter(column, Op::Eq, value)`.
    pub fn equals(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, Op::Eq, value)
    }

    pub fn in_list(self, column: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.push(Boolean::And, false, in_list(column, values))
    }

    pub fn or_in_list(self, column: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.push(Boolean::Or, false, in_list(column, values))
    }

    pub fn not_in_list(self, column: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.push(Boolean::And, true, in_list(column, values))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.push(Boolean::And, false, Condition::Null { column: column.to_string() })
    }

    pub fn is_not_null(self, column: &str) -> Self {
        self.push(Boolean::And, true, Condition::Null { column: column.to_string() })
    }

    pub fn between(self, column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push(Boolean::And, false, between(column, low, high))
    }

    pub fn or_between(self, column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        self.push(Boolean::Or, false, between(column, low, high))
    }

    /// Adds a raw condition with `?` placeholders.
    pub fn where_raw(self, sql: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.push(Boolean::And, false, raw(sql, values))
    }

    pub fn or_where_raw(self, sql: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.push(Boolean::Or, false, raw(sql, values))
    }

    /// Adds a parenthesized group: `AND (...)`.
    pub fn group(self, build: impl FnOnce(Query) -> Query) -> Self {
        let group = build(Query::new()).clauses;
        self.push(Boolean::And, false, Condition::Group(group))
    }

    /// Adds a parenthesized group: `OR (...)`.
    pub fn or_group(self, build: impl FnOnce(Query) -> Query) -> Self {
        let group = build(Query::new()).clauses;
        self.push(Boolean::Or, false, Condition::Group(group))
    }

    /// Adds a raw ORDER BY fragment, e.g. `"name ASC"`.
    pub fn order(mut self, fragment: &str) -> Self {
        self.orders.push(Order::Raw(fragment.to_string()));
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.orders.push(Order::Column(column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Includes soft-deleted rows.
    pub fn with_trashed(mut self) -> Self {
        self.trashed = Trashed::Include;
        self
    }

    /// Returns soft-deleted rows only.
    pub fn only_trashed(mut self) -> Self {
        self.trashed = Trashed::Only;
        self
    }

    pub fn trashed(&self) -> Trashed {
        self.trashed
    }

    pub fn has_conditions(&self) -> bool {
        !self.clauses.is_empty()
    }

    fn push(mut self, boolean: Boolean, negated: bool, condition: Condition) -> Self {
        self.clauses.push(Clause { boolean, negated, condition });
        self
    }
}

fn compare(column: &str, op: Op, value: impl Into<Value>) -> Condition {
    Condition::Compare { column: column.to_string(), op, value: value.into() }
}

fn in_list(column: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Condition {
    Condition::In { column: column.to_string(), values: values.into_iter().map(Into::into).collect() }
}

fn between(column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Condition {
    Condition::Between { column: column.to_string(), low: low.into(), high: high.into() }
}

fn raw(sql: &str, values: impl IntoIterator<Item = impl Into<Value>>) -> Condition {
    Condition::Raw { sql: sql.to_string(), values: values.into_iter().map(Into::into).collect() }
}

// ============================================================================
// SQL Rendering
// ============================================================================

fn render_clauses(w: &mut SqlWriter, clauses: &[Clause]) -> Result<()> {
    for (i, clause) in clauses.iter().enumerate() {
        if i > 0 {
            w.push(match clause.boolean {
                Boolean::And => " AND ",
                Boolean::Or => " OR ",
            });
        }
        if clause.negated {
            w.push("NOT ");
        }
        render_condition(w, &clause.condition)?;
    }
    Ok(())
}

fn render_condition(w: &mut SqlWriter, condition: &Condition) -> Result<()> {
    match condition {
        Condition::Compare { column, op, value } => {
            w.push_identifier(column).push(" ").push(op.as_sql()).push(" ").push_value(value)?;
        }
        Condition::In { values, .. } if values.is_empty() => {
            w.push("1 = 0");
        }
        Condition::In { column, values } => {
            w.push_identifier(column).push(" IN (").push_values(values)?.push(")");
        }
        Condition::Null { column } => {
            w.push_identifier(column).push(" IS NULL");
        }
        Condition::Between { column, low, high } => {
            w.push_identifier(column).push(" BETWEEN ").push_value(low)?.push(" AND ").push_value(high)?;
        }
        Condition::Raw { sql, values } => {
            w.push("(").push_raw(sql, values)?.push(")");
        }
        Condition::Group(clauses) if clauses.is_empty() => {
            w.push("1 = 1");
        }
        Condition::Group(clauses) => {
            w.push("(");
            render_clauses(w, clauses)?;
            w.push(")");
        }
    }
    Ok(())
}

fn render_orders(w: &mut SqlWriter, orders: &[Order]) {
    for (i, order) in orders.iter().enumerate() {
        w.push(if i == 0 { " ORDER BY " } else { ", " });
        match order {
            Order::Column(column, direction) => {
                w.push_identifier(column).push(match direction {
                    Direction::Asc => " ASC",
                    Direction::Desc => " DESC",
                });
            }
            Order::Raw(fragment) => {
                w.push(fragment);
            }
        }
    }
}

fn render_window(w: &mut SqlWriter, limit: Option<u64>, offset: Option<u64>) {
    match (limit, offset) {
        (Some(limit), _) => {
            w.push(&format!(" LIMIT {}", limit));
        }
        (None, Some(_)) => match w.driver() {
            Drivers::SQLite => {
                w.push(" LIMIT -1");
            }
            Drivers::MySQL => {
                w.push(" LIMIT 18446744073709551615");
            }
            Drivers::Postgres => {}
        },
        (None, None) => {}
    }
    if let Some(offset) = offset {
        w.push(&format!(" OFFSET {}", offset));
    }
}

// ============================================================================
// QueryBuilder
// ============================================================================

#[derive(Debug, Clone)]
enum GlobalScopes {
    Apply,
    Skip(HashSet<String>),
    SkipAll,
}

/// A query against model `M`, executed on connection `C` (a [`Database`] or
/// a [`Transaction`]).
///
/// Global scopes of `M` and the soft-delete filter are added when the query
/// runs. Invoking an unknown scope is reported by the executing method.
///
/// [`Database`]: crate::Database
/// [`Transaction`]: crate::Transaction
pub struct QueryBuilder<M, C> {
    pub(crate) conn: C,
    pub(crate) config: Arc<ModelConfig>,
    scopes: Arc<ScopeSet>,
    pub(crate) query: Query,
    global_scopes: GlobalScopes,
    error: Option<Error>,
    debug: bool,
    _model: PhantomData<fn() -> M>,
}

macro_rules! delegate_to_query {
    ($($(#[$meta:meta])* fn $name:ident($($arg:ident: $ty:ty),*);)*) => {
        $(
            $(#[$meta])*
            pub fn $name(mut self, $($arg: $ty),*) -> Self {
                self.query = self.query.$name($($arg),*);
                self
            }
        )*
    };
}

impl<M, C> QueryBuilder<M, C>
where
    M: Model,
    C: Connection + Clone,
{
    pub(crate) fn new(conn: C) -> Self {
        let scopes = conn.scopes().for_model::<M>();
        Self {
            conn,
            config: Arc::new(M::config()),
            scopes,
            query: Query::new(),
            global_scopes: GlobalScopes::Apply,
            error: None,
            debug: false,
            _model: PhantomData,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    delegate_to_query! {
        /// Adds columns to the select list (comma separated).
        fn select(columns: &str);
        fn filter(column: &str, op: Op, value: impl Into<Value>);
        fn or_filter(column: &str, op: Op, value: impl Into<Value>);
        fn not_filter(column: &str, op: Op, value: impl Into<Value>);
        fn or_not_filter(column: &str, op: Op, value: impl Into<Value>);
        /// Shorthand for `filter(column, Op::Eq, value)`.
        fn equals(column: &str, value: impl Into<Value>);
        fn in_list(column: &str, values: impl IntoIterator<Item = impl Into<Value>>);
        fn or_in_list(column: &str, values: impl IntoIterator<Item = impl Into<Value>>);
        fn not_in_list(column: &str, values: impl IntoIterator<Item = impl Into<Value>>);
        fn is_null(column: &str);
        fn is_not_null(column: &str);
        fn between(column: &str, low: impl Into<Value>, high: impl Into<Value>);
        fn or_between(column: &str, low: impl Into<Value>, high: impl Into<Value>);
        /// Adds a raw condition with `?` placeholders.
        fn where_raw(sql: &str, values: impl IntoIterator<Item = impl Into<Value>>);
        fn or_where_raw(sql: &str, values: impl IntoIterator<Item = impl Into<Value>>);
        fn group(build: impl FnOnce(Query) -> Query);
        fn or_group(build: impl FnOnce(Query) -> Query);
        /// Adds a raw ORDER BY fragment, e.g. `"name ASC"`.
        fn order(fragment: &str);
        fn order_by(column: &str, direction: Direction);
        fn limit(limit: u64);
        fn offset(offset: u64);
        /// Includes soft-deleted rows.
        fn with_trashed();
        /// Returns soft-deleted rows only.
        fn only_trashed();
    }

    /// Applies the named scope `name` (case-converted, see
    /// [`scope_name`]).
    pub fn scope(self, name: &str) -> Self {
        self.scope_with(name, Vec::<Value>::new())
    }

    /// Applies the named scope `name` with arguments.
    pub fn scope_with(mut self, name: &str, args: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        match self.scopes.named(name).cloned() {
            Some(scope) => {
                let args: Vec<Value> = args.into_iter().map(Into::into).collect();
                self.query = scope(std::mem::take(&mut self.query), &args);
            }
            None => {
                if self.error.is_none() {
                    self.error = Some(Error::UnknownScope {
                        table: self.config.table().to_string(),
                        scope: scope_name(name),
                    });
                }
            }
        }
        self
    }

    /// Skips one global scope for this query.
    pub fn without_global_scope(mut self, name: &str) -> Self {
        let name = scope_name(name);
        self.global_scopes = match self.global_scopes {
            GlobalScopes::Apply => GlobalScopes::Skip(HashSet::from([name])),
            GlobalScopes::Skip(mut skipped) => {
                skipped.insert(name);
                GlobalScopes::Skip(skipped)
            }
            GlobalScopes::SkipAll => GlobalScopes::SkipAll,
        };
        self
    }

    /// Skips every global scope for this query.
    pub fn without_global_scopes(mut self) -> Self {
        self.global_scopes = GlobalScopes::SkipAll;
        self
    }

    /// Logs the generated SQL at `info` level when executed.
    pub fn debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Renders the SELECT statement this builder would run.
    pub fn to_sql(&self) -> Result<String> {
        Ok(self.compile_select(None)?.0)
    }

    // ------------------------------------------------------------------------
    // Materialization
    // ------------------------------------------------------------------------

    /// Executes the query and hydrates every row into an instance.
    ///
    /// Each instance starts clean: its original snapshot equals its
    /// attributes.
    pub async fn fetch(mut self) -> Result<Vec<Instance<M>>> {
        self.check()?;
        let (sql, args) = self.compile_select(None)?;
        self.trace(&sql);
        let rows = self.conn.fetch_all(&sql, args).await?;
        let transaction = self.conn.transaction();
        rows.iter()
            .map(|row| {
                let attributes = decode_model_row(row, &self.config)?;
                Ok(Instance::hydrate(self.config.clone(), attributes, transaction.clone()))
            })
            .collect()
    }

    /// Every row visible through the model's scopes.
    pub async fn all(self) -> Result<Vec<Instance<M>>> {
        self.fetch().await
    }

    /// Executes the query and maps every hydrated row into `T`.
    pub async fn fetch_as<T: FromAttributes>(self) -> Result<Vec<T>> {
        self.fetch().await?.iter().map(|instance| instance.to_model::<T>()).collect()
    }

    /// The first matching instance, or `None`. Ordered by primary key when
    /// no order was given.
    pub async fn first(mut self) -> Result<Option<Instance<M>>> {
        self.check()?;
        if self.query.orders.is_empty() {
            let pk = self.config.primary_key().to_string();
            self.query = self.query.order_by(&pk, Direction::Asc);
        }
        self.query.limit = Some(1);
        let (sql, args) = self.compile_select(None)?;
        self.trace(&sql);
        let row = self.conn.fetch_optional(&sql, args).await?;
        match row {
            Some(row) => {
                let attributes = decode_model_row(&row, &self.config)?;
                Ok(Some(Instance::hydrate(self.config.clone(), attributes, self.conn.transaction())))
            }
            None => Ok(None),
        }
    }

    /// Like [`first`](Self::first) but a missing row is an error.
    pub async fn first_or_fail(self) -> Result<Instance<M>> {
        let table = self.config.table().to_string();
        self.first().await?.ok_or_else(|| Error::ModelNotFound {
            table,
            column: "*".to_string(),
            value: "any".to_string(),
        })
    }

    /// The instance with primary key `key`, or `None`.
    pub async fn find(self, key: impl Into<Value>) -> Result<Option<Instance<M>>> {
        let pk = self.config.primary_key().to_string();
        self.find_by(&pk, key).await
    }

    /// The instance with primary key `key`, or [`Error::ModelNotFound`].
    pub async fn find_or_fail(self, key: impl Into<Value>) -> Result<Instance<M>> {
        let pk = self.config.primary_key().to_string();
        self.find_by_or_fail(&pk, key).await
    }

    /// The first instance whose `column` equals `value`, or `None`.
    pub async fn find_by(self, column: &str, value: impl Into<Value>) -> Result<Option<Instance<M>>> {
        self.equals(column, value).first().await
    }

    /// The first instance whose `column` equals `value`, or
    /// [`Error::ModelNotFound`].
    pub async fn find_by_or_fail(self, column: &str, value: impl Into<Value>) -> Result<Instance<M>> {
        let value = value.into();
        let table = self.config.table().to_string();
        let shown = value.to_string();
        self.find_by(column, value).await?.ok_or_else(|| Error::ModelNotFound {
            table,
            column: column.to_string(),
            value: shown,
        })
    }

    /// Maps `lhs` to `rhs` for every matching row, in result order. A key
    /// seen twice keeps its first position and takes the later value.
    pub async fn pair(mut self, lhs: &str, rhs: &str) -> Result<Vec<(Value, Value)>> {
        self.check()?;
        let (sql, args) = self.compile_select(Some(&[lhs.to_string(), rhs.to_string()]))?;
        self.trace(&sql);
        let rows = self.conn.fetch_all(&sql, args).await?;

        let mut pairs: Vec<(Value, Value)> = Vec::with_capacity(rows.len());
        let mut positions: HashMap<Value, usize> = HashMap::with_capacity(rows.len());
        for row in &rows {
            let key = decode_value(row, 0)?;
            let value = decode_value(row, 1)?;
            match positions.get(&key) {
                Some(&i) => pairs[i].1 = value,
                None => {
                    positions.insert(key.clone(), pairs.len());
                    pairs.push((key, value));
                }
            }
        }
        Ok(pairs)
    }

    /// Primary keys of every matching row, in result order.
    pub async fn ids(mut self) -> Result<Vec<Value>> {
        self.check()?;
        let pk = self.config.primary_key().to_string();
        let (sql, args) = self.compile_select(Some(&[pk]))?;
        self.trace(&sql);
        let rows = self.conn.fetch_all(&sql, args).await?;
        rows.iter().map(|row| decode_value(row, 0)).collect()
    }

    /// The first `limit` rows by primary key.
    pub async fn pick(self, limit: u64) -> Result<Vec<Instance<M>>> {
        let pk = self.config.primary_key().to_string();
        self.order_by(&pk, Direction::Asc).limit(limit).fetch().await
    }

    /// The last `limit` rows by primary key, last row first.
    pub async fn pick_inverse(self, limit: u64) -> Result<Vec<Instance<M>>> {
        let pk = self.config.primary_key().to_string();
        self.order_by(&pk, Direction::Desc).limit(limit).fetch().await
    }

    /// Number of matching rows, ignoring ordering, limit and offset.
    pub async fn count(mut self) -> Result<i64> {
        self.check()?;
        let mut w = SqlWriter::new(self.conn.driver());
        w.push("SELECT COUNT(*) FROM ").push_identifier(self.config.table());
        self.push_where(&mut w)?;
        let (sql, args) = w.finish();
        self.trace(&sql);
        let row = self.conn.fetch_one(&sql, args).await?;
        let total = decode_value(&row, 0)?;
        i64::from_value(&total).ok_or_else(|| Error::Conversion {
            column: "COUNT(*)".to_string(),
            expected: "i64",
            found: total.kind().to_string(),
        })
    }

    /// Runs the query for one page (1-based) and counts the total.
    pub async fn paginate(self, page: u64, per_page: u64) -> Result<Paginated<Instance<M>>> {
        Pagination::new(page, per_page).paginate(self).await
    }

    // ------------------------------------------------------------------------
    // Persistence shortcuts
    // ------------------------------------------------------------------------

    /// Creates and persists a new instance.
    pub async fn create(mut self, attributes: impl IntoAttributes) -> Result<Instance<M>> {
        self.check()?;
        let mut instance = Instance::<M>::with_config(self.config.clone(), attributes.into_attributes());
        instance.bind_transaction(self.conn.transaction());
        instance.save_on(&self.conn).await?;
        Ok(instance)
    }

    /// Creates and persists several instances, one INSERT each.
    pub async fn create_many<A: IntoAttributes>(
        mut self,
        rows: impl IntoIterator<Item = A>,
    ) -> Result<Vec<Instance<M>>> {
        self.check()?;
        let mut created = Vec::new();
        for attributes in rows {
            let mut instance = Instance::<M>::with_config(self.config.clone(), attributes.into_attributes());
            instance.bind_transaction(self.conn.transaction());
            instance.save_on(&self.conn).await?;
            created.push(instance);
        }
        Ok(created)
    }

    /// Returns the first row matching every `search` attribute, creating one
    /// from `search` merged with `payload` when none exists.
    pub async fn find_or_create(
        mut self,
        search: impl IntoAttributes,
        payload: impl IntoAttributes,
    ) -> Result<Instance<M>> {
        self.check()?;
        let search = search.into_attributes();
        let mut lookup = self.duplicate();
        for (column, value) in search.iter() {
            lookup = lookup.equals(column, value.clone());
        }
        if let Some(found) = lookup.first().await? {
            return Ok(found);
        }
        let mut attributes = search;
        attributes.merge(payload.into_attributes());
        self.create(attributes).await
    }

    /// Updates every matching row; the update timestamp is set unless given.
    /// Returns the number of affected rows.
    pub async fn update(mut self, attributes: impl IntoAttributes) -> Result<u64> {
        self.check()?;
        let mut changes = attributes.into_attributes();
        if let Some(column) = self.config.updated_at() {
            if !changes.contains_key(column) {
                changes.insert(column, Value::Timestamp(now()));
            }
        }
        if changes.is_empty() {
            return Ok(0);
        }

        let mut w = SqlWriter::new(self.conn.driver());
        w.push("UPDATE ").push_identifier(self.config.table()).push(" SET ");
        for (i, (column, value)) in changes.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_identifier(column).push(" = ").push_value(value)?;
        }
        self.push_where(&mut w)?;
        self.run(w).await
    }

    /// Deletes every matching row: soft when the model has a delete
    /// timestamp, hard otherwise. Returns the number of affected rows.
    pub async fn delete(mut self) -> Result<u64> {
        self.check()?;
        match self.config.deleted_at().map(str::to_string) {
            Some(column) => {
                let mut w = SqlWriter::new(self.conn.driver());
                w.push("UPDATE ")
                    .push_identifier(self.config.table())
                    .push(" SET ")
                    .push_identifier(&column)
                    .push(" = ")
                    .push_value(&Value::Timestamp(now()))?;
                self.push_where(&mut w)?;
                self.run(w).await
            }
            None => self.force_delete().await,
        }
    }

    /// Removes every matching row, even for soft-deleting models.
    pub async fn force_delete(mut self) -> Result<u64> {
        self.check()?;
        let mut w = SqlWriter::new(self.conn.driver());
        w.push("DELETE FROM ").push_identifier(self.config.table());
        self.push_where(&mut w)?;
        self.run(w).await
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// A copy of this builder for a second statement (e.g. a COUNT).
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            config: self.config.clone(),
            scopes: self.scopes.clone(),
            query: self.query.clone(),
            global_scopes: self.global_scopes.clone(),
            error: None,
            debug: self.debug,
            _model: PhantomData,
        }
    }

    pub(crate) fn check(&mut self) -> Result<()> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn run(&self, w: SqlWriter) -> Result<u64> {
        let (sql, args) = w.finish();
        self.trace(&sql);
        Ok(self.conn.execute(&sql, args).await?.rows_affected())
    }

    fn trace(&self, sql: &str) {
        if self.debug {
            log::info!("{}", sql);
        }
    }

    fn global_skipped(&self, name: &str) -> bool {
        match &self.global_scopes {
            GlobalScopes::Apply => false,
            GlobalScopes::Skip(skipped) => skipped.contains(name),
            GlobalScopes::SkipAll => true,
        }
    }

    /// User conditions, global scopes and the soft-delete filter, ANDed.
    fn where_clauses(&self) -> Vec<Clause> {
        let mut clauses = Vec::new();
        if !self.query.clauses.is_empty() {
            clauses.push(Clause::and(Condition::Group(self.query.clauses.clone())));
        }
        for (name, scope) in self.scopes.globals() {
            if self.global_skipped(name) {
                continue;
            }
            let scoped = scope(Query::new(), &[]);
            if !scoped.clauses.is_empty() {
                clauses.push(Clause::and(Condition::Group(scoped.clauses)));
            }
        }
        if let Some(column) = self.config.deleted_at() {
            let condition = Condition::Null { column: column.to_string() };
            match self.query.trashed {
                Trashed::Exclude => clauses.push(Clause::and(condition)),
                Trashed::Only => clauses.push(Clause { boolean: Boolean::And, negated: true, condition }),
                Trashed::Include => {}
            }
        }
        clauses
    }

    fn push_where(&self, w: &mut SqlWriter) -> Result<()> {
        let clauses = self.where_clauses();
        if !clauses.is_empty() {
            w.push(" WHERE ");
            render_clauses(w, &clauses)?;
        }
        Ok(())
    }

    fn compile_select(&self, columns: Option<&[String]>) -> Result<(String, sqlx::any::AnyArguments<'static>)> {
        let columns: Vec<String> = match columns {
            Some(columns) => columns.to_vec(),
            None if !self.query.select.is_empty() => self.query.select.clone(),
            None => M::columns().iter().map(|c| c.name.to_string()).collect(),
        };

        let mut w = SqlWriter::new(self.conn.driver());
        w.push("SELECT ");
        if columns.is_empty() {
            w.push("*");
        }
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_identifier(column);
        }
        w.push(" FROM ").push_identifier(self.config.table());
        self.push_where(&mut w)?;
        render_orders(&mut w, &self.query.orders);
        render_window(&mut w, self.query.limit, self.query.offset);
        Ok(w.finish())
    }
}
