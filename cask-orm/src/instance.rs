//! # Instance Module
//!
//! [`Instance<M>`] is one row of model `M`: its current attributes, the
//! snapshot they are diffed against on save, and its lifecycle state.

use std::{fmt, marker::PhantomData, sync::Arc};

use serde::{Serialize, Serializer};

use crate::{
    attributes::{Attributes, FromAttributes, IntoAttributes},
    database::{Connection, Database},
    errors::{Error, Result},
    hydration::{coerce_timestamps, decode_model_row},
    model::{Model, ModelConfig},
    persistence,
    transaction::{Transaction, TransactionHandle},
    value::{FromValue, Value, now},
};

/// A model instance.
///
/// New instances are built with [`Instance::new`], [`Instance::with_attributes`]
/// or [`Instance::from_model`] and inserted by [`save`](Self::save). Queries
/// return persisted instances whose snapshot equals their attributes.
///
/// # Example
///
/// ```rust,ignore
/// let mut post = Instance::<Post>::with_attributes(attributes! { "title" => "A", "body" => "B" });
/// post.save(&db).await?;
///
/// post.set("title", "B")?;
/// assert_eq!(post.dirty().keys().collect::<Vec<_>>(), ["title"]);
/// post.save(&db).await?;
///
/// post.delete(&db).await?;
/// assert!(post.set("title", "C").is_err());
/// ```
pub struct Instance<M> {
    config: Arc<ModelConfig>,
    attributes: Attributes,
    original: Attributes,
    persisted: bool,
    frozen: bool,
    transaction: Option<TransactionHandle>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for Instance<M> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            attributes: self.attributes.clone(),
            original: self.original.clone(),
            persisted: self.persisted,
            frozen: self.frozen,
            transaction: self.transaction.clone(),
            _model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Instance<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("table", &self.config.table())
            .field("attributes", &self.attributes)
            .field("persisted", &self.persisted)
            .field("frozen", &self.frozen)
            .finish()
    }
}

impl<M: Model> Default for Instance<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Instance<M> {
    /// An empty, unsaved instance.
    pub fn new() -> Self {
        Self::with_config(Arc::new(M::config()), Attributes::new())
    }

    /// An unsaved instance holding `attributes`.
    pub fn with_attributes(attributes: impl IntoAttributes) -> Self {
        Self::with_config(Arc::new(M::config()), attributes.into_attributes())
    }

    /// An unsaved instance built from a typed model value.
    pub fn from_model(model: M) -> Self
    where
        M: IntoAttributes,
    {
        Self::with_attributes(model)
    }
}

impl<M> Instance<M> {
    pub(crate) fn with_config(config: Arc<ModelConfig>, mut attributes: Attributes) -> Self {
        coerce_timestamps(&config, &mut attributes);
        Self {
            config,
            attributes,
            original: Attributes::new(),
            persisted: false,
            frozen: false,
            transaction: None,
            _model: PhantomData,
        }
    }

    /// Wraps a loaded row. Soft-deleted rows come back frozen until restored.
    pub(crate) fn hydrate(config: Arc<ModelConfig>, attributes: Attributes, transaction: Option<TransactionHandle>) -> Self {
        let mut instance = Self {
            config,
            original: attributes.clone(),
            attributes,
            persisted: true,
            frozen: false,
            transaction,
            _model: PhantomData,
        };
        instance.frozen = instance.is_trashed();
        instance
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Reads an attribute as `T`; see [`Attributes::get_as`].
    pub fn get_as<T: FromValue>(&self, key: &str) -> Result<T> {
        self.attributes.get_as(key)
    }

    /// Sets one attribute.
    ///
    /// Fails with [`Error::FrozenInstance`] after a delete, and with
    /// [`Error::ImmutablePrimaryKey`] when it would change the key of a
    /// persisted instance.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.check_writable(key, &value)?;
        self.attributes.insert(key, value);
        Ok(())
    }

    /// Assigns several attributes at once, with the checks of
    /// [`set`](Self::set). Nothing is assigned when a check fails.
    pub fn fill(&mut self, attributes: impl IntoAttributes) -> Result<()> {
        let attributes = attributes.into_attributes();
        for (key, value) in attributes.iter() {
            self.check_writable(key, value)?;
        }
        self.attributes.merge(attributes);
        Ok(())
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The snapshot taken when the instance was loaded or last saved.
    pub fn original(&self) -> &Attributes {
        &self.original
    }

    /// Attributes changed since the snapshot.
    pub fn dirty(&self) -> Attributes {
        self.attributes.diff(&self.original)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty().is_empty()
    }

    pub fn is_new(&self) -> bool {
        !self.persisted
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// `true` once the instance has been deleted.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// `true` when the delete timestamp of a soft-deleting model is set.
    pub fn is_trashed(&self) -> bool {
        match self.config.deleted_at() {
            Some(column) => self.attributes.get(column).is_some_and(|v| !v.is_null()),
            None => false,
        }
    }

    /// The primary key value, if set.
    pub fn primary_key_value(&self) -> Option<&Value> {
        self.attributes.get(self.config.primary_key()).filter(|v| !v.is_null())
    }

    /// The attributes with the model's visible/hidden projection applied.
    pub fn to_json(&self) -> serde_json::Value {
        self.config.projection().apply(&self.attributes).to_json()
    }

    /// Maps the attributes into a typed value.
    pub fn to_model<T: FromAttributes>(&self) -> Result<T> {
        T::from_attributes(&self.attributes)
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    /// Binds the instance to `trx`: `save`, `delete`, `restore` and `reload`
    /// run inside it while it is open.
    pub fn use_transaction(&mut self, trx: &Transaction) -> &mut Self {
        self.transaction = Some(trx.handle());
        self
    }

    /// The bound transaction, while some handle still holds it.
    pub fn transaction(&self) -> Option<Transaction> {
        self.transaction.as_ref().and_then(TransactionHandle::upgrade)
    }

    pub(crate) fn bind_transaction(&mut self, transaction: Option<TransactionHandle>) {
        self.transaction = transaction;
    }

    /// The bound transaction if it is still open. A finished transaction
    /// releases the binding.
    async fn active_transaction(&mut self) -> Option<Transaction> {
        if let Some(trx) = self.transaction() {
            if trx.is_active().await {
                return Some(trx);
            }
        }
        if self.transaction.take().is_some() {
            log::debug!("[{}] transaction binding released", self.config.table());
        }
        None
    }

    // ------------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------------

    /// Inserts a new instance or updates the changed columns of a persisted
    /// one. A persisted instance without changes issues no statement.
    pub async fn save(&mut self, db: &Database) -> Result<()> {
        match self.active_transaction().await {
            Some(trx) => self.save_on(&trx).await,
            None => self.save_on(db).await,
        }
    }

    /// Deletes the row: soft when the model has a delete timestamp, hard
    /// otherwise. The instance is frozen afterwards.
    pub async fn delete(&mut self, db: &Database) -> Result<()> {
        match self.active_transaction().await {
            Some(trx) => self.delete_on(&trx, false).await,
            None => self.delete_on(db, false).await,
        }
    }

    /// Removes the row even for soft-deleting models.
    pub async fn force_delete(&mut self, db: &Database) -> Result<()> {
        match self.active_transaction().await {
            Some(trx) => self.delete_on(&trx, true).await,
            None => self.delete_on(db, true).await,
        }
    }

    /// Clears the delete timestamp of a soft-deleted row and unfreezes the
    /// instance. Does nothing when the instance is not trashed.
    pub async fn restore(&mut self, db: &Database) -> Result<()> {
        match self.active_transaction().await {
            Some(trx) => self.restore_on(&trx).await,
            None => self.restore_on(db).await,
        }
    }

    /// Re-reads the row, replacing attributes and snapshot.
    pub async fn reload(&mut self, db: &Database) -> Result<()> {
        match self.active_transaction().await {
            Some(trx) => self.reload_on(&trx).await,
            None => self.reload_on(db).await,
        }
    }

    pub(crate) async fn save_on<C: Connection>(&mut self, conn: &C) -> Result<()> {
        if self.frozen {
            return Err(self.frozen_error());
        }
        if self.persisted {
            self.update_on(conn).await
        } else {
            self.insert_on(conn).await
        }
    }

    async fn insert_on<C: Connection>(&mut self, conn: &C) -> Result<()> {
        let mut attributes = self.attributes.clone();
        let timestamp = Value::Timestamp(now());
        for column in [self.config.created_at(), self.config.updated_at()].into_iter().flatten() {
            if attributes.get(column).is_none_or(Value::is_null) {
                attributes.insert(column, timestamp.clone());
            }
        }

        let generated = persistence::insert(conn, &self.config, &attributes).await?;
        if let Some(key) = generated {
            attributes.insert(self.config.primary_key(), key);
        }
        self.attributes = attributes;
        self.persisted = true;
        self.original = self.attributes.clone();
        log::debug!("[{}] inserted {:?}", self.config.table(), self.primary_key_value());
        Ok(())
    }

    async fn update_on<C: Connection>(&mut self, conn: &C) -> Result<()> {
        let mut changes = self.dirty();
        if changes.is_empty() {
            return Ok(());
        }
        let key = self.key()?;
        let touched = self.config.updated_at().map(|column| (column.to_string(), Value::Timestamp(now())));
        if let Some((column, timestamp)) = &touched {
            changes.insert(column.as_str(), timestamp.clone());
        }
        if persistence::update(conn, &self.config, &key, &changes).await? == 0 {
            return Err(self.not_found(&key));
        }
        if let Some((column, timestamp)) = touched {
            self.attributes.insert(column, timestamp);
        }
        self.original = self.attributes.clone();
        Ok(())
    }

    async fn delete_on<C: Connection>(&mut self, conn: &C, force: bool) -> Result<()> {
        if self.frozen {
            return Err(self.frozen_error());
        }
        let key = self.key()?;
        match self.config.deleted_at().filter(|_| !force) {
            Some(column) => {
                let column = column.to_string();
                let timestamp = Value::Timestamp(now());
                let mut changes = Attributes::new();
                changes.insert(column.as_str(), timestamp.clone());
                persistence::update(conn, &self.config, &key, &changes).await?;
                self.attributes.insert(column.as_str(), timestamp.clone());
                self.original.insert(column, timestamp);
            }
            None => {
                persistence::delete(conn, &self.config, &key).await?;
            }
        }
        self.frozen = true;
        Ok(())
    }

    async fn restore_on<C: Connection>(&mut self, conn: &C) -> Result<()> {
        let key = self.key()?;
        if !self.is_trashed() {
            return Ok(());
        }
        if let Some(column) = self.config.deleted_at().map(str::to_string) {
            let mut changes = Attributes::new();
            changes.insert(column.as_str(), Value::Null);
            persistence::update(conn, &self.config, &key, &changes).await?;
            self.attributes.insert(column.as_str(), Value::Null);
            self.original.insert(column, Value::Null);
        }
        self.frozen = false;
        Ok(())
    }

    async fn reload_on<C: Connection>(&mut self, conn: &C) -> Result<()> {
        let key = self.key()?;
        let row = persistence::select(conn, &self.config, &key).await?.ok_or_else(|| self.not_found(&key))?;
        self.attributes = decode_model_row(&row, &self.config)?;
        self.original = self.attributes.clone();
        self.frozen = self.is_trashed();
        Ok(())
    }

    /// The persisted primary key, taken from the snapshot.
    fn key(&self) -> Result<Value> {
        let pk = self.config.primary_key();
        match self.original.get(pk).filter(|v| !v.is_null()) {
            Some(key) if self.persisted => Ok(key.clone()),
            _ => Err(Error::NotPersisted { table: self.config.table().to_string() }),
        }
    }

    fn check_writable(&self, key: &str, value: &Value) -> Result<()> {
        if self.frozen {
            return Err(self.frozen_error());
        }
        if self.persisted && key == self.config.primary_key() && self.original.get(key) != Some(value) {
            return Err(Error::ImmutablePrimaryKey {
                table: self.config.table().to_string(),
                column: key.to_string(),
            });
        }
        Ok(())
    }

    fn frozen_error(&self) -> Error {
        Error::FrozenInstance { table: self.config.table().to_string() }
    }

    fn not_found(&self, key: &Value) -> Error {
        Error::ModelNotFound {
            table: self.config.table().to_string(),
            column: self.config.primary_key().to_string(),
            value: key.to_string(),
        }
    }
}

impl<M> Serialize for Instance<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
