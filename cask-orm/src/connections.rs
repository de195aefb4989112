//! # Connections Module
//!
//! Resolution of a model's `connection` name to a [`Database`].

use std::collections::HashMap;

use crate::{
    config::ConnectionsConfig,
    database::Database,
    errors::{Error, Result},
    model::Model,
    query_builder::QueryBuilder,
};

/// Named databases plus a default one.
///
/// # Example
///
/// ```rust,ignore
/// let manager = ConnectionManager::new(primary).with(reports);
/// let rows = manager.model::<Report>()?.fetch().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionManager {
    default: String,
    databases: HashMap<String, Database>,
}

impl ConnectionManager {
    /// A manager whose default connection is `database`.
    pub fn new(database: Database) -> Self {
        let default = database.name().to_string();
        let mut databases = HashMap::new();
        databases.insert(default.clone(), database);
        Self { default, databases }
    }

    /// Opens every configured connection.
    pub async fn connect(config: &ConnectionsConfig) -> Result<Self> {
        let mut databases = HashMap::with_capacity(config.connections.len());
        for (name, settings) in &config.connections {
            let mut settings = settings.clone();
            settings.name.get_or_insert_with(|| name.clone());
            databases.insert(name.clone(), Database::from_config(&settings).await?);
        }
        if !databases.contains_key(&config.default) {
            return Err(Error::UnknownConnection(config.default.clone()));
        }
        Ok(Self { default: config.default.clone(), databases })
    }

    /// Registers `database` under its own name.
    pub fn with(mut self, database: Database) -> Self {
        self.add(database);
        self
    }

    pub fn add(&mut self, database: Database) {
        if let Some(previous) = self.databases.insert(database.name().to_string(), database) {
            log::warn!("connection `{}` replaced", previous.name());
        }
    }

    pub fn default_database(&self) -> &Database {
        &self.databases[&self.default]
    }

    pub fn get(&self, name: &str) -> Result<&Database> {
        self.databases.get(name).ok_or_else(|| Error::UnknownConnection(name.to_string()))
    }

    /// The database `M` is configured for, or the default one.
    pub fn for_model<M: Model>(&self) -> Result<&Database> {
        match M::config().connection() {
            Some(name) => self.get(name),
            None => Ok(self.default_database()),
        }
    }

    /// Starts a query for `M` on its configured database.
    pub fn model<M: Model>(&self) -> Result<QueryBuilder<M, Database>> {
        Ok(self.for_model::<M>()?.model::<M>())
    }
}
