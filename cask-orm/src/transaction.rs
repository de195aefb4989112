use futures::future::BoxFuture;
use sqlx::{
    Any,
    any::{AnyArguments, AnyQueryResult, AnyRow},
};
use std::{
    fmt,
    sync::{Arc, Weak},
};
use tokio::sync::Mutex;

use crate::{
    database::{Connection, Drivers, RawQuery},
    errors::{Error, Result},
    model::Model,
    query_builder::QueryBuilder,
    scope::ScopeRegistry,
};

type SharedTx = Mutex<Option<sqlx::Transaction<'static, Any>>>;

/// A wrapper around a SQLx transaction.
///
/// Cloning yields another handle to the same transaction. Queries opened with
/// [`Transaction::model`] and instances bound with `Instance::use_transaction`
/// run inside it. Committing or rolling back is always left to the caller;
/// once either happened every handle reports [`Error::TransactionClosed`].
#[derive(Clone)]
pub struct Transaction {
    pub(crate) tx: Arc<SharedTx>,
    pub(crate) driver: Drivers,
    pub(crate) scopes: Arc<ScopeRegistry>,
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction").field("driver", &self.driver).finish_non_exhaustive()
    }
}

impl Transaction {
    pub(crate) fn new(tx: sqlx::Transaction<'static, Any>, driver: Drivers, scopes: Arc<ScopeRegistry>) -> Self {
        Self { tx: Arc::new(Mutex::new(Some(tx))), driver, scopes }
    }

    /// Starts building a query within this transaction.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let trx = db.begin().await?;
    ///
    /// // These operations are part of the transaction
    /// let user = trx.model::<User>().create(attributes! { "email" => "a@b.c" }).await?;
    /// trx.model::<Profile>().create(attributes! { "user_id" => user.get("id").cloned() }).await?;
    ///
    /// trx.commit().await?;
    /// ```
    pub fn model<M: Model>(&self) -> QueryBuilder<M, Self> {
        QueryBuilder::new(self.clone())
    }

    /// Creates a raw SQL query running inside this transaction.
    pub fn raw<'a>(&self, sql: &'a str) -> RawQuery<'a, Self> {
        RawQuery::new(self.clone(), sql)
    }

    /// A weak handle to this transaction, as stored by bound instances.
    pub fn handle(&self) -> TransactionHandle {
        TransactionHandle { tx: Arc::downgrade(&self.tx), driver: self.driver, scopes: self.scopes.clone() }
    }

    /// `true` until the transaction is committed or rolled back.
    pub async fn is_active(&self) -> bool {
        self.tx.lock().await.is_some()
    }

    /// Commits the transaction.
    pub async fn commit(self) -> Result<()> {
        let tx = self.tx.lock().await.take().ok_or(Error::TransactionClosed)?;
        tx.commit().await?;
        log::debug!("transaction committed");
        Ok(())
    }

    /// Rolls back the transaction.
    ///
    /// Dropping every handle without committing also rolls back; this method
    /// makes it explicit.
    pub async fn rollback(self) -> Result<()> {
        let tx = self.tx.lock().await.take().ok_or(Error::TransactionClosed)?;
        tx.rollback().await?;
        log::debug!("transaction rolled back");
        Ok(())
    }
}

impl Connection for Transaction {
    fn driver(&self) -> Drivers {
        self.driver
    }

    fn scopes(&self) -> &Arc<ScopeRegistry> {
        &self.scopes
    }

    fn transaction(&self) -> Option<TransactionHandle> {
        Some(self.handle())
    }

    fn execute<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyQueryResult>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let tx = guard.as_mut().ok_or(Error::TransactionClosed)?;
            log::debug!("[trx] {}", sql);
            Ok(sqlx::query_with(sql, args).execute(&mut **tx).await?)
        })
    }

    fn fetch_all<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Vec<AnyRow>>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let tx = guard.as_mut().ok_or(Error::TransactionClosed)?;
            log::debug!("[trx] {}", sql);
            Ok(sqlx::query_with(sql, args).fetch_all(&mut **tx).await?)
        })
    }

    fn fetch_one<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyRow>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let tx = guard.as_mut().ok_or(Error::TransactionClosed)?;
            log::debug!("[trx] {}", sql);
            Ok(sqlx::query_with(sql, args).fetch_one(&mut **tx).await?)
        })
    }

    fn fetch_optional<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Option<AnyRow>>> {
        Box::pin(async move {
            let mut guard = self.tx.lock().await;
            let tx = guard.as_mut().ok_or(Error::TransactionClosed)?;
            log::debug!("[trx] {}", sql);
            Ok(sqlx::query_with(sql, args).fetch_optional(&mut **tx).await?)
        })
    }
}

/// A non-owning reference to a [`Transaction`].
///
/// Instances keep one of these after `use_transaction`; it never keeps the
/// transaction alive on its own.
#[derive(Clone)]
pub struct TransactionHandle {
    tx: Weak<SharedTx>,
    driver: Drivers,
    scopes: Arc<ScopeRegistry>,
}

impl fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandle").field("alive", &(self.tx.strong_count() > 0)).finish()
    }
}

impl TransactionHandle {
    /// The transaction, if some handle still holds it.
    pub fn upgrade(&self) -> Option<Transaction> {
        self.tx.upgrade().map(|tx| Transaction { tx, driver: self.driver, scopes: self.scopes.clone() })
    }

    /// Whether this handle refers to `trx`.
    pub fn refers_to(&self, trx: &Transaction) -> bool {
        Weak::ptr_eq(&self.tx, &Arc::downgrade(&trx.tx))
    }
}
