//! # Persistence Module
//!
//! Single-row statements issued on behalf of an [`Instance`]: INSERT with
//! key write-back, UPDATE by primary key, DELETE, and re-reading a row.
//!
//! [`Instance`]: crate::Instance

use sqlx::any::AnyRow;

use crate::{
    attributes::Attributes,
    database::{Connection, Drivers},
    errors::Result,
    hydration::decode_value,
    model::ModelConfig,
    sql::SqlWriter,
    value::Value,
};

/// Inserts `attributes` into the model's table.
///
/// A `NULL` primary key is left out when the key is incrementing. Returns the
/// generated key for incrementing models (`RETURNING` on PostgreSQL and
/// SQLite, the driver's last insert id on MySQL), `None` otherwise.
pub(crate) async fn insert<C: Connection>(
    conn: &C,
    config: &ModelConfig,
    attributes: &Attributes,
) -> Result<Option<Value>> {
    let pk = config.primary_key();
    let columns: Vec<(&str, &Value)> = attributes
        .iter()
        .filter(|(column, value)| !(config.incrementing() && *column == pk && value.is_null()))
        .collect();

    let driver = conn.driver();
    let mut w = SqlWriter::new(driver);
    w.push("INSERT INTO ").push_identifier(config.table());
    if columns.is_empty() {
        w.push(match driver {
            Drivers::MySQL => " () VALUES ()",
            Drivers::Postgres | Drivers::SQLite => " DEFAULT VALUES",
        });
    } else {
        w.push(" (");
        for (i, (column, _)) in columns.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_identifier(column);
        }
        w.push(") VALUES (");
        for (i, (_, value)) in columns.iter().enumerate() {
            if i > 0 {
                w.push(", ");
            }
            w.push_value(value)?;
        }
        w.push(")");
    }

    if !config.incrementing() {
        let (sql, args) = w.finish();
        conn.execute(&sql, args).await?;
        return Ok(None);
    }

    if driver != Drivers::MySQL {
        w.push(" RETURNING ").push_identifier(pk);
        let (sql, args) = w.finish();
        let row = conn.fetch_one(&sql, args).await?;
        return Ok(Some(decode_value(&row, 0)?));
    }

    let (sql, args) = w.finish();
    let result = conn.execute(&sql, args).await?;
    Ok(result.last_insert_id().map(Value::Int))
}

/// Writes `changes` to the row whose primary key is `key`.
pub(crate) async fn update<C: Connection>(
    conn: &C,
    config: &ModelConfig,
    key: &Value,
    changes: &Attributes,
) -> Result<u64> {
    let mut w = SqlWriter::new(conn.driver());
    w.push("UPDATE ").push_identifier(config.table()).push(" SET ");
    for (i, (column, value)) in changes.iter().enumerate() {
        if i > 0 {
            w.push(", ");
        }
        w.push_identifier(column).push(" = ").push_value(value)?;
    }
    w.push(" WHERE ").push_identifier(config.primary_key()).push(" = ").push_value(key)?;
    let (sql, args) = w.finish();
    Ok(conn.execute(&sql, args).await?.rows_affected())
}

/// Removes the row whose primary key is `key`.
pub(crate) async fn delete<C: Connection>(conn: &C, config: &ModelConfig, key: &Value) -> Result<u64> {
    let mut w = SqlWriter::new(conn.driver());
    w.push("DELETE FROM ")
        .push_identifier(config.table())
        .push(" WHERE ")
        .push_identifier(config.primary_key())
        .push(" = ")
        .push_value(key)?;
    let (sql, args) = w.finish();
    Ok(conn.execute(&sql, args).await?.rows_affected())
}

/// Reads the row whose primary key is `key`, ignoring scopes and soft
/// deletes.
pub(crate) async fn select<C: Connection>(conn: &C, config: &ModelConfig, key: &Value) -> Result<Option<AnyRow>> {
    let mut w = SqlWriter::new(conn.driver());
    w.push("SELECT * FROM ")
        .push_identifier(config.table())
        .push(" WHERE ")
        .push_identifier(config.primary_key())
        .push(" = ")
        .push_value(key)?;
    let (sql, args) = w.finish();
    conn.fetch_optional(&sql, args).await
}
