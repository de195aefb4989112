//! # Hydration Module
//!
//! Decoding of driver rows into [`Attributes`]. The `Any` driver reports a
//! type per value, which picks the Rust type used to read it.

use sqlx::{Column, Row, TypeInfo, ValueRef, any::AnyRow};

use crate::{
    attributes::Attributes,
    errors::Result,
    model::ModelConfig,
    value::{Value, parse_timestamp},
};

/// Decodes every column of `row`, in column order.
pub(crate) fn decode_row(row: &AnyRow) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    for column in row.columns() {
        let value = decode_value(row, column.ordinal())?;
        attributes.insert(column.name(), value);
    }
    Ok(attributes)
}

/// Decodes a row for a model: configured timestamp columns stored as text
/// come back as [`Value::Timestamp`].
pub(crate) fn decode_model_row(row: &AnyRow, config: &ModelConfig) -> Result<Attributes> {
    let mut attributes = decode_row(row)?;
    coerce_timestamps(config, &mut attributes);
    Ok(attributes)
}

pub(crate) fn coerce_timestamps(config: &ModelConfig, attributes: &mut Attributes) {
    let columns: Vec<String> = attributes.keys().filter(|key| config.is_timestamp(key)).map(str::to_string).collect();
    for column in columns {
        let parsed = match attributes.get(&column) {
            Some(Value::Text(text)) => parse_timestamp(text),
            _ => None,
        };
        if let Some(ts) = parsed {
            attributes.insert(column, Value::Timestamp(ts));
        }
    }
}

/// Decodes the column at `index`.
pub(crate) fn decode_value(row: &AnyRow, index: usize) -> Result<Value> {
    let type_name = {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        raw.type_info().name().to_string()
    };

    let value = match type_name.as_str() {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(index)?),
        "SMALLINT" => Value::Int(i64::from(row.try_get::<i16, _>(index)?)),
        "INTEGER" => Value::Int(i64::from(row.try_get::<i32, _>(index)?)),
        "BIGINT" => Value::Int(row.try_get::<i64, _>(index)?),
        "REAL" => Value::Float(f64::from(row.try_get::<f32, _>(index)?)),
        "DOUBLE" => Value::Float(row.try_get::<f64, _>(index)?),
        "BLOB" => Value::Bytes(row.try_get::<Vec<u8>, _>(index)?),
        _ => Value::Text(row.try_get::<String, _>(index)?),
    };
    Ok(value)
}
