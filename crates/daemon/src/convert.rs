// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversion between TOML values (config, persisted state) and wire values.

use rmpv::Value;
use thiserror::Error;
use toml::Table;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("null values cannot be stored in a table")]
    Nil,

    #[error("integer {0} does not fit in a signed 64-bit value")]
    IntegerRange(u64),

    #[error("map keys must be strings, got {0}")]
    NonStringKey(String),

    #[error("expected a map, got {0}")]
    NotAMap(String),

    #[error("{0} values cannot be stored in a table")]
    Unsupported(&'static str),
}

pub fn to_value(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::from(s.as_str()),
        toml::Value::Integer(n) => Value::from(*n),
        toml::Value::Float(f) => Value::F64(*f),
        toml::Value::Boolean(b) => Value::Boolean(*b),
        toml::Value::Datetime(dt) => Value::from(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.iter().map(to_value).collect()),
        toml::Value::Table(table) => table_to_value(table),
    }
}

pub fn table_to_value(table: &Table) -> Value {
    Value::Map(table.iter().map(|(k, v)| (Value::from(k.as_str()), to_value(v))).collect())
}

pub fn from_value(value: Value) -> Result<toml::Value, ConvertError> {
    Ok(match value {
        Value::Nil => return Err(ConvertError::Nil),
        Value::Boolean(b) => toml::Value::Boolean(b),
        Value::Integer(n) => match n.as_i64() {
            Some(n) => toml::Value::Integer(n),
            None => return Err(ConvertError::IntegerRange(n.as_u64().unwrap_or(u64::MAX))),
        },
        Value::F32(f) => toml::Value::Float(f64::from(f)),
        Value::F64(f) => toml::Value::Float(f),
        Value::String(s) => match s.into_str() {
            Some(s) => toml::Value::String(s),
            None => return Err(ConvertError::Unsupported("non-UTF-8 string")),
        },
        Value::Array(items) => {
            toml::Value::Array(items.into_iter().map(from_value).collect::<Result<_, _>>()?)
        }
        Value::Map(entries) => toml::Value::Table(entries_to_table(entries)?),
        Value::Binary(_) => return Err(ConvertError::Unsupported("binary")),
        Value::Ext(..) => return Err(ConvertError::Unsupported("extension")),
    })
}

pub fn table_from_value(value: Value) -> Result<Table, ConvertError> {
    match value {
        Value::Map(entries) => entries_to_table(entries),
        other => Err(ConvertError::NotAMap(other.to_string())),
    }
}

fn entries_to_table(entries: Vec<(Value, Value)>) -> Result<Table, ConvertError> {
    let mut table = Table::new();
    for (key, value) in entries {
        let key = match key {
            Value::String(s) => {
                s.into_str().ok_or(ConvertError::Unsupported("non-UTF-8 key"))?
            }
            other => return Err(ConvertError::NonStringKey(other.to_string())),
        };
        table.insert(key, from_value(value)?);
    }
    Ok(table)
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
