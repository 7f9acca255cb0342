//! Engine-neutral SQL parameter and row types.
//!
//! Statements are written with positional `?` placeholders and parameters
//! are bound from [`SqlValue`]s. Rows come back as [`SqlRow`], a list of
//! named values with typed accessors. Timestamps are stored as integer
//! microseconds since the Unix epoch and flags as `0`/`1` integers.

use chrono::{DateTime, Utc};

use crate::error::{AppError, ErrorKind};
use crate::result::AppResult;

/// A positional statement parameter or a decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// 64-bit integer.
    Int(i64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// UTC instant, bound as microseconds since the epoch.
    Timestamp(DateTime<Utc>),
    /// SQL `NULL`.
    Null,
}

impl SqlValue {
    /// Encode a boolean as a `0`/`1` integer flag.
    pub fn flag(value: bool) -> Self {
        Self::Int(i64::from(value))
    }

    /// Encode an optional timestamp.
    pub fn opt_timestamp(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Null, Self::Timestamp)
    }

    /// Encode optional text.
    pub fn opt_text(value: Option<&str>) -> Self {
        value.map_or(Self::Null, |v| Self::Text(v.to_string()))
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Convert microseconds since the epoch back into a UTC instant.
pub fn micros_to_datetime(micros: i64) -> AppResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| AppError::database(format!("Timestamp out of range: {micros}")))
}

/// A single result row: column names paired with decoded values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

impl SqlRow {
    /// Build a row from `(column, value)` pairs.
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Raw value of a column, or `None` if the row has no such column.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    fn require(&self, column: &str) -> AppResult<&SqlValue> {
        self.get(column)
            .ok_or_else(|| AppError::database(format!("Column '{column}' missing from row")))
    }

    /// Nullable integer column.
    pub fn opt_i64(&self, column: &str) -> AppResult<Option<i64>> {
        match self.require(column)? {
            SqlValue::Int(v) => Ok(Some(*v)),
            SqlValue::Timestamp(ts) => Ok(Some(ts.timestamp_micros())),
            SqlValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| AppError::database(format!("Column '{column}' is not an integer"))),
            SqlValue::Null => Ok(None),
            SqlValue::Bytes(_) => Err(AppError::database(format!(
                "Column '{column}' is not an integer"
            ))),
        }
    }

    /// Non-null integer column.
    pub fn i64(&self, column: &str) -> AppResult<i64> {
        self.opt_i64(column)?
            .ok_or_else(|| AppError::database(format!("Column '{column}' is NULL")))
    }

    /// Integer flag column (`0` is false, anything else true).
    pub fn flag(&self, column: &str) -> AppResult<bool> {
        Ok(self.opt_i64(column)?.unwrap_or(0) != 0)
    }

    /// Nullable text column.
    pub fn opt_string(&self, column: &str) -> AppResult<Option<String>> {
        match self.require(column)? {
            SqlValue::Text(s) => Ok(Some(s.clone())),
            SqlValue::Int(v) => Ok(Some(v.to_string())),
            SqlValue::Bytes(b) => String::from_utf8(b.clone())
                .map(Some)
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        format!("Column '{column}' is not UTF-8"),
                        e,
                    )
                }),
            SqlValue::Timestamp(ts) => Ok(Some(ts.to_rfc3339())),
            SqlValue::Null => Ok(None),
        }
    }

    /// Non-null text column.
    pub fn string(&self, column: &str) -> AppResult<String> {
        self.opt_string(column)?
            .ok_or_else(|| AppError::database(format!("Column '{column}' is NULL")))
    }

    /// Non-null binary column.
    pub fn bytes(&self, column: &str) -> AppResult<Vec<u8>> {
        match self.require(column)? {
            SqlValue::Bytes(b) => Ok(b.clone()),
            SqlValue::Text(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(AppError::database(format!("Column '{column}' is not binary"))),
        }
    }

    /// Nullable timestamp column stored as epoch microseconds.
    pub fn opt_timestamp(&self, column: &str) -> AppResult<Option<DateTime<Utc>>> {
        self.opt_i64(column)?.map(micros_to_datetime).transpose()
    }

    /// Non-null timestamp column stored as epoch microseconds.
    pub fn timestamp(&self, column: &str) -> AppResult<DateTime<Utc>> {
        micros_to_datetime(self.i64(column)?)
    }
}
