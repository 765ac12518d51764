//! Dynamically typed parameters and result rows exchanged with the engine host.

use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, TypeInfo, ValueRef};

use wecare_domain::time::{Timestamp, from_unix_seconds, parse_timestamp};

use crate::error::StorageError;

pub(crate) type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// A single SQL value, following `SQLite` storage classes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub(crate) fn bind_to(self, query: SqliteQuery<'_>) -> SqliteQuery<'_> {
        match self {
            Self::Null => query.bind(None::<String>),
            Self::Integer(v) => query.bind(v),
            Self::Real(v) => query.bind(v),
            Self::Text(v) => query.bind(v),
            Self::Blob(v) => query.bind(v),
        }
    }

    fn decode(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
        let raw = row.try_get_raw(index)?;
        if raw.is_null() {
            return Ok(Self::Null);
        }
        let storage_class = raw.type_info().name().to_ascii_uppercase();
        match storage_class.as_str() {
            "INTEGER" | "BOOLEAN" => row.try_get(index).map(Self::Integer),
            "REAL" => row.try_get(index).map(Self::Real),
            "BLOB" => row.try_get(index).map(Self::Blob),
            _ => row.try_get(index).map(Self::Text),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One result row: column names with their values, in select order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn from_sqlite(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        for (index, column) in row.columns().iter().enumerate() {
            columns.push(column.name().to_string());
            values.push(Value::decode(row, index)?);
        }
        Ok(Self { columns, values })
    }

    /// Raw value of `column`, if selected.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|name| name == column)
            .map(|index| &self.values[index])
    }

    fn require(&self, column: &str) -> Result<&Value, StorageError> {
        self.get(column)
            .ok_or_else(|| StorageError::decode(column, "column not selected"))
    }

    /// Integer value of `column`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Decode`] if missing or not an integer.
    pub fn integer(&self, column: &str) -> Result<i64, StorageError> {
        match self.require(column)? {
            Value::Integer(v) => Ok(*v),
            other => Err(StorageError::decode(column, format!("expected integer, got {other:?}"))),
        }
    }

    /// Non-null text value of `column`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Decode`] if missing, null or not text.
    pub fn text(&self, column: &str) -> Result<String, StorageError> {
        match self.require(column)? {
            Value::Text(v) => Ok(v.clone()),
            other => Err(StorageError::decode(column, format!("expected text, got {other:?}"))),
        }
    }

    /// Optional text of `column`; `NULL` and empty strings read as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Decode`] if missing or of another type.
    pub fn optional_text(&self, column: &str) -> Result<Option<String>, StorageError> {
        match self.require(column)? {
            Value::Null => Ok(None),
            Value::Text(v) if v.is_empty() => Ok(None),
            Value::Text(v) => Ok(Some(v.clone())),
            other => Err(StorageError::decode(column, format!("expected text, got {other:?}"))),
        }
    }

    /// A date or date-time column read back as a UTC timestamp.
    ///
    /// Date-only text becomes midnight UTC; integers are unix seconds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Decode`] if the value is not a recognizable date.
    pub fn timestamp(&self, column: &str) -> Result<Timestamp, StorageError> {
        let parsed = match self.require(column)? {
            Value::Text(v) => parse_timestamp(v),
            Value::Integer(secs) => from_unix_seconds(*secs),
            _ => None,
        };
        parsed.ok_or_else(|| StorageError::decode(column, "not a date"))
    }
}

/// Outcome of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub rows_affected: u64,
}

impl QueryResult {
    /// First row, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }
}
