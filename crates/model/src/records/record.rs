use crate::records::row::Row;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RowError {
    #[error("Missing column '{column}' in result row")]
    MissingColumn { column: String },

    #[error("Column '{column}' has type {actual}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Conversion seam between untyped result rows and the caller's record
/// shape. The engine stays generic; call sites pick the concrete type.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, RowError>;
}

/// Identity conversion for callers that want the raw row.
impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, RowError> {
        Ok(row.clone())
    }
}

/// Convenience for typed column extraction inside `FromRow` impls.
pub fn require_i64(row: &Row, column: &str) -> Result<i64, RowError> {
    let value = row.get(column).ok_or_else(|| RowError::MissingColumn {
        column: column.to_string(),
    })?;
    value.as_i64().ok_or_else(|| RowError::TypeMismatch {
        column: column.to_string(),
        expected: "int",
        actual: value.type_name(),
    })
}

pub fn require_str<'a>(row: &'a Row, column: &str) -> Result<&'a str, RowError> {
    let value = row.get(column).ok_or_else(|| RowError::MissingColumn {
        column: column.to_string(),
    })?;
    value.as_str().ok_or_else(|| RowError::TypeMismatch {
        column: column.to_string(),
        expected: "string",
        actual: value.type_name(),
    })
}
