use crate::core::value::Value;
use serde::{Deserialize, Serialize};

/// One named cell of a result row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cell {
    pub name: String,
    pub value: Value,
}

/// An untyped result row, column order preserved as returned by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Row { cells }
    }

    pub fn push(&mut self, name: &str, value: Value) {
        self.cells.push(Cell {
            name: name.to_string(),
            value,
        });
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(column))
            .map(|c| &c.value)
    }

    /// Like `get`, but missing columns collapse to `Value::Null`.
    pub fn get_value(&self, column: &str) -> Value {
        self.get(column).cloned().unwrap_or(Value::Null)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Row {
            cells: iter
                .into_iter()
                .map(|(name, value)| Cell { name, value })
                .collect(),
        }
    }
}
