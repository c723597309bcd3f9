use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Traversal direction over the cursor column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// SQL keyword for the ORDER BY clause.
    pub fn order_keyword(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }

    /// Comparison operator binding the cursor predicate: strictly greater
    /// when ascending, strictly less when descending.
    pub fn comparison_operator(&self) -> &'static str {
        match self {
            SortDirection::Ascending => ">",
            SortDirection::Descending => "<",
        }
    }

    /// True when `next` advances past `prev` in this direction.
    pub fn advances(&self, prev: &Value, next: &Value) -> bool {
        match self {
            SortDirection::Ascending => prev < next,
            SortDirection::Descending => next < prev,
        }
    }
}

/// Position within a cursor traversal: the last-seen value of the monotonic
/// cursor column, or `None` before the first page.
///
/// The traversal assumes the cursor column holds unique values. If several
/// rows share the boundary value across a page split, the strict comparison
/// can re-select the same tail rows on every subsequent page. That matches
/// the observed behavior of the system this engine was extracted from and is
/// deliberately not papered over here; see DESIGN.md.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub enum Cursor {
    #[default]
    None,
    After(Value),
}

impl Cursor {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Cursor::None => None,
            Cursor::After(v) => Some(v),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Cursor::None)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cursor::None => f.write_str("<start>"),
            Cursor::After(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_operators() {
        assert_eq!(SortDirection::Ascending.comparison_operator(), ">");
        assert_eq!(SortDirection::Descending.comparison_operator(), "<");
        assert_eq!(SortDirection::Ascending.order_keyword(), "ASC");
    }

    #[test]
    fn advances_respects_direction() {
        let prev = Value::Int(10);
        let next = Value::Int(11);
        assert!(SortDirection::Ascending.advances(&prev, &next));
        assert!(!SortDirection::Descending.advances(&prev, &next));
        assert!(!SortDirection::Ascending.advances(&prev, &prev));
    }
}
