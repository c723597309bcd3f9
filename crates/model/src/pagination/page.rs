use crate::pagination::cursor::Cursor;

/// One page of a cursor traversal. `end_cursor` is the cursor-column value
/// of the last row, i.e. the position the next page resumes after.
#[derive(Debug, Clone)]
pub struct Page<R> {
    pub index: usize,
    pub rows: Vec<R>,
    pub end_cursor: Cursor,
    /// Set when the page came back shorter than the limit, which signals
    /// traversal exhaustion.
    pub is_last: bool,
}

impl<R> Page<R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Maps the row type while keeping index and cursor position intact.
    pub fn map_rows<O>(self, rows: Vec<O>) -> Page<O> {
        Page {
            index: self.index,
            rows,
            end_cursor: self.end_cursor,
            is_last: self.is_last,
        }
    }
}
