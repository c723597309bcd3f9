pub mod cursor;
pub mod page;
