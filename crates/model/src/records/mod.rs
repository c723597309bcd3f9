pub mod batch;
pub mod record;
pub mod row;
