pub mod ident;
pub mod postgres;
pub mod select;
