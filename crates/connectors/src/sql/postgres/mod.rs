pub mod executor;
pub mod params;
