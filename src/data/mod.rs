pub mod aircraft;
pub mod filter;
