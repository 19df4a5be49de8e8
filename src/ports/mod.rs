pub mod chain_api;
pub mod persistence;
pub mod sink;
