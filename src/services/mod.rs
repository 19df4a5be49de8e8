pub mod connectivity;
pub mod dedup;
pub mod errors;
pub mod event_log;
pub mod intervals;
pub mod orchestrator;
pub mod query_builder;
pub mod registry;
