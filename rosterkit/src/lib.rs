//! Shared kit for talking to ScyllaDB/Cassandra: session setup, paging-state
//! scans, configuration, errors and metrics.

pub mod config;
pub mod database;
pub mod errors;
pub mod metrics;
pub mod types;

pub use errors::RosterError;
