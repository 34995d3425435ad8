//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod exchange;
pub mod github;
pub mod graph;
pub mod http;
pub mod storage;
pub mod telemetry;
