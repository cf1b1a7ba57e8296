pub mod backend;
pub mod pipeline_impl;
pub mod queries;
pub mod schema;

pub use backend::DuckDbBackend;

/// Re-export the `duckdb` crate so tests can reach `params!` without an extra
/// dependency.
pub use duckdb;
