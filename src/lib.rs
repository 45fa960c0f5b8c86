//! Read-only SQLite explorer exposed as MCP tools.
//!
//! Three tools are served: `get_all_tables`, `describe_table` and
//! `execute_query`. Every tool answers with a JSON list; rejected or failing
//! queries come back as a one-element list holding `{error, type}`.

pub mod config;
pub mod error;
pub mod security;
pub mod server;
pub mod tools;

pub use config::{ConnectionProvider, DatabaseConfig};
pub use error::PeekError;
pub use security::{KeywordBlocklist, QueryGate, SafetyVerdict};
pub use server::SqliteHandler;
