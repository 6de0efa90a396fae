//! Local store backends for the durable feed copy.
//!
//! - [`memory::InMemoryStore`]: in-process, lost on restart
//! - [`sql::SqlStore`]: SQLite or MySQL through the sqlx `Any` driver

pub mod traits;
pub mod memory;
pub mod sql;
