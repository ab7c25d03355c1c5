//! Backend implementations.
//!
//! [`InMemory`] keeps every table in memory and persists to a JSON file;
//! [`SqlxBackend`] talks to SQLite or PostgreSQL through sqlx.

mod in_memory;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub mod sql;

pub use in_memory::InMemory;
#[cfg(feature = "postgres")]
pub use sql::Postgres;
#[cfg(feature = "sqlite")]
pub use sql::Sqlite;
#[cfg(any(feature = "sqlite", feature = "postgres"))]
pub use sql::SqlxBackend;
