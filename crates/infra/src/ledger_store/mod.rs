//! Ledger storage boundary.
//!
//! This module defines an infrastructure-facing abstraction for reading
//! positions, committing movement plans, and reading the append-only audit
//! trail, without making any storage assumptions.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use query::{EntryPage, Pagination};
pub use r#trait::{LedgerCommit, LedgerStore, StoreError};
