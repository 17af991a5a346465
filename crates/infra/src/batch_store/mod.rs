//! Batch registry storage boundary.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryBatchStore;
pub use postgres::PostgresBatchStore;
pub use r#trait::BatchStore;
