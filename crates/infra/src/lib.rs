//! Infrastructure layer: storage adapters, services, reporting views.

pub mod batch_service;
pub mod batch_store;
pub mod ledger_service;
pub mod ledger_store;
pub mod reports;


pub use batch_service::BatchRegistry;
pub use batch_store::{BatchStore, InMemoryBatchStore, PostgresBatchStore};
pub use ledger_service::{InventoryLedger, ServiceError};
pub use ledger_store::{
    EntryPage, InMemoryLedgerStore, LedgerCommit, LedgerStore, Pagination, PostgresLedgerStore,
    StoreError,
};
