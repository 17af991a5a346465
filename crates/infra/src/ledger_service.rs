//! Ledger operation pipeline (application-level orchestration).
//!
//! Every mutation follows the same shape:
//!
//! ```text
//! Command
//!   ↓
//! 1. Load current position(s) from the store (tenant-scoped)
//!   ↓
//! 2. Plan the movement (pure decision logic, enforces invariants)
//!   ↓
//! 3. Commit post-state + audit entries as one atomic unit
//!    (optimistic concurrency check inside the store's boundary)
//! ```
//!
//! The service performs no implicit retries: `Conflict` and
//! `InsufficientStock` are expected, recoverable outcomes the caller
//! branches on, and a blind retry of a non-idempotent mutation would
//! double-apply it.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use stockbook_core::{ActorId, BatchId, DomainError, ProductId, TenantId};
use stockbook_ledger::{
    is_available, AddQuantity, InventoryPosition, LedgerEntry, RecordAdjustment, ReduceQuantity,
    SetQuantity, TransferQuantity,
};

use crate::ledger_store::{EntryPage, LedgerCommit, LedgerStore, Pagination, StoreError};

/// Failure surfaced to request handlers.
///
/// `InsufficientStock` and `Conflict` are expected outcomes (reject the
/// order line, or retry); `Storage` is surfaced as-is for the request layer
/// to map to a generic failure response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found")]
    NotFound,

    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock {
        available: Decimal,
        requested: Decimal,
    },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::NotFound => ServiceError::NotFound,
            DomainError::InsufficientStock {
                available,
                requested,
            } => ServiceError::InsufficientStock {
                available,
                requested,
            },
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Storage(other.to_string()),
        }
    }
}

/// The Inventory Ledger: owner of positions and their authorized mutations.
///
/// Generic over the store so tests run against
/// [`InMemoryLedgerStore`](crate::ledger_store::InMemoryLedgerStore) and
/// production against
/// [`PostgresLedgerStore`](crate::ledger_store::PostgresLedgerStore) without
/// touching this code. The `(tenant_id, actor_id)` pair is trusted input —
/// identity is resolved by the authentication collaborator before any call
/// lands here.
#[derive(Debug)]
pub struct InventoryLedger<S> {
    store: S,
}

impl<S> InventoryLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

impl<S> InventoryLedger<S>
where
    S: LedgerStore,
{
    /// Add stock to a batch position, creating the position lazily.
    #[instrument(skip(self, cmd), fields(tenant_id = %cmd.tenant_id, actor_id = %actor_id), err)]
    pub fn add_quantity(
        &self,
        actor_id: ActorId,
        cmd: AddQuantity,
    ) -> Result<InventoryPosition, ServiceError> {
        let current = self
            .store
            .position(cmd.tenant_id, cmd.product_id, cmd.batch_id)?;
        let plan = cmd.plan(current)?;
        let committed = self
            .store
            .commit(LedgerCommit::from_plan(cmd.tenant_id, plan))?;
        single_position(committed)
    }

    /// Remove stock from a batch position; fails with `InsufficientStock`
    /// and no state change when the on-hand quantity does not cover it.
    #[instrument(skip(self, cmd), fields(tenant_id = %cmd.tenant_id, actor_id = %actor_id), err)]
    pub fn reduce_quantity(
        &self,
        actor_id: ActorId,
        cmd: ReduceQuantity,
    ) -> Result<InventoryPosition, ServiceError> {
        let current = self
            .store
            .position(cmd.tenant_id, cmd.product_id, cmd.batch_id)?;
        let plan = cmd.plan(current)?;
        let committed = self
            .store
            .commit(LedgerCommit::from_plan(cmd.tenant_id, plan))?;
        single_position(committed)
    }

    /// Overwrite a position's quantity (manual stock take).
    ///
    /// Writes no audit entry by itself — pair with [`record_adjustment`]
    /// when the correction should be audited.
    ///
    /// [`record_adjustment`]: InventoryLedger::record_adjustment
    #[instrument(skip(self, cmd), fields(tenant_id = %cmd.tenant_id, actor_id = %actor_id), err)]
    pub fn set_quantity(
        &self,
        actor_id: ActorId,
        cmd: SetQuantity,
    ) -> Result<InventoryPosition, ServiceError> {
        let current = self
            .store
            .position(cmd.tenant_id, cmd.product_id, cmd.batch_id)?;
        let plan = cmd.plan(current)?;
        let committed = self
            .store
            .commit(LedgerCommit::from_plan(cmd.tenant_id, plan))?;
        single_position(committed)
    }

    /// Move stock between two batches of a product as one atomic unit.
    ///
    /// Both position writes and both audit entries commit together; if the
    /// reduce leg fails, the add leg never executes and nothing is written.
    /// Returns the committed (source, destination) positions.
    #[instrument(skip(self, cmd), fields(tenant_id = %cmd.tenant_id, actor_id = %actor_id), err)]
    pub fn transfer_quantity(
        &self,
        actor_id: ActorId,
        cmd: TransferQuantity,
    ) -> Result<(InventoryPosition, InventoryPosition), ServiceError> {
        let from = self
            .store
            .position(cmd.tenant_id, cmd.product_id, cmd.from_batch_id)?;
        let to = self
            .store
            .position(cmd.tenant_id, cmd.product_id, cmd.to_batch_id)?;
        let plan = cmd.plan(from, to)?;
        let committed = self
            .store
            .commit(LedgerCommit::from_plan(cmd.tenant_id, plan))?;

        let mut iter = committed.into_iter();
        match (iter.next(), iter.next()) {
            (Some(source), Some(dest)) => Ok((source, dest)),
            _ => Err(ServiceError::Storage(
                "transfer commit returned incomplete positions".to_string(),
            )),
        }
    }

    /// Record a standalone `ADJUSTMENT` audit entry (the audited companion
    /// to [`set_quantity`](InventoryLedger::set_quantity)).
    #[instrument(skip(self, cmd), fields(tenant_id = %cmd.tenant_id, actor_id = %actor_id), err)]
    pub fn record_adjustment(
        &self,
        actor_id: ActorId,
        cmd: RecordAdjustment,
    ) -> Result<LedgerEntry, ServiceError> {
        let entry = cmd.entry()?;
        self.store
            .commit(LedgerCommit::entries_only(cmd.tenant_id, vec![entry.clone()]))?;
        Ok(entry)
    }

    /// Advisory availability check. A race may occur between this check and
    /// a later reduce; the reduce is the authoritative, atomic gate.
    pub fn availability(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
        required: Decimal,
    ) -> Result<bool, ServiceError> {
        let position = self.store.position(tenant_id, product_id, batch_id)?;
        Ok(is_available(position.as_ref(), required))
    }

    /// Current position for one key, if it exists yet.
    pub fn position(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
    ) -> Result<Option<InventoryPosition>, ServiceError> {
        Ok(self.store.position(tenant_id, product_id, batch_id)?)
    }

    /// Audit trail for a product, most recent first.
    pub fn entries_by_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        pagination: Pagination,
    ) -> Result<EntryPage, ServiceError> {
        Ok(self
            .store
            .entries_by_product(tenant_id, product_id, pagination)?)
    }

    /// Audit trail for a batch, most recent first.
    pub fn entries_by_batch(
        &self,
        tenant_id: TenantId,
        batch_id: BatchId,
        pagination: Pagination,
    ) -> Result<EntryPage, ServiceError> {
        Ok(self.store.entries_by_batch(tenant_id, batch_id, pagination)?)
    }
}

fn single_position(committed: Vec<InventoryPosition>) -> Result<InventoryPosition, ServiceError> {
    committed.into_iter().next().ok_or_else(|| {
        ServiceError::Storage("commit returned no position".to_string())
    })
}
