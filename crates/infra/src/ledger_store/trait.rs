use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use stockbook_core::{BatchId, ProductId, TenantId};
use stockbook_ledger::{InventoryPosition, LedgerEntry, MovementPlan};

use super::query::{EntryPage, Pagination};

/// One atomic unit of ledger work: position writes plus audit entries.
///
/// Either everything in the commit is persisted or nothing is. A commit with
/// no position writes is how standalone `ADJUSTMENT` entries reach the trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCommit {
    pub tenant_id: TenantId,
    /// Post-state positions. Each carries the version it was read at; the
    /// store checks that version against the current row and bumps it.
    pub positions: Vec<InventoryPosition>,
    /// Entries to append (append-only; never updated or deleted).
    pub entries: Vec<LedgerEntry>,
}

impl LedgerCommit {
    pub fn from_plan(tenant_id: TenantId, plan: MovementPlan) -> Self {
        Self {
            tenant_id,
            positions: plan.positions,
            entries: plan.entries,
        }
    }

    pub fn entries_only(tenant_id: TenantId, entries: Vec<LedgerEntry>) -> Self {
        Self {
            tenant_id,
            positions: vec![],
            entries,
        }
    }
}

/// Storage operation error.
///
/// These are **infrastructure errors** (storage, concurrency, isolation) as
/// opposed to domain errors (validation, insufficient stock).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed; the caller may retry.
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    /// Cross-tenant rows detected in a single commit (security violation).
    #[error("tenant isolation violation: {0}")]
    TenantIsolation(String),

    /// Invalid commit contents or row state.
    #[error("invalid commit: {0}")]
    InvalidCommit(String),

    /// Underlying persistence failure, not self-diagnosable here.
    #[error("storage failure: {0}")]
    Storage(String),
}

/// Tenant-scoped ledger store.
///
/// Implementations must:
/// - enforce tenant isolation on every read and write
/// - treat `commit` as one indivisible unit: check every written position's
///   version against the stored row (0 = row must not exist yet), apply all
///   writes and append all entries, or change nothing
/// - never mutate or delete previously appended entries
///
/// Concurrent commits against the same position either fully precede or
/// fully follow each other; the version check rejects the loser.
pub trait LedgerStore: Send + Sync {
    /// Load the position for one (tenant, product, batch) key.
    fn position(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
    ) -> Result<Option<InventoryPosition>, StoreError>;

    /// All positions for a tenant (reporting read).
    fn positions(&self, tenant_id: TenantId) -> Result<Vec<InventoryPosition>, StoreError>;

    /// Commit position writes and entry appends atomically.
    ///
    /// Returns the committed positions with their newly assigned versions,
    /// in the order they were given.
    fn commit(&self, commit: LedgerCommit) -> Result<Vec<InventoryPosition>, StoreError>;

    /// Audit trail for a product, `recorded_at` descending (most recent
    /// first — no alternate ordering is exposed).
    fn entries_by_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        pagination: Pagination,
    ) -> Result<EntryPage, StoreError>;

    /// Audit trail for a batch, `recorded_at` descending.
    fn entries_by_batch(
        &self,
        tenant_id: TenantId,
        batch_id: BatchId,
        pagination: Pagination,
    ) -> Result<EntryPage, StoreError>;

    /// All entries recorded at or after `cutoff` (reporting read).
    fn entries_since(
        &self,
        tenant_id: TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, StoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn position(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
    ) -> Result<Option<InventoryPosition>, StoreError> {
        (**self).position(tenant_id, product_id, batch_id)
    }

    fn positions(&self, tenant_id: TenantId) -> Result<Vec<InventoryPosition>, StoreError> {
        (**self).positions(tenant_id)
    }

    fn commit(&self, commit: LedgerCommit) -> Result<Vec<InventoryPosition>, StoreError> {
        (**self).commit(commit)
    }

    fn entries_by_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        pagination: Pagination,
    ) -> Result<EntryPage, StoreError> {
        (**self).entries_by_product(tenant_id, product_id, pagination)
    }

    fn entries_by_batch(
        &self,
        tenant_id: TenantId,
        batch_id: BatchId,
        pagination: Pagination,
    ) -> Result<EntryPage, StoreError> {
        (**self).entries_by_batch(tenant_id, batch_id, pagination)
    }

    fn entries_since(
        &self,
        tenant_id: TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).entries_since(tenant_id, cutoff)
    }
}
