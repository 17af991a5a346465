use chrono::NaiveDate;
use std::sync::Arc;

use stockbook_batches::Batch;
use stockbook_core::{BatchId, ProductId, TenantId};

use crate::ledger_store::{Pagination, StoreError};

/// Tenant-scoped batch storage.
///
/// Batches are simple rows: no optimistic versioning (updates are
/// last-write-wins) and no deletion — positions and audit entries must stay
/// resolvable forever.
pub trait BatchStore: Send + Sync {
    fn insert(&self, batch: Batch) -> Result<(), StoreError>;

    /// `None` when absent **or** owned by a different tenant; callers cannot
    /// tell the two apart.
    fn get(&self, tenant_id: TenantId, batch_id: BatchId) -> Result<Option<Batch>, StoreError>;

    /// Overwrite an existing batch. The row is expected to exist (batches
    /// are never deleted); a missing row is a storage integrity failure.
    fn update(&self, batch: Batch) -> Result<(), StoreError>;

    /// Tenant's batches, newest first, optionally filtered by product.
    fn list(
        &self,
        tenant_id: TenantId,
        product_id: Option<ProductId>,
        pagination: Pagination,
    ) -> Result<Vec<Batch>, StoreError>;

    /// Batches with an expiry date in `[from, to]` inclusive, regardless of
    /// any position's quantity.
    fn expiring_between(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Batch>, StoreError>;

    /// Bulk lookup for reporting joins.
    fn get_many(&self, tenant_id: TenantId, ids: &[BatchId]) -> Result<Vec<Batch>, StoreError>;
}

impl<S> BatchStore for Arc<S>
where
    S: BatchStore + ?Sized,
{
    fn insert(&self, batch: Batch) -> Result<(), StoreError> {
        (**self).insert(batch)
    }

    fn get(&self, tenant_id: TenantId, batch_id: BatchId) -> Result<Option<Batch>, StoreError> {
        (**self).get(tenant_id, batch_id)
    }

    fn update(&self, batch: Batch) -> Result<(), StoreError> {
        (**self).update(batch)
    }

    fn list(
        &self,
        tenant_id: TenantId,
        product_id: Option<ProductId>,
        pagination: Pagination,
    ) -> Result<Vec<Batch>, StoreError> {
        (**self).list(tenant_id, product_id, pagination)
    }

    fn expiring_between(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Batch>, StoreError> {
        (**self).expiring_between(tenant_id, from, to)
    }

    fn get_many(&self, tenant_id: TenantId, ids: &[BatchId]) -> Result<Vec<Batch>, StoreError> {
        (**self).get_many(tenant_id, ids)
    }
}
