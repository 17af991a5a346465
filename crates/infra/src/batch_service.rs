//! Batch Registry service: tenant-scoped batch lifecycle.

use tracing::instrument;

use stockbook_batches::{Batch, BatchDraft, BatchUpdate};
use stockbook_core::{ActorId, BatchId, ProductId, TenantId};

use crate::ledger_service::ServiceError;
use crate::ledger_store::Pagination;
use crate::batch_store::BatchStore;

/// Owner of batch identity within a tenant.
///
/// Never touches positions: correcting a batch's cost or expiry has no
/// effect on on-hand quantities.
#[derive(Debug)]
pub struct BatchRegistry<S> {
    store: S,
}

impl<S> BatchRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S> BatchRegistry<S>
where
    S: BatchStore,
{
    /// Register one physical intake. Duplicate batch numbers are permitted —
    /// they represent distinct intakes.
    #[instrument(skip(self, draft), fields(tenant_id = %draft.tenant_id, actor_id = %actor_id), err)]
    pub fn create_batch(&self, actor_id: ActorId, draft: BatchDraft) -> Result<Batch, ServiceError> {
        let batch = draft.validate()?;
        self.store.insert(batch.clone())?;
        Ok(batch)
    }

    /// Fails with `NotFound` when the batch is absent or belongs to another
    /// tenant; the two cases are indistinguishable.
    pub fn get_batch(&self, tenant_id: TenantId, batch_id: BatchId) -> Result<Batch, ServiceError> {
        self.store
            .get(tenant_id, batch_id)?
            .ok_or(ServiceError::NotFound)
    }

    /// Apply a partial update.
    #[instrument(skip(self, update), fields(tenant_id = %tenant_id, actor_id = %actor_id), err)]
    pub fn update_batch(
        &self,
        actor_id: ActorId,
        tenant_id: TenantId,
        batch_id: BatchId,
        update: BatchUpdate,
    ) -> Result<Batch, ServiceError> {
        let batch = self
            .store
            .get(tenant_id, batch_id)?
            .ok_or(ServiceError::NotFound)?;
        let updated = update.apply(batch)?;
        self.store.update(updated.clone())?;
        Ok(updated)
    }

    /// Tenant's batches, newest first, optionally filtered by product.
    pub fn list_batches(
        &self,
        tenant_id: TenantId,
        product_id: Option<ProductId>,
        pagination: Pagination,
    ) -> Result<Vec<Batch>, ServiceError> {
        Ok(self.store.list(tenant_id, product_id, pagination)?)
    }
}
