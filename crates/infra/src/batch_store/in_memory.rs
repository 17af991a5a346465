use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;

use stockbook_batches::Batch;
use stockbook_core::{BatchId, ProductId, TenantId};

use super::r#trait::BatchStore;
use crate::ledger_store::{Pagination, StoreError};

/// In-memory tenant-keyed batch store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBatchStore {
    inner: RwLock<HashMap<(TenantId, BatchId), Batch>>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchStore for InMemoryBatchStore {
    fn insert(&self, batch: Batch) -> Result<(), StoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        map.insert((batch.tenant_id, batch.id), batch);
        Ok(())
    }

    fn get(&self, tenant_id: TenantId, batch_id: BatchId) -> Result<Option<Batch>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        Ok(map.get(&(tenant_id, batch_id)).cloned())
    }

    fn update(&self, batch: Batch) -> Result<(), StoreError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        match map.get_mut(&(batch.tenant_id, batch.id)) {
            Some(existing) => {
                *existing = batch;
                Ok(())
            }
            None => Err(StoreError::Storage(
                "update matched no batch row".to_string(),
            )),
        }
    }

    fn list(
        &self,
        tenant_id: TenantId,
        product_id: Option<ProductId>,
        pagination: Pagination,
    ) -> Result<Vec<Batch>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        let mut rows: Vec<_> = map
            .values()
            .filter(|b| b.tenant_id == tenant_id)
            .filter(|b| product_id.map(|p| b.product_id == p).unwrap_or(true))
            .cloned()
            .collect();
        // Newest first; ids are time-ordered and break created_at ties.
        rows.sort_by_key(|b| std::cmp::Reverse((b.created_at, *b.id.as_uuid().as_bytes())));

        let start = (pagination.offset as usize).min(rows.len());
        let end = (start + pagination.limit as usize).min(rows.len());
        Ok(rows[start..end].to_vec())
    }

    fn expiring_between(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Batch>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        let mut rows: Vec<_> = map
            .values()
            .filter(|b| b.tenant_id == tenant_id)
            .filter(|b| b.expiry_date.map(|d| d >= from && d <= to).unwrap_or(false))
            .cloned()
            .collect();
        rows.sort_by_key(|b| (b.expiry_date, *b.id.as_uuid().as_bytes()));
        Ok(rows)
    }

    fn get_many(&self, tenant_id: TenantId, ids: &[BatchId]) -> Result<Vec<Batch>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        Ok(ids
            .iter()
            .filter_map(|id| map.get(&(tenant_id, *id)).cloned())
            .collect())
    }
}
