//! Postgres-backed batch store.
//!
//! Batches live in a `batches` table keyed by `id`, tenant-scoped in every
//! query. No version column: updates are last-write-wins and rows are never
//! deleted (positions and audit entries must stay resolvable).

use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::instrument;

use stockbook_batches::Batch;
use stockbook_core::{BatchId, ProductId, TenantId};

use super::r#trait::BatchStore;
use crate::ledger_store::{Pagination, StoreError};

#[derive(Debug, Clone)]
pub struct PostgresBatchStore {
    pool: Arc<PgPool>,
}

impl PostgresBatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(skip(self, batch), fields(tenant_id = %batch.tenant_id.as_uuid(), batch_id = %batch.id.as_uuid()), err)]
    pub async fn insert_batch(&self, batch: Batch) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO batches
                (id, tenant_id, product_id, batch_number, expiry_date, unit_cost, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(batch.id.as_uuid())
        .bind(batch.tenant_id.as_uuid())
        .bind(batch.product_id.as_uuid())
        .bind(&batch.batch_number)
        .bind(batch.expiry_date)
        .bind(batch.unit_cost)
        .bind(batch.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_batch", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid(), batch_id = %batch_id.as_uuid()), err)]
    pub async fn load_batch(
        &self,
        tenant_id: TenantId,
        batch_id: BatchId,
    ) -> Result<Option<Batch>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, product_id, batch_number, expiry_date, unit_cost, created_at
            FROM batches
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(batch_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_batch", e))?;

        row.map(batch_from_row).transpose()
    }

    #[instrument(skip(self, batch), fields(tenant_id = %batch.tenant_id.as_uuid(), batch_id = %batch.id.as_uuid()), err)]
    pub async fn update_batch(&self, batch: Batch) -> Result<(), StoreError> {
        let affected = sqlx::query(
            r#"
            UPDATE batches
            SET batch_number = $1, expiry_date = $2, unit_cost = $3
            WHERE tenant_id = $4 AND id = $5
            "#,
        )
        .bind(&batch.batch_number)
        .bind(batch.expiry_date)
        .bind(batch.unit_cost)
        .bind(batch.tenant_id.as_uuid())
        .bind(batch.id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_batch", e))?
        .rows_affected();

        if affected == 0 {
            return Err(StoreError::Storage(
                "update matched no batch row".to_string(),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid()), err)]
    pub async fn list_batches(
        &self,
        tenant_id: TenantId,
        product_id: Option<ProductId>,
        pagination: Pagination,
    ) -> Result<Vec<Batch>, StoreError> {
        let product_param: Option<uuid::Uuid> = product_id.map(|p| *p.as_uuid());
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, product_id, batch_number, expiry_date, unit_cost, created_at
            FROM batches
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR product_id = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(product_param)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_batches", e))?;

        rows.into_iter().map(batch_from_row).collect()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid()), err)]
    pub async fn load_expiring_between(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Batch>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, product_id, batch_number, expiry_date, unit_cost, created_at
            FROM batches
            WHERE tenant_id = $1 AND expiry_date BETWEEN $2 AND $3
            ORDER BY expiry_date ASC, id ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(from)
        .bind(to)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_expiring_between", e))?;

        rows.into_iter().map(batch_from_row).collect()
    }

    #[instrument(skip(self, ids), fields(tenant_id = %tenant_id.as_uuid(), id_count = ids.len()), err)]
    pub async fn load_many(
        &self,
        tenant_id: TenantId,
        ids: &[BatchId],
    ) -> Result<Vec<Batch>, StoreError> {
        let id_params: Vec<uuid::Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, product_id, batch_number, expiry_date, unit_cost, created_at
            FROM batches
            WHERE tenant_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(&id_params)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_many", e))?;

        rows.into_iter().map(batch_from_row).collect()
    }
}

fn batch_from_row(row: sqlx::postgres::PgRow) -> Result<Batch, StoreError> {
    let read = |e: sqlx::Error| StoreError::Storage(format!("failed to read batch row: {e}"));
    Ok(Batch {
        id: BatchId::from_uuid(row.try_get("id").map_err(read)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(read)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(read)?),
        batch_number: row.try_get("batch_number").map_err(read)?,
        expiry_date: row.try_get("expiry_date").map_err(read)?,
        unit_cost: row.try_get("unit_cost").map_err(read)?,
        created_at: row.try_get("created_at").map_err(read)?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Concurrency(msg),
                Some("23514") => StoreError::InvalidCommit(msg),
                _ => StoreError::Storage(msg),
            }
        }
        other => StoreError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}

fn runtime_handle() -> Result<tokio::runtime::Handle, StoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Storage(
            "PostgresBatchStore requires an async runtime (tokio); \
             call from within a tokio runtime context"
                .to_string(),
        )
    })
}

impl BatchStore for PostgresBatchStore {
    fn insert(&self, batch: Batch) -> Result<(), StoreError> {
        runtime_handle()?.block_on(self.insert_batch(batch))
    }

    fn get(&self, tenant_id: TenantId, batch_id: BatchId) -> Result<Option<Batch>, StoreError> {
        runtime_handle()?.block_on(self.load_batch(tenant_id, batch_id))
    }

    fn update(&self, batch: Batch) -> Result<(), StoreError> {
        runtime_handle()?.block_on(self.update_batch(batch))
    }

    fn list(
        &self,
        tenant_id: TenantId,
        product_id: Option<ProductId>,
        pagination: Pagination,
    ) -> Result<Vec<Batch>, StoreError> {
        runtime_handle()?.block_on(self.list_batches(tenant_id, product_id, pagination))
    }

    fn expiring_between(
        &self,
        tenant_id: TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Batch>, StoreError> {
        runtime_handle()?.block_on(self.load_expiring_between(tenant_id, from, to))
    }

    fn get_many(&self, tenant_id: TenantId, ids: &[BatchId]) -> Result<Vec<Batch>, StoreError> {
        runtime_handle()?.block_on(self.load_many(tenant_id, ids))
    }
}
