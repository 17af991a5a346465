//! Postgres-backed ledger store.
//!
//! Positions live in `inventory_positions` (one row per tenant/product/batch,
//! `UNIQUE (tenant_id, product_id, batch_id)`, a `version` column for
//! optimistic concurrency and a `quantity >= 0` check constraint). Entries
//! live in `ledger_entries`, append-only.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Concurrency` | Concurrent insert of the same position |
//! | Database (check constraint) | `23514` | `InvalidCommit` | Negative quantity reached the database |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | PoolClosed / network / other | N/A | `Storage` | Connection failures etc. |
//!
//! ## Concurrency
//!
//! `commit` runs in one SQL transaction. Updates are guarded by
//! `AND version = $expected` with a rows-affected check, inserts by the
//! unique key, so the database arbitrates between concurrent writers: the
//! loser sees `StoreError::Concurrency` and nothing from its commit lands.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::instrument;

use stockbook_core::{BatchId, EntryId, PositionId, ProductId, TenantId};
use stockbook_ledger::{InventoryPosition, LedgerEntry, TransactionType};

use super::query::{EntryPage, Pagination};
use super::r#trait::{LedgerCommit, LedgerStore, StoreError};

/// Postgres-backed ledger store.
///
/// Thread-safe via the SQLx connection pool. The synchronous [`LedgerStore`]
/// trait is bridged with the current tokio runtime handle, as the callers of
/// this store run inside one.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    #[instrument(
        skip(self),
        fields(
            tenant_id = %tenant_id.as_uuid(),
            product_id = %product_id.as_uuid(),
            batch_id = %batch_id.as_uuid()
        ),
        err
    )]
    pub async fn load_position(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
    ) -> Result<Option<InventoryPosition>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, product_id, batch_id, quantity, version
            FROM inventory_positions
            WHERE tenant_id = $1 AND product_id = $2 AND batch_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(batch_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_position", e))?;

        row.map(position_from_row).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid()), err)]
    pub async fn load_positions(
        &self,
        tenant_id: TenantId,
    ) -> Result<Vec<InventoryPosition>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, product_id, batch_id, quantity, version
            FROM inventory_positions
            WHERE tenant_id = $1
            ORDER BY product_id, batch_id
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_positions", e))?;

        rows.into_iter().map(position_from_row).collect()
    }

    /// Apply a commit in one SQL transaction: version-checked position
    /// writes first, then entry appends; rollback on any failure.
    #[instrument(
        skip(self, commit),
        fields(
            tenant_id = %commit.tenant_id.as_uuid(),
            position_count = commit.positions.len(),
            entry_count = commit.entries.len()
        ),
        err
    )]
    pub async fn apply_commit(
        &self,
        commit: LedgerCommit,
    ) -> Result<Vec<InventoryPosition>, StoreError> {
        for (idx, p) in commit.positions.iter().enumerate() {
            if p.tenant_id != commit.tenant_id {
                return Err(StoreError::TenantIsolation(format!(
                    "commit contains foreign tenant position (index {idx})"
                )));
            }
        }
        for (idx, e) in commit.entries.iter().enumerate() {
            if e.tenant_id != commit.tenant_id {
                return Err(StoreError::TenantIsolation(format!(
                    "commit contains foreign tenant entry (index {idx})"
                )));
            }
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut committed = Vec::with_capacity(commit.positions.len());
        for position in commit.positions {
            let affected = if position.version == 0 {
                sqlx::query(
                    r#"
                    INSERT INTO inventory_positions
                        (id, tenant_id, product_id, batch_id, quantity, version)
                    VALUES ($1, $2, $3, $4, $5, 1)
                    ON CONFLICT (tenant_id, product_id, batch_id) DO NOTHING
                    "#,
                )
                .bind(position.id.as_uuid())
                .bind(position.tenant_id.as_uuid())
                .bind(position.product_id.as_uuid())
                .bind(position.batch_id.as_uuid())
                .bind(position.quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_position", e))?
                .rows_affected()
            } else {
                sqlx::query(
                    r#"
                    UPDATE inventory_positions
                    SET quantity = $1, version = version + 1
                    WHERE tenant_id = $2 AND product_id = $3 AND batch_id = $4
                      AND version = $5
                    "#,
                )
                .bind(position.quantity)
                .bind(position.tenant_id.as_uuid())
                .bind(position.product_id.as_uuid())
                .bind(position.batch_id.as_uuid())
                .bind(position.version as i64)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("update_position", e))?
                .rows_affected()
            };

            if affected == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(StoreError::Concurrency(format!(
                    "position changed concurrently (expected version {})",
                    position.version
                )));
            }

            let mut stored = position;
            stored.version += 1;
            committed.push(stored);
        }

        for entry in commit.entries {
            sqlx::query(
                r#"
                INSERT INTO ledger_entries
                    (id, tenant_id, product_id, batch_id, transaction_type,
                     quantity_delta, reference_id, notes, recorded_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(entry.id.as_uuid())
            .bind(entry.tenant_id.as_uuid())
            .bind(entry.product_id.as_uuid())
            .bind(entry.batch_id.as_uuid())
            .bind(entry.transaction_type.as_str())
            .bind(entry.quantity_delta)
            .bind(entry.reference_id)
            .bind(&entry.notes)
            .bind(entry.recorded_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_entry", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(committed)
    }

    async fn page_entries(
        &self,
        operation: &str,
        tenant_id: TenantId,
        key_column: &str,
        key: uuid::Uuid,
        pagination: Pagination,
    ) -> Result<EntryPage, StoreError> {
        let count_row = sqlx::query(&format!(
            "SELECT COUNT(*) as total FROM ledger_entries WHERE tenant_id = $1 AND {key_column} = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(key)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| StoreError::Storage(format!("failed to read count: {e}")))?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT id, tenant_id, product_id, batch_id, transaction_type,
                   quantity_delta, reference_id, notes, recorded_at
            FROM ledger_entries
            WHERE tenant_id = $1 AND {key_column} = $2
            ORDER BY recorded_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(tenant_id.as_uuid())
        .bind(key)
        .bind(pagination.limit as i64)
        .bind(pagination.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error(operation, e))?;

        let entries = rows
            .into_iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        let has_more = total > (pagination.offset + pagination.limit) as i64;

        Ok(EntryPage {
            entries,
            total: total as u64,
            pagination,
            has_more,
        })
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid()), err)]
    pub async fn load_entries_since(
        &self,
        tenant_id: TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, product_id, batch_id, transaction_type,
                   quantity_delta, reference_id, notes, recorded_at
            FROM ledger_entries
            WHERE tenant_id = $1 AND recorded_at >= $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(cutoff)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_entries_since", e))?;

        rows.into_iter().map(entry_from_row).collect()
    }
}

fn position_from_row(row: sqlx::postgres::PgRow) -> Result<InventoryPosition, StoreError> {
    let read = |e: sqlx::Error| StoreError::Storage(format!("failed to read position row: {e}"));
    Ok(InventoryPosition {
        id: PositionId::from_uuid(row.try_get("id").map_err(read)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(read)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(read)?),
        batch_id: BatchId::from_uuid(row.try_get("batch_id").map_err(read)?),
        quantity: row.try_get("quantity").map_err(read)?,
        version: row.try_get::<i64, _>("version").map_err(read)? as u64,
    })
}

fn entry_from_row(row: sqlx::postgres::PgRow) -> Result<LedgerEntry, StoreError> {
    let read = |e: sqlx::Error| StoreError::Storage(format!("failed to read entry row: {e}"));
    let transaction_type: String = row.try_get("transaction_type").map_err(read)?;
    Ok(LedgerEntry {
        id: EntryId::from_uuid(row.try_get("id").map_err(read)?),
        tenant_id: TenantId::from_uuid(row.try_get("tenant_id").map_err(read)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(read)?),
        batch_id: BatchId::from_uuid(row.try_get("batch_id").map_err(read)?),
        transaction_type: transaction_type
            .parse::<TransactionType>()
            .map_err(|e| StoreError::Storage(e.to_string()))?,
        quantity_delta: row.try_get("quantity_delta").map_err(read)?,
        reference_id: row.try_get("reference_id").map_err(read)?,
        notes: row.try_get("notes").map_err(read)?,
        recorded_at: row.try_get("recorded_at").map_err(read)?,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation: another writer inserted the row first.
                Some("23505") => StoreError::Concurrency(msg),
                // Check constraint violation (e.g. negative quantity).
                Some("23514") => StoreError::InvalidCommit(msg),
                _ => StoreError::Storage(msg),
            }
        }
        other => StoreError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}

/// Bridge the synchronous trait to the async pool.
///
/// Requires a current tokio runtime; callers outside one get a
/// `StoreError::Storage` rather than a panic.
fn runtime_handle() -> Result<tokio::runtime::Handle, StoreError> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Storage(
            "PostgresLedgerStore requires an async runtime (tokio); \
             call from within a tokio runtime context"
                .to_string(),
        )
    })
}

impl LedgerStore for PostgresLedgerStore {
    fn position(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
    ) -> Result<Option<InventoryPosition>, StoreError> {
        runtime_handle()?.block_on(self.load_position(tenant_id, product_id, batch_id))
    }

    fn positions(&self, tenant_id: TenantId) -> Result<Vec<InventoryPosition>, StoreError> {
        runtime_handle()?.block_on(self.load_positions(tenant_id))
    }

    fn commit(&self, commit: LedgerCommit) -> Result<Vec<InventoryPosition>, StoreError> {
        runtime_handle()?.block_on(self.apply_commit(commit))
    }

    fn entries_by_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        pagination: Pagination,
    ) -> Result<EntryPage, StoreError> {
        runtime_handle()?.block_on(self.page_entries(
            "entries_by_product",
            tenant_id,
            "product_id",
            *product_id.as_uuid(),
            pagination,
        ))
    }

    fn entries_by_batch(
        &self,
        tenant_id: TenantId,
        batch_id: BatchId,
        pagination: Pagination,
    ) -> Result<EntryPage, StoreError> {
        runtime_handle()?.block_on(self.page_entries(
            "entries_by_batch",
            tenant_id,
            "batch_id",
            *batch_id.as_uuid(),
            pagination,
        ))
    }

    fn entries_since(
        &self,
        tenant_id: TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        runtime_handle()?.block_on(self.load_entries_since(tenant_id, cutoff))
    }
}
