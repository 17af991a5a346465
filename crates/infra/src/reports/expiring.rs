//! Expiring-batches report: forward-looking planning view.

use chrono::{Duration, NaiveDate, Utc};

use stockbook_core::{BatchId, ProductId, TenantId};

use crate::batch_store::BatchStore;
use crate::ledger_store::StoreError;

/// A batch whose expiry falls inside the window, soonest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiringBatchRow {
    pub batch_id: BatchId,
    pub product_id: ProductId,
    pub batch_number: String,
    pub expiry_date: NaiveDate,
    pub days_until_expiry: i64,
}

/// Batches expiring between today and `today + within_days` (inclusive),
/// regardless of current quantity — a zero-quantity batch is still reported,
/// since this is a planning view, not a stock alert.
pub fn expiring_batches<B>(
    batches: &B,
    tenant_id: TenantId,
    within_days: u32,
) -> Result<Vec<ExpiringBatchRow>, StoreError>
where
    B: BatchStore,
{
    let today = Utc::now().date_naive();
    let horizon = today + Duration::days(within_days as i64);

    let rows = batches.expiring_between(tenant_id, today, horizon)?;
    Ok(rows
        .into_iter()
        .filter_map(|b| {
            b.expiry_date.map(|expiry_date| ExpiringBatchRow {
                batch_id: b.id,
                product_id: b.product_id,
                batch_number: b.batch_number,
                expiry_date,
                days_until_expiry: (expiry_date - today).num_days(),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    use stockbook_batches::BatchDraft;
    use stockbook_core::ActorId;

    use crate::batch_service::BatchRegistry;
    use crate::batch_store::InMemoryBatchStore;

    fn seed_batch(
        registry: &BatchRegistry<Arc<InMemoryBatchStore>>,
        tenant_id: TenantId,
        number: &str,
        days_to_expiry: Option<i64>,
    ) -> BatchId {
        registry
            .create_batch(
                ActorId::new(),
                BatchDraft {
                    tenant_id,
                    product_id: ProductId::new(),
                    batch_number: number.to_string(),
                    expiry_date: days_to_expiry
                        .map(|d| (Utc::now() + Duration::days(d)).date_naive()),
                    unit_cost: Decimal::ONE,
                    created_at: Utc::now(),
                },
            )
            .unwrap()
            .id
    }

    #[test]
    fn window_includes_soon_and_excludes_late_and_undated() {
        let store = Arc::new(InMemoryBatchStore::new());
        let registry = BatchRegistry::new(store.clone());
        let tenant_id = TenantId::new();

        // No stock was ever added to these batches; they are still reported.
        let soon = seed_batch(&registry, tenant_id, "SOON", Some(10));
        seed_batch(&registry, tenant_id, "LATE", Some(45));
        seed_batch(&registry, tenant_id, "UNDATED", None);

        let rows = expiring_batches(&store, tenant_id, 30).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].batch_id, soon);
        assert_eq!(rows[0].days_until_expiry, 10);
    }

    #[test]
    fn rows_are_sorted_soonest_first() {
        let store = Arc::new(InMemoryBatchStore::new());
        let registry = BatchRegistry::new(store.clone());
        let tenant_id = TenantId::new();

        seed_batch(&registry, tenant_id, "B", Some(20));
        seed_batch(&registry, tenant_id, "A", Some(5));

        let rows = expiring_batches(&store, tenant_id, 30).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].batch_number, "A");
        assert_eq!(rows[1].batch_number, "B");
    }
}
