//! Top-moving products: ranked by absolute audit-trail movement.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use stockbook_core::{ProductId, TenantId};

use crate::ledger_store::{LedgerStore, StoreError};

/// Movement total for one product over the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductMovement {
    pub product_id: ProductId,
    /// Σ|quantity_delta| over the product's entries in the window.
    pub total_movement: Decimal,
}

/// Rank products by `Σ|quantity_delta|` over entries recorded in the last
/// `window_days`, descending. Ties break by product identifier ascending so
/// the ranking is deterministic.
pub fn top_moving_products<L>(
    ledger: &L,
    tenant_id: TenantId,
    window_days: u32,
    limit: usize,
) -> Result<Vec<ProductMovement>, StoreError>
where
    L: LedgerStore,
{
    let cutoff = Utc::now() - Duration::days(window_days as i64);
    let entries = ledger.entries_since(tenant_id, cutoff)?;

    let mut totals: HashMap<ProductId, Decimal> = HashMap::new();
    for entry in entries {
        *totals.entry(entry.product_id).or_default() += entry.quantity_delta.abs();
    }

    let mut rows: Vec<_> = totals
        .into_iter()
        .map(|(product_id, total_movement)| ProductMovement {
            product_id,
            total_movement,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_movement
            .cmp(&a.total_movement)
            .then_with(|| a.product_id.as_uuid().as_bytes().cmp(b.product_id.as_uuid().as_bytes()))
    });
    rows.truncate(limit);

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use stockbook_core::{ActorId, BatchId};
    use stockbook_ledger::{AddQuantity, ReduceQuantity};

    use crate::ledger_service::InventoryLedger;
    use crate::ledger_store::InMemoryLedgerStore;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn seed_movement(
        ledger: &InventoryLedger<Arc<InMemoryLedgerStore>>,
        tenant_id: TenantId,
        product_id: ProductId,
        added: i64,
        reduced: i64,
    ) {
        let actor_id = ActorId::new();
        let batch_id = BatchId::new();
        ledger
            .add_quantity(
                actor_id,
                AddQuantity {
                    tenant_id,
                    product_id,
                    batch_id,
                    amount: dec(added),
                    reference_id: None,
                    notes: None,
                    recorded_at: Utc::now(),
                },
            )
            .unwrap();
        if reduced > 0 {
            ledger
                .reduce_quantity(
                    actor_id,
                    ReduceQuantity {
                        tenant_id,
                        product_id,
                        batch_id,
                        amount: dec(reduced),
                        reference_id: None,
                        notes: None,
                        recorded_at: Utc::now(),
                    },
                )
                .unwrap();
        }
    }

    #[test]
    fn ranks_by_absolute_movement_descending() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = InventoryLedger::new(store.clone());
        let tenant_id = TenantId::new();
        let product_a = ProductId::new();
        let product_b = ProductId::new();

        // |+100| + |-30| = 130 vs |+50| = 50: reductions count as movement.
        seed_movement(&ledger, tenant_id, product_a, 100, 30);
        seed_movement(&ledger, tenant_id, product_b, 50, 0);

        let rows = top_moving_products(&store, tenant_id, 30, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product_id, product_a);
        assert_eq!(rows[0].total_movement, dec(130));
        assert_eq!(rows[1].product_id, product_b);
        assert_eq!(rows[1].total_movement, dec(50));
    }

    #[test]
    fn ties_break_by_product_id_ascending() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = InventoryLedger::new(store.clone());
        let tenant_id = TenantId::new();
        let product_a = ProductId::new();
        let product_b = ProductId::new();

        seed_movement(&ledger, tenant_id, product_a, 75, 0);
        seed_movement(&ledger, tenant_id, product_b, 75, 0);

        let rows = top_moving_products(&store, tenant_id, 30, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(
            rows[0].product_id.as_uuid().as_bytes() < rows[1].product_id.as_uuid().as_bytes()
        );
    }

    #[test]
    fn limit_truncates_the_ranking() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger = InventoryLedger::new(store.clone());
        let tenant_id = TenantId::new();

        for amount in [10, 20, 30] {
            seed_movement(&ledger, tenant_id, ProductId::new(), amount, 0);
        }

        let rows = top_moving_products(&store, tenant_id, 30, 2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].total_movement, dec(30));
        assert_eq!(rows[1].total_movement, dec(20));
    }
}
