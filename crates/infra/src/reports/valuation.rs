//! Inventory valuation: Σ(position.quantity × batch.unit_cost).

use std::collections::HashMap;

use rust_decimal::Decimal;

use stockbook_core::{BatchId, ProductId, TenantId};

use crate::batch_store::BatchStore;
use crate::ledger_store::{LedgerStore, StoreError};

/// Valuation of one position: quantity × the batch's unit cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionValuation {
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub value: Decimal,
}

/// Per-position breakdown plus the tenant total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryValuationReport {
    pub rows: Vec<PositionValuation>,
    pub total_value: Decimal,
}

/// Value every position at its batch's unit cost, in the same decimal
/// arithmetic the ledger mutates with, so the total never drifts from the
/// sum of historical entries. Zero-quantity rows stay in the breakdown —
/// they exist for audit continuity and contribute zero.
pub fn inventory_valuation<L, B>(
    ledger: &L,
    batches: &B,
    tenant_id: TenantId,
) -> Result<InventoryValuationReport, StoreError>
where
    L: LedgerStore,
    B: BatchStore,
{
    let positions = ledger.positions(tenant_id)?;

    let batch_ids: Vec<BatchId> = positions.iter().map(|p| p.batch_id).collect();
    let batch_rows = batches.get_many(tenant_id, &batch_ids)?;
    let by_id: HashMap<BatchId, _> = batch_rows.into_iter().map(|b| (b.id, b)).collect();

    let rows: Vec<_> = positions
        .into_iter()
        .map(|p| {
            let batch = by_id.get(&p.batch_id);
            let unit_cost = batch.map(|b| b.unit_cost).unwrap_or(Decimal::ZERO);
            PositionValuation {
                product_id: p.product_id,
                batch_id: p.batch_id,
                batch_number: batch.map(|b| b.batch_number.clone()).unwrap_or_default(),
                quantity: p.quantity,
                unit_cost,
                value: p.quantity * unit_cost,
            }
        })
        .collect();
    let total_value = rows.iter().map(|r| r.value).sum();

    Ok(InventoryValuationReport { rows, total_value })
}
