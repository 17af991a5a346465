//! Low-stock report: positions at or below a caller-supplied threshold.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use stockbook_core::{BatchId, ProductId, TenantId};

use crate::batch_store::BatchStore;
use crate::ledger_store::{LedgerStore, StoreError};

/// One flagged position, joined with its batch for display fields.
///
/// Carries `product_id` only — product naming belongs to the catalog
/// collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LowStockRow {
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub quantity: Decimal,
}

/// All positions with `quantity <= threshold`, most depleted first.
///
/// Zero rows qualify: a position that ran dry is exactly what this report
/// is for.
pub fn low_stock_report<L, B>(
    ledger: &L,
    batches: &B,
    tenant_id: TenantId,
    threshold: Decimal,
) -> Result<Vec<LowStockRow>, StoreError>
where
    L: LedgerStore,
    B: BatchStore,
{
    let flagged: Vec<_> = ledger
        .positions(tenant_id)?
        .into_iter()
        .filter(|p| p.quantity <= threshold)
        .collect();

    let batch_ids: Vec<BatchId> = flagged.iter().map(|p| p.batch_id).collect();
    let batch_rows = batches.get_many(tenant_id, &batch_ids)?;
    let by_id: HashMap<BatchId, _> = batch_rows.into_iter().map(|b| (b.id, b)).collect();

    let mut rows: Vec<_> = flagged
        .into_iter()
        .map(|p| {
            let batch = by_id.get(&p.batch_id);
            LowStockRow {
                product_id: p.product_id,
                batch_id: p.batch_id,
                batch_number: batch.map(|b| b.batch_number.clone()).unwrap_or_default(),
                expiry_date: batch.and_then(|b| b.expiry_date),
                quantity: p.quantity,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        a.quantity
            .cmp(&b.quantity)
            .then_with(|| a.product_id.as_uuid().as_bytes().cmp(b.product_id.as_uuid().as_bytes()))
            .then_with(|| a.batch_id.as_uuid().as_bytes().cmp(b.batch_id.as_uuid().as_bytes()))
    });

    Ok(rows)
}
