//! Dashboard summary: one aggregate over the other views.

use rust_decimal::Decimal;

use stockbook_core::TenantId;

use crate::batch_store::BatchStore;
use crate::ledger_store::{LedgerStore, StoreError};

use super::expiring::expiring_batches;
use super::low_stock::low_stock_report;
use super::valuation::inventory_valuation;

const LOW_STOCK_THRESHOLD: Decimal = Decimal::TEN;
const EXPIRY_WINDOW_DAYS: u32 = 30;

/// Tenant-level snapshot for dashboards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventorySummary {
    pub position_count: usize,
    pub low_stock_count: usize,
    pub expiring_batch_count: usize,
    pub total_value: Decimal,
}

pub fn inventory_summary<L, B>(
    ledger: &L,
    batches: &B,
    tenant_id: TenantId,
) -> Result<InventorySummary, StoreError>
where
    L: LedgerStore,
    B: BatchStore,
{
    let valuation = inventory_valuation(ledger, batches, tenant_id)?;
    let low_stock = low_stock_report(ledger, batches, tenant_id, LOW_STOCK_THRESHOLD)?;
    let expiring = expiring_batches(batches, tenant_id, EXPIRY_WINDOW_DAYS)?;

    Ok(InventorySummary {
        position_count: valuation.rows.len(),
        low_stock_count: low_stock.len(),
        expiring_batch_count: expiring.len(),
        total_value: valuation.total_value,
    })
}
