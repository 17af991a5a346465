use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{BatchId, PositionId, ProductId, TenantId};

/// Key of a position row: the (tenant, product, batch) triple.
///
/// Exactly zero or one position exists per key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub batch_id: BatchId,
}

/// The mutable ledger row: current on-hand quantity for one position key.
///
/// Created lazily on the first stock addition and never deleted — a position
/// that reaches zero remains as a zero row for audit continuity. `quantity`
/// is an exact decimal; it is never negative at a committed state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPosition {
    pub id: PositionId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub quantity: Decimal,
    /// Optimistic concurrency token: the stored version this state was read
    /// at (0 for a not-yet-persisted row). Stores bump it on commit.
    pub version: u64,
}

impl InventoryPosition {
    /// Open a fresh zero-quantity position for lazy creation.
    pub fn open(tenant_id: TenantId, product_id: ProductId, batch_id: BatchId) -> Self {
        Self {
            id: PositionId::new(),
            tenant_id,
            product_id,
            batch_id,
            quantity: Decimal::ZERO,
            version: 0,
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey {
            tenant_id: self.tenant_id,
            product_id: self.product_id,
            batch_id: self.batch_id,
        }
    }

    /// Whether the on-hand quantity covers `required`.
    pub fn covers(&self, required: Decimal) -> bool {
        self.quantity >= required
    }
}
