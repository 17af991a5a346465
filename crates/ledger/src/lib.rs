//! `stockbook-ledger` — Inventory Ledger and Audit Trail domain.
//!
//! Pure domain logic for the transactional heart of the system: positions
//! (current on-hand quantity per tenant/product/batch), immutable audit
//! entries, and the movement planning functions that enforce the ledger
//! invariants (non-negative quantity, conservation across transfers, one
//! audit entry per committed change). No IO here; stores commit the plans.

pub mod entry;
pub mod movement;
pub mod position;

pub use entry::{LedgerEntry, TransactionType};
pub use movement::{
    is_available, AddQuantity, MovementPlan, RecordAdjustment, ReduceQuantity, SetQuantity,
    TransferQuantity,
};
pub use position::{InventoryPosition, PositionKey};
