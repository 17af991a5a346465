//! Reporting views (read-only, ledger-derived).
//!
//! Pure derived queries over the ledger and batch stores. Reports never
//! mutate and take no locks beyond the store's normal read consistency, so
//! they may observe slightly stale aggregates under concurrent writes —
//! they are advisory, not authoritative.

pub mod expiring;
pub mod low_stock;
pub mod summary;
pub mod top_moving;
pub mod valuation;

pub use expiring::{expiring_batches, ExpiringBatchRow};
pub use low_stock::{low_stock_report, LowStockRow};
pub use summary::{inventory_summary, InventorySummary};
pub use top_moving::{top_moving_products, ProductMovement};
pub use valuation::{inventory_valuation, InventoryValuationReport, PositionValuation};
