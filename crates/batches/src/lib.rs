//! `stockbook-batches` — Batch Registry domain.
//!
//! Owns batch identity within a tenant: product, lot number, expiry date,
//! acquisition cost. A leaf component — no dependency on positions or the
//! audit trail.

pub mod batch;

pub use batch::{Batch, BatchDraft, BatchUpdate};
