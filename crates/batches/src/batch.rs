use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockbook_core::{BatchId, DomainError, ProductId, TenantId};

/// One physical lot of a product, with its own acquisition cost and expiry.
///
/// `unit_cost` may later be corrected via an update but is never inferred
/// from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Command: register a new batch (one physical intake).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDraft {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub batch_number: String,
    pub expiry_date: Option<NaiveDate>,
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

impl BatchDraft {
    /// Validate the draft into a batch with a fresh id.
    ///
    /// Duplicate batch numbers are deliberately not checked: the same lot
    /// label may recur across products and intakes, and each draft
    /// represents a distinct physical intake.
    pub fn validate(self) -> Result<Batch, DomainError> {
        if self.batch_number.trim().is_empty() {
            return Err(DomainError::validation("batch_number cannot be empty"));
        }
        if self.unit_cost < Decimal::ZERO {
            return Err(DomainError::validation("unit_cost must not be negative"));
        }

        Ok(Batch {
            id: BatchId::new(),
            tenant_id: self.tenant_id,
            product_id: self.product_id,
            batch_number: self.batch_number,
            expiry_date: self.expiry_date,
            unit_cost: self.unit_cost,
            created_at: self.created_at,
        })
    }
}

/// Command: partial batch update. Never touches position rows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BatchUpdate {
    pub batch_number: Option<String>,
    /// `Some(None)` clears the expiry date; `None` leaves it unchanged.
    pub expiry_date: Option<Option<NaiveDate>>,
    pub unit_cost: Option<Decimal>,
}

impl BatchUpdate {
    pub fn apply(self, mut batch: Batch) -> Result<Batch, DomainError> {
        if let Some(batch_number) = self.batch_number {
            if batch_number.trim().is_empty() {
                return Err(DomainError::validation("batch_number cannot be empty"));
            }
            batch.batch_number = batch_number;
        }
        if let Some(expiry_date) = self.expiry_date {
            batch.expiry_date = expiry_date;
        }
        if let Some(unit_cost) = self.unit_cost {
            if unit_cost < Decimal::ZERO {
                return Err(DomainError::validation("unit_cost must not be negative"));
            }
            batch.unit_cost = unit_cost;
        }
        Ok(batch)
    }
}
