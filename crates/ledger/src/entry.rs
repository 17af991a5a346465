use chrono::{DateTime, Utc};
use core::str::FromStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockbook_core::{BatchId, DomainError, EntryId, ProductId, TenantId};

/// Kind of quantity change recorded in the audit trail.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    In,
    Out,
    TransferOut,
    TransferIn,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "IN",
            TransactionType::Out => "OUT",
            TransactionType::TransferOut => "TRANSFER_OUT",
            TransactionType::TransferIn => "TRANSFER_IN",
            TransactionType::Adjustment => "ADJUSTMENT",
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(TransactionType::In),
            "OUT" => Ok(TransactionType::Out),
            "TRANSFER_OUT" => Ok(TransactionType::TransferOut),
            "TRANSFER_IN" => Ok(TransactionType::TransferIn),
            "ADJUSTMENT" => Ok(TransactionType::Adjustment),
            other => Err(DomainError::validation(format!(
                "unknown transaction type: {other}"
            ))),
        }
    }
}

/// One immutable audit record of a quantity change.
///
/// Every committed position change has exactly one matching entry with the
/// same signed delta (two for a transfer, one at each end). Entries are the
/// system of record for "what happened"; they are never updated or deleted,
/// independent of the derivable current quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub transaction_type: TransactionType,
    pub quantity_delta: Decimal,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Build a new entry with a fresh time-ordered id.
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
        transaction_type: TransactionType,
        quantity_delta: Decimal,
        reference_id: Option<Uuid>,
        notes: Option<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            tenant_id,
            product_id,
            batch_id,
            transaction_type,
            quantity_delta,
            reference_id,
            notes,
            recorded_at,
        }
    }
}
