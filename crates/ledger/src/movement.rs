//! Movement planning: the ledger's state machine.
//!
//! Each command validates against the current position state and produces a
//! [`MovementPlan`] — the post-state position(s) plus the audit entries that
//! record the change. Planning is pure; a store commits the whole plan as
//! one atomic unit or not at all.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockbook_core::{BatchId, DomainError, ProductId, TenantId};

use crate::entry::{LedgerEntry, TransactionType};
use crate::position::InventoryPosition;

/// The atomic unit a movement commits: post-state positions plus the audit
/// entries recording the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementPlan {
    pub positions: Vec<InventoryPosition>,
    pub entries: Vec<LedgerEntry>,
}

/// Command: add stock to a batch position (physical intake).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddQuantity {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub amount: Decimal,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Command: remove stock from a batch position (issue/sale/spoilage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceQuantity {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub amount: Decimal,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Command: overwrite a position's quantity (manual stock take).
///
/// Deliberately writes no audit entry — this is the lower-ceremony path for
/// corrections, distinct from add/reduce which always self-log. Callers
/// wanting an audited correction additionally record an
/// [`RecordAdjustment`] with the delta they computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetQuantity {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub new_amount: Decimal,
}

/// Command: move stock between two batches of the same product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferQuantity {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub from_batch_id: BatchId,
    pub to_batch_id: BatchId,
    pub amount: Decimal,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Command: write a standalone `ADJUSTMENT` audit entry.
///
/// The companion to [`SetQuantity`]: the caller computes the delta of a
/// manual correction and records it here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordAdjustment {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub batch_id: BatchId,
    pub delta: Decimal,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Advisory availability check: on-hand quantity (missing position counts
/// as zero) covers `required`.
///
/// A race may occur between this check and a later reduce; the reduce is
/// the authoritative, atomic gate.
pub fn is_available(position: Option<&InventoryPosition>, required: Decimal) -> bool {
    match position {
        Some(p) => p.covers(required),
        None => required <= Decimal::ZERO,
    }
}

fn ensure_positive(amount: Decimal) -> Result<(), DomainError> {
    if amount <= Decimal::ZERO {
        return Err(DomainError::validation("amount must be positive"));
    }
    Ok(())
}

fn ensure_key(
    position: &InventoryPosition,
    tenant_id: TenantId,
    product_id: ProductId,
    batch_id: BatchId,
) -> Result<(), DomainError> {
    if position.tenant_id != tenant_id
        || position.product_id != product_id
        || position.batch_id != batch_id
    {
        return Err(DomainError::validation("position does not match command key"));
    }
    Ok(())
}

/// Resolve the current position, lazily opening a zero row when absent.
fn current_or_open(
    current: Option<InventoryPosition>,
    tenant_id: TenantId,
    product_id: ProductId,
    batch_id: BatchId,
) -> Result<InventoryPosition, DomainError> {
    match current {
        Some(p) => {
            ensure_key(&p, tenant_id, product_id, batch_id)?;
            Ok(p)
        }
        None => Ok(InventoryPosition::open(tenant_id, product_id, batch_id)),
    }
}

impl AddQuantity {
    pub fn plan(&self, current: Option<InventoryPosition>) -> Result<MovementPlan, DomainError> {
        ensure_positive(self.amount)?;

        let mut position =
            current_or_open(current, self.tenant_id, self.product_id, self.batch_id)?;
        position.quantity += self.amount;

        let entry = LedgerEntry::record(
            self.tenant_id,
            self.product_id,
            self.batch_id,
            TransactionType::In,
            self.amount,
            self.reference_id,
            self.notes.clone(),
            self.recorded_at,
        );

        Ok(MovementPlan {
            positions: vec![position],
            entries: vec![entry],
        })
    }
}

impl ReduceQuantity {
    pub fn plan(&self, current: Option<InventoryPosition>) -> Result<MovementPlan, DomainError> {
        ensure_positive(self.amount)?;

        let mut position =
            current_or_open(current, self.tenant_id, self.product_id, self.batch_id)?;
        if position.quantity < self.amount {
            return Err(DomainError::insufficient_stock(
                position.quantity,
                self.amount,
            ));
        }
        position.quantity -= self.amount;

        let entry = LedgerEntry::record(
            self.tenant_id,
            self.product_id,
            self.batch_id,
            TransactionType::Out,
            -self.amount,
            self.reference_id,
            self.notes.clone(),
            self.recorded_at,
        );

        Ok(MovementPlan {
            positions: vec![position],
            entries: vec![entry],
        })
    }
}

impl SetQuantity {
    pub fn plan(&self, current: Option<InventoryPosition>) -> Result<MovementPlan, DomainError> {
        if self.new_amount < Decimal::ZERO {
            return Err(DomainError::validation("quantity must not be negative"));
        }

        let mut position =
            current_or_open(current, self.tenant_id, self.product_id, self.batch_id)?;
        position.quantity = self.new_amount;

        Ok(MovementPlan {
            positions: vec![position],
            entries: vec![],
        })
    }
}

impl TransferQuantity {
    /// Plan both legs as one unit. If the reduce leg fails nothing is
    /// planned: the add leg never happens and no entries are produced.
    pub fn plan(
        &self,
        from: Option<InventoryPosition>,
        to: Option<InventoryPosition>,
    ) -> Result<MovementPlan, DomainError> {
        ensure_positive(self.amount)?;
        if self.from_batch_id == self.to_batch_id {
            return Err(DomainError::validation(
                "source and destination batch must differ",
            ));
        }

        let mut source =
            current_or_open(from, self.tenant_id, self.product_id, self.from_batch_id)?;
        if source.quantity < self.amount {
            return Err(DomainError::insufficient_stock(
                source.quantity,
                self.amount,
            ));
        }
        source.quantity -= self.amount;

        let mut dest = current_or_open(to, self.tenant_id, self.product_id, self.to_batch_id)?;
        dest.quantity += self.amount;

        let out_entry = LedgerEntry::record(
            self.tenant_id,
            self.product_id,
            self.from_batch_id,
            TransactionType::TransferOut,
            -self.amount,
            self.reference_id,
            Some(transfer_note("to", self.to_batch_id, self.notes.as_deref())),
            self.recorded_at,
        );
        let in_entry = LedgerEntry::record(
            self.tenant_id,
            self.product_id,
            self.to_batch_id,
            TransactionType::TransferIn,
            self.amount,
            self.reference_id,
            Some(transfer_note(
                "from",
                self.from_batch_id,
                self.notes.as_deref(),
            )),
            self.recorded_at,
        );

        Ok(MovementPlan {
            positions: vec![source, dest],
            entries: vec![out_entry, in_entry],
        })
    }
}

/// Each transfer entry names its counterpart batch so either end of the
/// trail is readable on its own.
fn transfer_note(direction: &str, counterpart: BatchId, notes: Option<&str>) -> String {
    match notes {
        Some(n) => format!("transfer {direction} batch {counterpart}: {n}"),
        None => format!("transfer {direction} batch {counterpart}"),
    }
}

impl RecordAdjustment {
    pub fn entry(&self) -> Result<LedgerEntry, DomainError> {
        if self.delta == Decimal::ZERO {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        Ok(LedgerEntry::record(
            self.tenant_id,
            self.product_id,
            self.batch_id,
            TransactionType::Adjustment,
            self.delta,
            self.reference_id,
            self.notes.clone(),
            self.recorded_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn add(
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
        amount: Decimal,
    ) -> AddQuantity {
        AddQuantity {
            tenant_id,
            product_id,
            batch_id,
            amount,
            reference_id: None,
            notes: None,
            recorded_at: test_time(),
        }
    }

    fn reduce(
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
        amount: Decimal,
    ) -> ReduceQuantity {
        ReduceQuantity {
            tenant_id,
            product_id,
            batch_id,
            amount,
            reference_id: None,
            notes: None,
            recorded_at: test_time(),
        }
    }

    #[test]
    fn add_then_reduce_tracks_quantity_and_entries() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        let batch_id = BatchId::new();

        let added = add(tenant_id, product_id, batch_id, dec(100))
            .plan(None)
            .unwrap();
        assert_eq!(added.positions[0].quantity, dec(100));
        assert_eq!(added.entries.len(), 1);
        assert_eq!(added.entries[0].transaction_type, TransactionType::In);
        assert_eq!(added.entries[0].quantity_delta, dec(100));

        let reduced = reduce(tenant_id, product_id, batch_id, dec(30))
            .plan(Some(added.positions[0].clone()))
            .unwrap();
        assert_eq!(reduced.positions[0].quantity, dec(70));
        assert_eq!(reduced.entries[0].transaction_type, TransactionType::Out);
        assert_eq!(reduced.entries[0].quantity_delta, dec(-30));
    }

    #[test]
    fn add_preserves_position_identity() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        let batch_id = BatchId::new();

        let first = add(tenant_id, product_id, batch_id, dec(5))
            .plan(None)
            .unwrap();
        let second = add(tenant_id, product_id, batch_id, dec(7))
            .plan(Some(first.positions[0].clone()))
            .unwrap();

        assert_eq!(second.positions[0].id, first.positions[0].id);
        assert_eq!(second.positions[0].quantity, dec(12));
    }

    #[test]
    fn reduce_beyond_on_hand_is_rejected() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        let batch_id = BatchId::new();

        let added = add(tenant_id, product_id, batch_id, dec(10))
            .plan(None)
            .unwrap();
        let err = reduce(tenant_id, product_id, batch_id, dec(50))
            .plan(Some(added.positions[0].clone()))
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: dec(10),
                requested: dec(50),
            }
        );
    }

    #[test]
    fn reduce_on_missing_position_counts_as_zero() {
        let err = reduce(TenantId::new(), ProductId::new(), BatchId::new(), dec(1))
            .plan(None)
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: Decimal::ZERO,
                requested: dec(1),
            }
        );
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        let batch_id = BatchId::new();

        for amount in [Decimal::ZERO, dec(-3)] {
            let err = add(tenant_id, product_id, batch_id, amount)
                .plan(None)
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));

            let err = reduce(tenant_id, product_id, batch_id, amount)
                .plan(None)
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    #[test]
    fn set_quantity_overwrites_without_entry() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        let batch_id = BatchId::new();

        let added = add(tenant_id, product_id, batch_id, dec(40))
            .plan(None)
            .unwrap();
        let set = SetQuantity {
            tenant_id,
            product_id,
            batch_id,
            new_amount: dec(25),
        }
        .plan(Some(added.positions[0].clone()))
        .unwrap();

        assert_eq!(set.positions[0].quantity, dec(25));
        assert!(set.entries.is_empty());
    }

    #[test]
    fn set_quantity_rejects_negative_target() {
        let err = SetQuantity {
            tenant_id: TenantId::new(),
            product_id: ProductId::new(),
            batch_id: BatchId::new(),
            new_amount: dec(-1),
        }
        .plan(None)
        .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn transfer_moves_quantity_and_writes_entry_pair() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        let from_batch = BatchId::new();
        let to_batch = BatchId::new();

        let source = add(tenant_id, product_id, from_batch, dec(20))
            .plan(None)
            .unwrap();

        let transfer = TransferQuantity {
            tenant_id,
            product_id,
            from_batch_id: from_batch,
            to_batch_id: to_batch,
            amount: dec(20),
            reference_id: Some(Uuid::now_v7()),
            notes: Some("relabel".to_string()),
            recorded_at: test_time(),
        }
        .plan(Some(source.positions[0].clone()), None)
        .unwrap();

        assert_eq!(transfer.positions[0].quantity, Decimal::ZERO);
        assert_eq!(transfer.positions[1].quantity, dec(20));

        let [out_entry, in_entry] = transfer.entries.as_slice() else {
            panic!("expected two entries");
        };
        assert_eq!(out_entry.transaction_type, TransactionType::TransferOut);
        assert_eq!(out_entry.quantity_delta, dec(-20));
        assert_eq!(out_entry.batch_id, from_batch);
        assert_eq!(in_entry.transaction_type, TransactionType::TransferIn);
        assert_eq!(in_entry.quantity_delta, dec(20));
        assert_eq!(in_entry.batch_id, to_batch);
        assert_eq!(out_entry.reference_id, in_entry.reference_id);
        assert!(out_entry.notes.as_deref().unwrap().contains("relabel"));
    }

    #[test]
    fn transfer_to_same_batch_is_rejected() {
        let batch_id = BatchId::new();
        let err = TransferQuantity {
            tenant_id: TenantId::new(),
            product_id: ProductId::new(),
            from_batch_id: batch_id,
            to_batch_id: batch_id,
            amount: dec(5),
            reference_id: None,
            notes: None,
            recorded_at: test_time(),
        }
        .plan(None, None)
        .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn failed_transfer_plans_nothing() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        let from_batch = BatchId::new();
        let to_batch = BatchId::new();

        let source = add(tenant_id, product_id, from_batch, dec(10))
            .plan(None)
            .unwrap();
        let err = TransferQuantity {
            tenant_id,
            product_id,
            from_batch_id: from_batch,
            to_batch_id: to_batch,
            amount: dec(25),
            reference_id: None,
            notes: None,
            recorded_at: test_time(),
        }
        .plan(Some(source.positions[0].clone()), None)
        .unwrap_err();

        assert!(matches!(err, DomainError::InsufficientStock { .. }));
    }

    #[test]
    fn adjustment_requires_nonzero_delta() {
        let cmd = RecordAdjustment {
            tenant_id: TenantId::new(),
            product_id: ProductId::new(),
            batch_id: BatchId::new(),
            delta: Decimal::ZERO,
            reference_id: None,
            notes: None,
            recorded_at: test_time(),
        };
        assert!(matches!(
            cmd.entry().unwrap_err(),
            DomainError::Validation(_)
        ));

        let entry = RecordAdjustment {
            delta: dec(-4),
            ..cmd
        }
        .entry()
        .unwrap();
        assert_eq!(entry.transaction_type, TransactionType::Adjustment);
        assert_eq!(entry.quantity_delta, dec(-4));
    }

    #[test]
    fn availability_treats_missing_as_zero() {
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        let batch_id = BatchId::new();

        assert!(!is_available(None, dec(1)));
        assert!(is_available(None, Decimal::ZERO));

        let added = add(tenant_id, product_id, batch_id, dec(3))
            .plan(None)
            .unwrap();
        assert!(is_available(Some(&added.positions[0]), dec(3)));
        assert!(!is_available(Some(&added.positions[0]), dec(4)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: successful transfers conserve the product's total
        /// quantity across both positions.
        #[test]
        fn transfers_conserve_total_quantity(
            opening in 1i64..10_000i64,
            amounts in prop::collection::vec((1i64..5_000i64, prop::bool::ANY), 1..20)
        ) {
            let tenant_id = TenantId::new();
            let product_id = ProductId::new();
            let batch_a = BatchId::new();
            let batch_b = BatchId::new();

            let mut pos_a = add(tenant_id, product_id, batch_a, Decimal::new(opening, 2))
                .plan(None)
                .unwrap()
                .positions
                .remove(0);
            let mut pos_b: Option<InventoryPosition> = None;

            let total = pos_a.quantity;

            for (raw, a_to_b) in amounts {
                let amount = Decimal::new(raw, 2);
                let (from_batch, to_batch) = if a_to_b {
                    (batch_a, batch_b)
                } else {
                    (batch_b, batch_a)
                };
                let cmd = TransferQuantity {
                    tenant_id,
                    product_id,
                    from_batch_id: from_batch,
                    to_batch_id: to_batch,
                    amount,
                    reference_id: None,
                    notes: None,
                    recorded_at: test_time(),
                };
                let (from, to) = if a_to_b {
                    (Some(pos_a.clone()), pos_b.clone())
                } else {
                    (pos_b.clone(), Some(pos_a.clone()))
                };

                if let Ok(plan) = cmd.plan(from, to) {
                    for p in plan.positions {
                        if p.batch_id == batch_a {
                            pos_a = p;
                        } else {
                            pos_b = Some(p);
                        }
                    }
                }

                let sum = pos_a.quantity
                    + pos_b.as_ref().map(|p| p.quantity).unwrap_or(Decimal::ZERO);
                prop_assert_eq!(sum, total);
                prop_assert!(pos_a.quantity >= Decimal::ZERO);
                prop_assert!(pos_b.as_ref().map(|p| p.quantity).unwrap_or(Decimal::ZERO) >= Decimal::ZERO);
            }
        }

        /// Property: no sequence of adds and reduces drives a position
        /// negative, and the signed entry deltas sum to the final quantity.
        #[test]
        fn entries_reconcile_with_final_quantity(
            steps in prop::collection::vec((1i64..1_000i64, prop::bool::ANY), 1..30)
        ) {
            let tenant_id = TenantId::new();
            let product_id = ProductId::new();
            let batch_id = BatchId::new();

            let mut position: Option<InventoryPosition> = None;
            let mut deltas = Decimal::ZERO;

            for (raw, is_add) in steps {
                let amount = Decimal::new(raw, 2);
                let result = if is_add {
                    add(tenant_id, product_id, batch_id, amount).plan(position.clone())
                } else {
                    reduce(tenant_id, product_id, batch_id, amount).plan(position.clone())
                };

                if let Ok(mut plan) = result {
                    deltas += plan
                        .entries
                        .iter()
                        .map(|e| e.quantity_delta)
                        .sum::<Decimal>();
                    position = Some(plan.positions.remove(0));
                }

                let on_hand = position.as_ref().map(|p| p.quantity).unwrap_or(Decimal::ZERO);
                prop_assert!(on_hand >= Decimal::ZERO);
                prop_assert_eq!(on_hand, deltas);
            }
        }
    }
}
