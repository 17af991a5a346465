use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use stockbook_core::{BatchId, ExpectedVersion, ProductId, TenantId};
use stockbook_ledger::{InventoryPosition, LedgerEntry, PositionKey};

use super::query::{EntryPage, Pagination};
use super::r#trait::{LedgerCommit, LedgerStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    positions: HashMap<PositionKey, InventoryPosition>,
    entries: Vec<LedgerEntry>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. A single lock guards positions and the entry log
/// together, so every commit is one indivisible unit and commits against the
/// same position serialize against each other.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn validate_commit(commit: &LedgerCommit) -> Result<(), StoreError> {
    let mut keys = HashSet::new();
    for (idx, p) in commit.positions.iter().enumerate() {
        if p.tenant_id != commit.tenant_id {
            return Err(StoreError::TenantIsolation(format!(
                "commit contains foreign tenant position (index {idx})"
            )));
        }
        if !keys.insert(p.key()) {
            return Err(StoreError::InvalidCommit(format!(
                "duplicate position key in commit (index {idx})"
            )));
        }
    }
    for (idx, e) in commit.entries.iter().enumerate() {
        if e.tenant_id != commit.tenant_id {
            return Err(StoreError::TenantIsolation(format!(
                "commit contains foreign tenant entry (index {idx})"
            )));
        }
    }
    Ok(())
}

impl LedgerStore for InMemoryLedgerStore {
    fn position(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
    ) -> Result<Option<InventoryPosition>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        let key = PositionKey {
            tenant_id,
            product_id,
            batch_id,
        };
        Ok(inner.positions.get(&key).cloned())
    }

    fn positions(&self, tenant_id: TenantId) -> Result<Vec<InventoryPosition>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        let mut rows: Vec<_> = inner
            .positions
            .values()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        // Deterministic order for callers and tests.
        rows.sort_by_key(|p| (*p.product_id.as_uuid().as_bytes(), *p.batch_id.as_uuid().as_bytes()));
        Ok(rows)
    }

    fn commit(&self, commit: LedgerCommit) -> Result<Vec<InventoryPosition>, StoreError> {
        validate_commit(&commit)?;

        let mut inner = self
            .inner
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        // Check every version before applying anything (all or nothing).
        for p in &commit.positions {
            let current = inner.positions.get(&p.key()).map(|x| x.version).unwrap_or(0);
            ExpectedVersion::Exact(p.version)
                .check(current)
                .map_err(|e| StoreError::Concurrency(e.to_string()))?;
        }

        let mut committed = Vec::with_capacity(commit.positions.len());
        for p in commit.positions {
            let mut stored = p;
            stored.version += 1;
            inner.positions.insert(stored.key(), stored.clone());
            committed.push(stored);
        }
        inner.entries.extend(commit.entries);

        Ok(committed)
    }

    fn entries_by_product(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        pagination: Pagination,
    ) -> Result<EntryPage, StoreError> {
        self.page_entries(pagination, |e| {
            e.tenant_id == tenant_id && e.product_id == product_id
        })
    }

    fn entries_by_batch(
        &self,
        tenant_id: TenantId,
        batch_id: BatchId,
        pagination: Pagination,
    ) -> Result<EntryPage, StoreError> {
        self.page_entries(pagination, |e| {
            e.tenant_id == tenant_id && e.batch_id == batch_id
        })
    }

    fn entries_since(
        &self,
        tenant_id: TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.tenant_id == tenant_id && e.recorded_at >= cutoff)
            .cloned()
            .collect())
    }
}

impl InMemoryLedgerStore {
    fn page_entries(
        &self,
        pagination: Pagination,
        filter: impl Fn(&LedgerEntry) -> bool,
    ) -> Result<EntryPage, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        let mut matched: Vec<_> = inner.entries.iter().filter(|e| filter(e)).cloned().collect();
        // Most recent first; entry ids are time-ordered and break ties.
        matched.sort_by_key(|e| std::cmp::Reverse((e.recorded_at, *e.id.as_uuid().as_bytes())));

        let total = matched.len() as u64;
        let start = (pagination.offset as usize).min(matched.len());
        let end = (start + pagination.limit as usize).min(matched.len());
        let entries = matched[start..end].to_vec();
        let has_more = total > (pagination.offset + pagination.limit) as u64;

        Ok(EntryPage {
            entries,
            total,
            pagination,
            has_more,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use stockbook_ledger::AddQuantity;

    fn dec(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn add_plan(
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
        amount: i64,
        current: Option<InventoryPosition>,
    ) -> LedgerCommit {
        add_plan_at(tenant_id, product_id, batch_id, amount, current, Utc::now())
    }

    fn add_plan_at(
        tenant_id: TenantId,
        product_id: ProductId,
        batch_id: BatchId,
        amount: i64,
        current: Option<InventoryPosition>,
        recorded_at: DateTime<Utc>,
    ) -> LedgerCommit {
        let plan = AddQuantity {
            tenant_id,
            product_id,
            batch_id,
            amount: dec(amount),
            reference_id: None,
            notes: None,
            recorded_at,
        }
        .plan(current)
        .unwrap();
        LedgerCommit::from_plan(tenant_id, plan)
    }

    #[test]
    fn commit_assigns_versions() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        let batch_id = BatchId::new();

        let committed = store
            .commit(add_plan(tenant_id, product_id, batch_id, 10, None))
            .unwrap();
        assert_eq!(committed[0].version, 1);

        let current = store.position(tenant_id, product_id, batch_id).unwrap();
        let committed = store
            .commit(add_plan(tenant_id, product_id, batch_id, 5, current))
            .unwrap();
        assert_eq!(committed[0].version, 2);
        assert_eq!(committed[0].quantity, dec(15));
    }

    #[test]
    fn stale_version_is_rejected_without_side_effects() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        let batch_id = BatchId::new();

        store
            .commit(add_plan(tenant_id, product_id, batch_id, 10, None))
            .unwrap();

        // Replays the creation commit: expects version 0, store is at 1.
        let err = store
            .commit(add_plan(tenant_id, product_id, batch_id, 10, None))
            .unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));

        let position = store
            .position(tenant_id, product_id, batch_id)
            .unwrap()
            .unwrap();
        assert_eq!(position.quantity, dec(10));
        let page = store
            .entries_by_product(tenant_id, product_id, Pagination::default())
            .unwrap();
        assert_eq!(page.total, 1);
    }

    #[test]
    fn commits_are_tenant_checked() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let other_tenant = TenantId::new();
        let product_id = ProductId::new();
        let batch_id = BatchId::new();

        let mut commit = add_plan(other_tenant, product_id, batch_id, 10, None);
        commit.tenant_id = tenant_id;
        let err = store.commit(commit).unwrap_err();
        assert!(matches!(err, StoreError::TenantIsolation(_)));
    }

    #[test]
    fn reads_are_tenant_scoped() {
        let store = InMemoryLedgerStore::new();
        let tenant_a = TenantId::new();
        let tenant_b = TenantId::new();
        let product_id = ProductId::new();
        let batch_id = BatchId::new();

        store
            .commit(add_plan(tenant_a, product_id, batch_id, 10, None))
            .unwrap();

        assert!(store.position(tenant_b, product_id, batch_id).unwrap().is_none());
        assert!(store.positions(tenant_b).unwrap().is_empty());
        assert_eq!(
            store
                .entries_by_product(tenant_b, product_id, Pagination::default())
                .unwrap()
                .total,
            0
        );
    }

    #[test]
    fn entry_pages_are_newest_first() {
        let store = InMemoryLedgerStore::new();
        let tenant_id = TenantId::new();
        let product_id = ProductId::new();
        let batch_id = BatchId::new();

        // Distinct timestamps so the descending order is unambiguous.
        let base = Utc::now();
        let mut current = None;
        for amount in [1, 2, 3, 4, 5] {
            let at = base + chrono::Duration::seconds(amount);
            let committed = store
                .commit(add_plan_at(tenant_id, product_id, batch_id, amount, current, at))
                .unwrap();
            current = Some(committed[0].clone());
        }

        let page = store
            .entries_by_product(tenant_id, product_id, Pagination::new(Some(2), None))
            .unwrap();
        assert_eq!(page.total, 5);
        assert!(page.has_more);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].quantity_delta, dec(5));
        assert_eq!(page.entries[1].quantity_delta, dec(4));

        let last = store
            .entries_by_product(tenant_id, product_id, Pagination::new(Some(2), Some(4)))
            .unwrap();
        assert_eq!(last.entries.len(), 1);
        assert!(!last.has_more);
        assert_eq!(last.entries[0].quantity_delta, dec(1));
    }
}
