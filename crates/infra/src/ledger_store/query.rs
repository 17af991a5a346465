//! Paginated audit-trail reads.

use serde::{Deserialize, Serialize};

use stockbook_ledger::LedgerEntry;

/// Pagination parameters for audit-trail queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of entries to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50, // Safe default
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000), // Cap at 1000 for safety
            offset: offset.unwrap_or(0),
        }
    }
}

/// One page of audit entries, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPage {
    pub entries: Vec<LedgerEntry>,
    /// Total number of entries matching the query (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}
