//! Per-epoch fee ledger.
//!
//! Provides `EpochLedger`, the ordered set of `FeeRecord`s for the epoch
//! currently being accumulated. Position in the ledger is block order:
//! index 0 is the first block of the epoch.

use std::sync::Arc;

use epochfee_types::{Amount, FeeRecord, Result, SettlementError};

// =============================================================================
// Free Functions
// =============================================================================

/// Sum the pool and tip fees of a record sequence.
///
/// Returns `(pool_total, tip_total)`; fails with `Overflow` instead of
/// wrapping.
///
/// ```
/// # use epochfee_ledger::ledger::fee_totals;
/// # use epochfee_types::FeeRecord;
/// let records = [FeeRecord::new("a", 10, 1), FeeRecord::new("b", 5, 0)];
/// assert_eq!(fee_totals(&records).unwrap(), (15, 1));
/// ```
pub fn fee_totals(records: &[FeeRecord]) -> Result<(Amount, Amount)> {
    let mut pool: Amount = 0;
    let mut tip: Amount = 0;
    for r in records {
        pool = pool.checked_add(r.pool_fee).ok_or(SettlementError::Overflow)?;
        tip = tip.checked_add(r.tip_fee).ok_or(SettlementError::Overflow)?;
    }
    Ok((pool, tip))
}

// =============================================================================
// EpochLedger
// =============================================================================

/// Ordered fee records of one epoch, one per produced block.
///
/// Append-only apart from `truncate_after`, which is reserved for reorg
/// handling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpochLedger {
    records: Vec<FeeRecord>,
}

impl EpochLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    /// Append the record of the next block.
    pub fn append(&mut self, record: FeeRecord) {
        self.records.push(record);
    }

    /// Drop every record at a position greater than `index`.
    ///
    /// `-1` drops everything; `len - 1` is a no-op. Anything below `-1` or at
    /// or beyond the current length fails with `IndexOutOfRange` and leaves
    /// the ledger untouched.
    pub fn truncate_after(&mut self, index: i64) -> Result<()> {
        let len = self.records.len();
        if index < -1 || index >= len as i64 {
            return Err(SettlementError::IndexOutOfRange { index, len });
        }
        self.records.truncate((index + 1) as usize);
        Ok(())
    }

    /// Immutable copy of the current records.
    ///
    /// The snapshot shares nothing with the ledger, so later appends and
    /// truncations are never observed through it.
    pub fn snapshot(&self) -> Arc<[FeeRecord]> {
        Arc::from(self.records.as_slice())
    }

    /// Number of records (blocks) in the epoch so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FeeRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeeRecord> {
        self.records.iter()
    }

    /// `(pool_total, tip_total)` over the whole ledger.
    pub fn totals(&self) -> Result<(Amount, Amount)> {
        fee_totals(&self.records)
    }
}

impl From<Vec<FeeRecord>> for EpochLedger {
    fn from(records: Vec<FeeRecord>) -> Self {
        Self { records }
    }
}

impl FromIterator<FeeRecord> for EpochLedger {
    fn from_iter<I: IntoIterator<Item = FeeRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a EpochLedger {
    type Item = &'a FeeRecord;
    type IntoIter = std::slice::Iter<'a, FeeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================
