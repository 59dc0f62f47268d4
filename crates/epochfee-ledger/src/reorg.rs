//! Reorganisation handling for the open epoch's ledger.
//!
//! When the fork-choice side switches canonical chains, the ledger suffix
//! past the last common block is discarded and the replacement chain's
//! records are replayed on top. Settlement is refused until the replay has
//! caught up, so a settled epoch is always identical to one built by
//! observing the final chain directly.

use epochfee_types::{FeeRecord, Result, SettlementError};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::ledger::EpochLedger;
use crate::settlement::{settle, SettlementResult};

// =============================================================================
// ReorgState
// =============================================================================

/// Whether the ledger currently matches the canonical chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReorgState {
    /// Ledger matches the canonical chain; settlement is allowed.
    #[default]
    Stable,
    /// A reorg truncated the ledger and replacement records are still being
    /// appended.
    Reconciling,
}

// =============================================================================
// ReorgEvent
// =============================================================================

/// Describes one truncation performed for a reorg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorgEvent {
    /// Ledger position of the last block shared by both chains (`-1` when
    /// no block of the epoch survives).
    pub last_common_index: i64,
    /// Ledger length before truncation.
    pub old_len: usize,
    /// Ledger length after truncation.
    pub new_len: usize,
    /// Number of records discarded.
    pub records_discarded: usize,
}

// =============================================================================
// ReorgCoordinator
// =============================================================================

/// Truncate-and-replay state machine guarding one epoch ledger.
#[derive(Debug, Clone, Default)]
pub struct ReorgCoordinator {
    state: ReorgState,
    /// Ledger length that must be reached again before returning to
    /// `Stable`. Only meaningful while reconciling.
    restore_len: usize,
    reorg_count: u64,
}

impl ReorgCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReorgState {
        self.state
    }

    pub fn is_reconciling(&self) -> bool {
        self.state == ReorgState::Reconciling
    }

    /// Length the ledger must regain to leave `Reconciling`.
    pub fn restore_len(&self) -> Option<usize> {
        self.is_reconciling().then_some(self.restore_len)
    }

    /// Number of reorgs that discarded at least one record.
    pub fn reorg_count(&self) -> u64 {
        self.reorg_count
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Apply a reorg notification: drop every record after
    /// `last_common_index` and enter `Reconciling`.
    ///
    /// A notification that discards nothing leaves the state unchanged. A
    /// second reorg while already reconciling keeps the larger restore
    /// target, so no block of an intermediate chain can survive. On
    /// `IndexOutOfRange` neither the ledger nor the state is modified.
    pub fn handle_reorg(
        &mut self,
        ledger: &mut EpochLedger,
        last_common_index: i64,
    ) -> Result<ReorgEvent> {
        let old_len = ledger.len();
        ledger.truncate_after(last_common_index)?;
        let new_len = ledger.len();
        let event = ReorgEvent {
            last_common_index,
            old_len,
            new_len,
            records_discarded: old_len - new_len,
        };

        if event.records_discarded == 0 {
            debug!("reorg at index {} discards nothing", last_common_index);
            return Ok(event);
        }

        self.restore_len = match self.state {
            ReorgState::Reconciling => self.restore_len.max(old_len),
            ReorgState::Stable => old_len,
        };
        self.state = ReorgState::Reconciling;
        self.reorg_count += 1;
        debug!(
            "reorg: ledger truncated {} -> {}, reconciling until length {}",
            old_len, new_len, self.restore_len
        );
        Ok(event)
    }

    /// Append a replacement (or regular) record and return to `Stable` once
    /// the discarded heights are covered again.
    pub fn append(&mut self, ledger: &mut EpochLedger, record: FeeRecord) {
        ledger.append(record);
        self.observe_len(ledger.len());
    }

    /// End reconciliation explicitly.
    ///
    /// Used when the replacement chain segment is shorter than the one it
    /// replaced and the collaborator has replayed its new tip. Returns
    /// whether a reconciliation was actually in progress.
    pub fn finish_reconciliation(&mut self) -> bool {
        let was_reconciling = self.is_reconciling();
        if was_reconciling {
            debug!("reconciliation finished explicitly");
        }
        self.state = ReorgState::Stable;
        self.restore_len = 0;
        was_reconciling
    }

    fn observe_len(&mut self, len: usize) {
        if self.is_reconciling() && len >= self.restore_len {
            debug!("ledger back at length {}, reconciliation complete", len);
            self.state = ReorgState::Stable;
            self.restore_len = 0;
        }
    }

    // -------------------------------------------------------------------------
    // Settlement guard
    // -------------------------------------------------------------------------

    /// Fail with `SettlementDuringReconciliation` unless `Stable`.
    pub fn ensure_stable(&self) -> Result<()> {
        if self.is_reconciling() {
            return Err(SettlementError::SettlementDuringReconciliation);
        }
        Ok(())
    }

    /// Settle `ledger` if, and only if, it matches the canonical chain.
    pub fn settle(&self, ledger: &EpochLedger) -> Result<SettlementResult> {
        self.ensure_stable()?;
        settle(&ledger.snapshot())
    }
}

// =============================================================================
// Tests
// =============================================================================
