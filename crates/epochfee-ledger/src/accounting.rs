//! Epoch fee accounting.
//!
//! `FeeAccounting` consumes the block-production side's events, keyed by
//! block height:
//! - block events append one record to the open epoch's ledger,
//! - reorg notifications truncate the ledger (reopening an already settled
//!   epoch when the common ancestor lies inside it),
//! - the epoch-boundary signal settles the open epoch and starts the next.
//!
//! Settlements of closed epochs stay queryable by epoch id. The ledgers of
//! the most recent `retained_epochs` settled epochs are kept as well, so a
//! reorg reaching back into them can withdraw their settlement and replay.

use std::sync::Arc;

use epochfee_types::{BlockFeeEvent, FeeRecord, Result, SettlementError};
use log::{debug, info, trace, warn};

use crate::config::AccountingConfig;
use crate::ledger::EpochLedger;
use crate::reorg::{ReorgCoordinator, ReorgEvent, ReorgState};
use crate::settlement::{settle, SettlementResult};

// =============================================================================
// BlockOutcome
// =============================================================================

/// Result of recording a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    /// Block recorded; the epoch is still open.
    Appended,
    /// Block recorded and the configured epoch length has been reached with
    /// the ledger stable. The caller should settle.
    EpochComplete,
}

// =============================================================================
// SettledEpoch
// =============================================================================

/// A closed epoch and its settlement.
#[derive(Debug, Clone)]
pub struct SettledEpoch {
    pub epoch_id: u64,
    /// Height of the epoch's first block.
    pub start_height: u64,
    pub block_count: usize,
    pub settlement: SettlementResult,
    /// Dropped once the epoch falls out of the retention window.
    ledger: Option<Arc<[FeeRecord]>>,
}

impl SettledEpoch {
    /// Height right after the epoch's last block.
    pub fn end_height(&self) -> u64 {
        self.start_height + self.block_count as u64
    }

    /// The frozen ledger, if still retained.
    pub fn ledger(&self) -> Option<&Arc<[FeeRecord]>> {
        self.ledger.as_ref()
    }
}

// =============================================================================
// FeeAccounting
// =============================================================================

#[derive(Debug, Clone)]
struct OpenEpoch {
    epoch_id: u64,
    start_height: u64,
    ledger: EpochLedger,
    coordinator: ReorgCoordinator,
}

impl OpenEpoch {
    fn new(epoch_id: u64, start_height: u64) -> Self {
        Self {
            epoch_id,
            start_height,
            ledger: EpochLedger::new(),
            coordinator: ReorgCoordinator::new(),
        }
    }

    fn next_height(&self) -> u64 {
        self.start_height + self.ledger.len() as u64
    }
}

/// Owner of the open epoch's ledger and of the settlement history.
#[derive(Debug, Clone)]
pub struct FeeAccounting {
    config: AccountingConfig,
    open: OpenEpoch,
    /// Settled epochs with consecutive ids, oldest first. At most
    /// `config.settlement_history` entries.
    settled: Vec<SettledEpoch>,
}

impl FeeAccounting {
    pub fn new(config: AccountingConfig) -> Result<Self> {
        config.validate()?;
        let open = OpenEpoch::new(config.first_epoch_id, config.first_block_height);
        Ok(Self {
            config,
            open,
            settled: Vec::new(),
        })
    }

    pub fn config(&self) -> &AccountingConfig {
        &self.config
    }

    /// Id of the epoch currently accumulating blocks.
    pub fn current_epoch(&self) -> u64 {
        self.open.epoch_id
    }

    /// Height of the open epoch's first block.
    pub fn epoch_start_height(&self) -> u64 {
        self.open.start_height
    }

    /// Height the next block event must carry.
    pub fn next_height(&self) -> u64 {
        self.open.next_height()
    }

    pub fn reorg_state(&self) -> ReorgState {
        self.open.coordinator.state()
    }

    pub fn is_reconciling(&self) -> bool {
        self.open.coordinator.is_reconciling()
    }

    // -------------------------------------------------------------------------
    // Collaborator events
    // -------------------------------------------------------------------------

    /// Record the fees of a newly finalised block.
    pub fn on_block(&mut self, event: &BlockFeeEvent) -> Result<BlockOutcome> {
        let expected = self.open.next_height();
        if event.block_height != expected {
            return Err(SettlementError::UnexpectedHeight {
                expected,
                got: event.block_height,
            });
        }
        let record = event.to_record()?;
        trace!(
            "epoch {} block {}: {} pool {} tip {}",
            self.open.epoch_id,
            event.block_height,
            record.participant_id,
            record.pool_fee,
            record.tip_fee
        );
        self.open.coordinator.append(&mut self.open.ledger, record);

        let complete = match self.config.epoch_length {
            Some(len) => self.open.ledger.len() as u64 >= len && !self.is_reconciling(),
            None => false,
        };
        Ok(if complete {
            BlockOutcome::EpochComplete
        } else {
            BlockOutcome::Appended
        })
    }

    /// Apply a canonical-chain switch whose last common block is at
    /// `common_ancestor_height`.
    pub fn on_reorg(&mut self, common_ancestor_height: u64) -> Result<ReorgEvent> {
        let open_start = self.open.start_height;
        if common_ancestor_height.saturating_add(1) >= open_start {
            let index = relative_index(common_ancestor_height, open_start);
            return self
                .open
                .coordinator
                .handle_reorg(&mut self.open.ledger, index);
        }
        self.reopen_settled(common_ancestor_height)
    }

    /// Replacement chain fully replayed although shorter than the discarded
    /// one.
    pub fn finish_reconciliation(&mut self) -> bool {
        self.open.coordinator.finish_reconciliation()
    }

    /// Settle the open epoch and open the next one.
    ///
    /// On error the open epoch is left exactly as it was.
    pub fn settle(&mut self) -> Result<SettlementResult> {
        self.open.coordinator.ensure_stable()?;
        let snapshot = self.open.ledger.snapshot();
        let settlement = settle(&snapshot)?;
        info!(
            "epoch {} settled: {} blocks, {} payments, digest {}",
            self.open.epoch_id,
            snapshot.len(),
            settlement.len(),
            settlement.digest_hex()
        );

        let next = OpenEpoch::new(
            self.open.epoch_id.saturating_add(1),
            self.open.next_height(),
        );
        let closed = std::mem::replace(&mut self.open, next);
        self.settled.push(SettledEpoch {
            epoch_id: closed.epoch_id,
            start_height: closed.start_height,
            block_count: snapshot.len(),
            settlement: settlement.clone(),
            ledger: Some(snapshot),
        });
        self.prune_ledgers();
        self.evict_settlements();
        Ok(settlement)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Settlement of a closed epoch; `None` for the open epoch, for epochs
    /// not settled yet and for settlements withdrawn by a reorg.
    pub fn get_settlement(&self, epoch_id: u64) -> Option<&SettlementResult> {
        self.settled_epoch(epoch_id).map(|e| &e.settlement)
    }

    pub fn settled_epoch(&self, epoch_id: u64) -> Option<&SettledEpoch> {
        let oldest = self.settled.first()?.epoch_id;
        let offset = epoch_id.checked_sub(oldest)?;
        self.settled.get(usize::try_from(offset).ok()?)
    }

    pub fn settled_epochs(&self) -> &[SettledEpoch] {
        &self.settled
    }

    /// Audit view of the open epoch's ledger.
    pub fn ledger_snapshot(&self) -> Arc<[FeeRecord]> {
        self.open.ledger.snapshot()
    }

    /// Audit view of a settled epoch's ledger, if still retained.
    pub fn settled_ledger(&self, epoch_id: u64) -> Option<Arc<[FeeRecord]>> {
        self.settled_epoch(epoch_id)?.ledger.clone()
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// Reorg whose common ancestor precedes the open epoch: reopen the
    /// settled epoch that contains the first discarded height.
    fn reopen_settled(&mut self, common_ancestor_height: u64) -> Result<ReorgEvent> {
        let first_discarded = common_ancestor_height + 1;
        let target = self.settled.iter().rposition(|e| {
            e.start_height <= first_discarded && first_discarded < e.end_height()
        });
        let target = match target {
            Some(pos) if self.settled[pos].ledger.is_some() => pos,
            _ => {
                return Err(SettlementError::IndexOutOfRange {
                    index: relative_index(common_ancestor_height, self.open.start_height),
                    len: self.open.ledger.len(),
                })
            }
        };

        let mut withdrawn = self.settled.split_off(target);
        for epoch in &withdrawn {
            warn!(
                "reorg below height {} withdraws settlement of epoch {} (digest {})",
                first_discarded,
                epoch.epoch_id,
                epoch.settlement.digest_hex()
            );
        }
        debug!(
            "discarding {} records of open epoch {}",
            self.open.ledger.len(),
            self.open.epoch_id
        );

        let reopened = withdrawn.remove(0);
        let ledger: EpochLedger = reopened
            .ledger
            .map(|records| records.to_vec())
            .unwrap_or_default()
            .into();
        self.open = OpenEpoch {
            epoch_id: reopened.epoch_id,
            start_height: reopened.start_height,
            ledger,
            coordinator: ReorgCoordinator::new(),
        };

        let index = relative_index(common_ancestor_height, reopened.start_height);
        self.open
            .coordinator
            .handle_reorg(&mut self.open.ledger, index)
    }

    fn evict_settlements(&mut self) {
        let excess = self.settled.len().saturating_sub(self.config.settlement_history);
        if excess > 0 {
            debug!(
                "evicting settlements of epochs {}..={}",
                self.settled[0].epoch_id,
                self.settled[excess - 1].epoch_id
            );
            self.settled.drain(..excess);
        }
    }

    fn prune_ledgers(&mut self) {
        let keep_from = self.settled.len().saturating_sub(self.config.retained_epochs);
        for epoch in self.settled.iter_mut().take(keep_from) {
            epoch.ledger = None;
        }
    }
}

/// Ledger position of `height` within an epoch starting at `start_height`
/// (`-1` for the block right before the epoch).
fn relative_index(height: u64, start_height: u64) -> i64 {
    let offset = i128::from(height) - i128::from(start_height);
    offset.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

// =============================================================================
// Tests
// =============================================================================
