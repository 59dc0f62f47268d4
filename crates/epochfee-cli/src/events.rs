//! Recorded event log format.
//!
//! An event log is a JSON array, one entry per collaborator event:
//!
//! ```json
//! [
//!   {"block": {"participant_id": "0x01..", "pool_fee": 10, "tip_fee": 0, "block_height": 1}},
//!   {"reorg": {"common_ancestor_height": 5}},
//!   "reconciled",
//!   "settle"
//! ]
//! ```

use epochfee_types::{BlockFeeEvent, FeeRecord, ParticipantId, Result};
use serde::{Deserialize, Serialize};

/// One recorded collaborator event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayEvent {
    /// A block was finalised locally.
    Block(BlockFeeEvent),
    /// Fork choice switched chains.
    Reorg { common_ancestor_height: u64 },
    /// The replacement chain has been fully replayed.
    Reconciled,
    /// Epoch boundary: settle now.
    Settle,
}

/// One ledger entry of a `settle --ledger` file. Fees are signed so that a
/// negative entry is reported as an invalid record rather than a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LedgerEntry {
    pub participant_id: ParticipantId,
    pub pool_fee: i128,
    pub tip_fee: i128,
}

impl LedgerEntry {
    pub fn to_record(&self) -> Result<FeeRecord> {
        FeeRecord::from_signed(self.participant_id.clone(), self.pool_fee, self.tip_fee)
    }
}
