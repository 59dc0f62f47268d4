//! Per-block fee records.
//!
//! A `FeeRecord` is the atomic unit of epoch accounting: one record per
//! produced block, zero-fee blocks included. `BlockFeeEvent` is the raw
//! observation delivered by the block-production side; its fee fields are
//! signed so that a bad observation can be represented and rejected before
//! it ever reaches a ledger.

use serde::{Deserialize, Serialize};

use crate::{Amount, ParticipantId, Result, SettlementError};

// =============================================================================
// FeeRecord
// =============================================================================

/// Fees contributed by a single block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRecord {
    /// Producer of the block.
    pub participant_id: ParticipantId,
    /// Base/protocol fee component, pooled and split across the epoch.
    pub pool_fee: Amount,
    /// Priority fee component, paid entirely to this block's producer.
    pub tip_fee: Amount,
}

impl FeeRecord {
    pub fn new(participant_id: impl Into<ParticipantId>, pool_fee: Amount, tip_fee: Amount) -> Self {
        Self {
            participant_id: participant_id.into(),
            pool_fee,
            tip_fee,
        }
    }

    /// A block that carried no fees at all. It still occupies a ledger slot
    /// and still earns a pool share.
    pub fn empty(participant_id: impl Into<ParticipantId>) -> Self {
        Self::new(participant_id, 0, 0)
    }

    /// Build a record from signed observations, rejecting negative fees.
    pub fn from_signed(
        participant_id: impl Into<ParticipantId>,
        pool_fee: i128,
        tip_fee: i128,
    ) -> Result<Self> {
        let participant_id = participant_id.into();
        let pool_fee = non_negative(&participant_id, "pool_fee", pool_fee)?;
        let tip_fee = non_negative(&participant_id, "tip_fee", tip_fee)?;
        Ok(Self {
            participant_id,
            pool_fee,
            tip_fee,
        })
    }

    /// `pool_fee + tip_fee`, or `None` on overflow.
    pub fn total_fee(&self) -> Option<Amount> {
        self.pool_fee.checked_add(self.tip_fee)
    }
}

fn non_negative(participant_id: &ParticipantId, field: &'static str, value: i128) -> Result<Amount> {
    Amount::try_from(value).map_err(|_| SettlementError::InvalidRecord {
        participant_id: participant_id.clone(),
        field,
        value,
    })
}

// =============================================================================
// BlockFeeEvent
// =============================================================================

/// Raw per-block observation emitted right after a block is finalised
/// locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFeeEvent {
    pub participant_id: ParticipantId,
    pub pool_fee: i128,
    pub tip_fee: i128,
    pub block_height: u64,
}

impl BlockFeeEvent {
    pub fn new(
        participant_id: impl Into<ParticipantId>,
        pool_fee: i128,
        tip_fee: i128,
        block_height: u64,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            pool_fee,
            tip_fee,
            block_height,
        }
    }

    /// Validate the observation and convert it into a ledger record.
    pub fn to_record(&self) -> Result<FeeRecord> {
        FeeRecord::from_signed(self.participant_id.clone(), self.pool_fee, self.tip_fee)
    }
}

// =============================================================================
// Tests
// =============================================================================
