//! Settlement error types.

use thiserror::Error;

use crate::{Amount, ParticipantId};

/// Errors produced while recording, reorganising or settling epoch fees.
///
/// None of these are recoverable locally: each one signals either bad
/// collaborator input or a broken internal invariant, and the caller must
/// not proceed with the affected epoch's accounting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("invalid fee record for {participant_id}: {field} is negative ({value})")]
    InvalidRecord {
        participant_id: ParticipantId,
        field: &'static str,
        value: i128,
    },

    #[error("ledger index {index} out of range (ledger length {len})")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("conservation violated: credited {credited}, expected {expected}")]
    ConservationViolation { credited: Amount, expected: Amount },

    #[error("settlement requested while a reorg is being reconciled")]
    SettlementDuringReconciliation,

    #[error("fee amount overflow")]
    Overflow,

    #[error("unexpected block height: expected {expected}, got {got}")]
    UnexpectedHeight { expected: u64, got: u64 },

    #[error("invalid accounting configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("fee cap {max_fee} is below the base fee {base_fee}")]
    FeeCapTooLow { max_fee: Amount, base_fee: Amount },

    #[error("effective gas price {gas_price} is below the base fee {base_fee}")]
    GasPriceBelowBaseFee { gas_price: Amount, base_fee: Amount },
}

pub type Result<T> = std::result::Result<T, SettlementError>;
