//! Core types for forger fee settlement.
//!
//! This crate provides the foundational types shared by the settlement
//! crates: participant identifiers, per-block fee records, the raw block
//! events supplied by the block-production side, EIP-1559 fee derivation,
//! and the settlement error taxonomy.

pub mod error;
pub mod gas;
pub mod participant;
pub mod record;

pub use error::{Result, SettlementError};
pub use gas::{effective_gas_price, BlockFeeBuilder, TxFee};
pub use participant::ParticipantId;
pub use record::{BlockFeeEvent, FeeRecord};

/// Fee amount in the smallest settlement unit (wei).
///
/// `u64` only covers ~18.4 coins at 10^18 units per coin, so amounts are
/// carried as `u128` end to end.
pub type Amount = u128;
