//! Epoch fee accounting: ledger, settlement, reorg reconciliation.
//!
//! Builds on `epochfee-types` (records, errors) and adds:
//! - `EpochLedger`, the ordered per-block record set of one epoch
//! - the settlement engine that splits pooled fees and pays tips
//! - `ReorgCoordinator`, truncate-and-replay handling of chain reorgs
//! - `FeeAccounting`, which ties epochs, reorgs and settlement history together

pub mod accounting;
pub mod config;
pub mod ledger;
pub mod reorg;
pub mod settlement;

pub use accounting::{BlockOutcome, FeeAccounting, SettledEpoch};
pub use config::AccountingConfig;
pub use ledger::EpochLedger;
pub use reorg::{ReorgCoordinator, ReorgEvent, ReorgState};
pub use settlement::{settle, FeePayment, SettlementResult};
