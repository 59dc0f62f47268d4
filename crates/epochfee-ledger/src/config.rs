//! Fee accounting configuration.

use epochfee_types::{Result, SettlementError};
use serde::{Deserialize, Serialize};

/// Settled epochs whose ledgers are kept so a deep reorg can reopen them.
pub const DEFAULT_RETAINED_EPOCHS: usize = 2;

/// Settled epochs whose settlements stay queryable.
pub const DEFAULT_SETTLEMENT_HISTORY: usize = 256;

/// Configuration for `FeeAccounting`.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// # use epochfee_ledger::AccountingConfig;
/// let config = AccountingConfig::from_json(r#"{ "epoch_length": 20 }"#).unwrap();
/// assert_eq!(config.epoch_length, Some(20));
/// assert_eq!(config.first_block_height, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountingConfig {
    /// Id of the first epoch accounted for.
    pub first_epoch_id: u64,
    /// Height of the first block of the first epoch.
    pub first_block_height: u64,
    /// Blocks per epoch, when the boundary is a fixed block count. The
    /// accounting only reports that an epoch is complete; settling stays the
    /// caller's decision.
    pub epoch_length: Option<u64>,
    /// Number of most recent settled epochs whose ledgers are retained for
    /// reopening on reorg.
    pub retained_epochs: usize,
    /// Number of most recent settled epochs kept at all. Older settlements
    /// are evicted and no longer returned by `get_settlement`.
    pub settlement_history: usize,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            first_epoch_id: 0,
            first_block_height: 0,
            epoch_length: None,
            retained_epochs: DEFAULT_RETAINED_EPOCHS,
            settlement_history: DEFAULT_SETTLEMENT_HISTORY,
        }
    }
}

impl AccountingConfig {
    /// Parse a JSON document. `FeeAccounting::new` validates the result.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.epoch_length == Some(0) {
            return Err(SettlementError::InvalidConfig {
                reason: "epoch_length must be at least 1".to_string(),
            });
        }
        if self.settlement_history == 0 || self.settlement_history < self.retained_epochs {
            return Err(SettlementError::InvalidConfig {
                reason: format!(
                    "settlement_history {} must be at least 1 and at least retained_epochs ({})",
                    self.settlement_history, self.retained_epochs
                ),
            });
        }
        if self.first_block_height > i64::MAX as u64 {
            return Err(SettlementError::InvalidConfig {
                reason: format!(
                    "first_block_height {} exceeds the supported height range",
                    self.first_block_height
                ),
            });
        }
        Ok(())
    }
}
