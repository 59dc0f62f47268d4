//! Derivation of a block's pool and tip fees from EIP-1559 parameters.
//!
//! Each included transaction pays `gas_used * effective_gas_price`. The
//! base-fee part (`gas_used * base_fee_per_gas`) goes to the forger pool;
//! the rest is the forger's tip. Funds sent straight to the forger pool
//! inside a block are pooled as well.

use crate::{Amount, FeeRecord, ParticipantId, Result, SettlementError};

/// Price per gas a transaction actually pays.
///
/// `base + min(max_priority, max_fee - base)`. A priority fee above the
/// headroom left by `max_fee` is capped. Legacy transactions pass their gas
/// price as both caps.
///
/// ```
/// # use epochfee_types::effective_gas_price;
/// // Priority fee 56_700 requested, but only 56_690 of headroom.
/// let price = effective_gas_price(1_000, 1_000 + 56_690, 56_700).unwrap();
/// assert_eq!(price, 1_000 + 56_690);
/// ```
pub fn effective_gas_price(
    base_fee_per_gas: Amount,
    max_fee_per_gas: Amount,
    max_priority_fee_per_gas: Amount,
) -> Result<Amount> {
    let headroom = max_fee_per_gas
        .checked_sub(base_fee_per_gas)
        .ok_or(SettlementError::FeeCapTooLow {
            max_fee: max_fee_per_gas,
            base_fee: base_fee_per_gas,
        })?;
    // Cannot overflow: the sum is bounded by max_fee_per_gas.
    Ok(base_fee_per_gas + max_priority_fee_per_gas.min(headroom))
}

/// Fee paid by one transaction, split into its pooled and tip parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxFee {
    pub pool_fee: Amount,
    pub tip_fee: Amount,
}

impl TxFee {
    /// Split a transaction's fee from its receipt data.
    pub fn from_receipt(
        gas_used: u64,
        effective_gas_price: Amount,
        base_fee_per_gas: Amount,
    ) -> Result<Self> {
        let priority = effective_gas_price
            .checked_sub(base_fee_per_gas)
            .ok_or(SettlementError::GasPriceBelowBaseFee {
                gas_price: effective_gas_price,
                base_fee: base_fee_per_gas,
            })?;
        let gas = Amount::from(gas_used);
        Ok(Self {
            pool_fee: gas.checked_mul(base_fee_per_gas).ok_or(SettlementError::Overflow)?,
            tip_fee: gas.checked_mul(priority).ok_or(SettlementError::Overflow)?,
        })
    }

    /// Total fee paid by the sender.
    pub fn total(&self) -> Option<Amount> {
        self.pool_fee.checked_add(self.tip_fee)
    }
}

/// Accumulates the fees of one block into a `FeeRecord`.
#[derive(Debug, Clone)]
pub struct BlockFeeBuilder {
    participant_id: ParticipantId,
    pool_fee: Amount,
    tip_fee: Amount,
    tx_count: usize,
}

impl BlockFeeBuilder {
    pub fn new(participant_id: impl Into<ParticipantId>) -> Self {
        Self {
            participant_id: participant_id.into(),
            pool_fee: 0,
            tip_fee: 0,
            tx_count: 0,
        }
    }

    pub fn add_tx(&mut self, fee: TxFee) -> Result<&mut Self> {
        self.pool_fee = self
            .pool_fee
            .checked_add(fee.pool_fee)
            .ok_or(SettlementError::Overflow)?;
        self.tip_fee = self
            .tip_fee
            .checked_add(fee.tip_fee)
            .ok_or(SettlementError::Overflow)?;
        self.tx_count += 1;
        Ok(self)
    }

    /// Funds transferred directly to the forger pool within this block.
    pub fn add_pool_deposit(&mut self, amount: Amount) -> Result<&mut Self> {
        self.pool_fee = self
            .pool_fee
            .checked_add(amount)
            .ok_or(SettlementError::Overflow)?;
        Ok(self)
    }

    pub fn tx_count(&self) -> usize {
        self.tx_count
    }

    pub fn build(self) -> FeeRecord {
        FeeRecord {
            participant_id: self.participant_id,
            pool_fee: self.pool_fee,
            tip_fee: self.tip_fee,
        }
    }
}
