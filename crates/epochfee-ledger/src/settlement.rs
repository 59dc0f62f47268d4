//! Forger fee settlement.
//!
//! Turns a closed epoch's fee records into the list of payments owed to each
//! forging participant:
//!
//! 1. The pooled fees of the whole epoch are split evenly across the `N`
//!    blocks of the epoch (zero-fee blocks included): every block earns
//!    `pool_total / N` for its producer.
//! 2. The `pool_total % N` units left over go one each to the producers of
//!    the *earliest* blocks of the epoch. Payment digests depend on this
//!    exact placement.
//! 3. Every tip goes to the producer of the block that collected it.
//! 4. Credits are aggregated per participant in order of first appearance.
//!
//! The sum of all payments must equal the pooled fees plus the tips. A
//! mismatch aborts the settlement with `ConservationViolation`.

use std::collections::HashMap;

use epochfee_types::{Amount, FeeRecord, ParticipantId, Result, SettlementError};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use tiny_keccak::{Hasher, Keccak};

use crate::ledger::fee_totals;

// =============================================================================
// FeePayment / SettlementResult
// =============================================================================

/// Amount owed to one participant for the epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePayment {
    pub participant_id: ParticipantId,
    pub amount: Amount,
}

/// Payments of one epoch, in order of each participant's first block.
///
/// Participants who produced no block in the epoch have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementResult {
    payments: Vec<FeePayment>,
}

impl SettlementResult {
    pub(crate) fn from_payments(payments: Vec<FeePayment>) -> Self {
        Self { payments }
    }

    pub fn payments(&self) -> &[FeePayment] {
        &self.payments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FeePayment> {
        self.payments.iter()
    }

    pub fn len(&self) -> usize {
        self.payments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payments.is_empty()
    }

    /// Amount owed to `participant`, `None` if they produced no block.
    pub fn amount_of(&self, participant: &ParticipantId) -> Option<Amount> {
        self.payments
            .iter()
            .find(|p| &p.participant_id == participant)
            .map(|p| p.amount)
    }

    /// Sum of all payments, `None` on overflow.
    pub fn total(&self) -> Option<Amount> {
        self.payments
            .iter()
            .try_fold(0 as Amount, |acc, p| acc.checked_add(p.amount))
    }

    /// Keccak-256 over a canonical encoding of the payments.
    ///
    /// Each payment contributes its id length (u32 LE), the id bytes and the
    /// amount (u128 LE), in payment order. Two settlements are bit-identical
    /// exactly when their digests match.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Keccak::v256();
        for p in &self.payments {
            let id = p.participant_id.as_str().as_bytes();
            hasher.update(&(id.len() as u32).to_le_bytes());
            hasher.update(id);
            hasher.update(&p.amount.to_le_bytes());
        }
        let mut out = [0u8; 32];
        hasher.finalize(&mut out);
        out
    }

    /// `digest()` as lowercase hex.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest())
    }
}

impl<'a> IntoIterator for &'a SettlementResult {
    type Item = &'a FeePayment;
    type IntoIter = std::slice::Iter<'a, FeePayment>;

    fn into_iter(self) -> Self::IntoIter {
        self.payments.iter()
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// Settle a finalized epoch ledger snapshot.
///
/// An empty ledger settles to an empty result.
///
/// ```
/// # use epochfee_ledger::settle;
/// # use epochfee_types::{FeeRecord, ParticipantId};
/// let ledger = [
///     FeeRecord::new("P1", 10, 0),
///     FeeRecord::new("P1", 0, 0),
///     FeeRecord::new("P2", 0, 5),
/// ];
/// let result = settle(&ledger).unwrap();
/// assert_eq!(result.amount_of(&ParticipantId::new("P1")), Some(7));
/// assert_eq!(result.amount_of(&ParticipantId::new("P2")), Some(8));
/// ```
pub fn settle(records: &[FeeRecord]) -> Result<SettlementResult> {
    if records.is_empty() {
        debug!("settling empty epoch: no blocks, no payments");
        return Ok(SettlementResult::default());
    }

    let block_count = records.len() as Amount;
    let (pool_total, tip_total) = fee_totals(records)?;
    let base_share = pool_total / block_count;
    let remainder = pool_total % block_count;
    debug!(
        "settling {} blocks: pool {} tips {} base share {} remainder {}",
        block_count, pool_total, tip_total, base_share, remainder
    );

    let mut payments: Vec<FeePayment> = Vec::new();
    let mut slots: HashMap<&ParticipantId, usize> = HashMap::new();

    for (i, record) in records.iter().enumerate() {
        let mut credit = base_share;
        if (i as Amount) < remainder {
            credit += 1;
        }
        credit = credit
            .checked_add(record.tip_fee)
            .ok_or(SettlementError::Overflow)?;

        let slot = *slots.entry(&record.participant_id).or_insert_with(|| {
            payments.push(FeePayment {
                participant_id: record.participant_id.clone(),
                amount: 0,
            });
            payments.len() - 1
        });
        let payment = &mut payments[slot];
        payment.amount = payment
            .amount
            .checked_add(credit)
            .ok_or(SettlementError::Overflow)?;
        trace!("block {} credits {} to {}", i, credit, record.participant_id);
    }

    let result = SettlementResult::from_payments(payments);
    let expected = pool_total
        .checked_add(tip_total)
        .ok_or(SettlementError::Overflow)?;
    check_conservation(&result, expected)?;
    Ok(result)
}

/// Verify that a settlement pays out exactly `expected`.
pub fn check_conservation(result: &SettlementResult, expected: Amount) -> Result<()> {
    let credited = result.total().ok_or(SettlementError::Overflow)?;
    if credited != expected {
        return Err(SettlementError::ConservationViolation { credited, expected });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
