//! Withdrawal-epoch simulation tests.
//!
//! Drives `FeeAccounting` the way a forging node does: two forgers produce
//! blocks whose fees come from EIP-1559 receipts and forger-pool deposits,
//! epochs close every `EPOCH_LENGTH` blocks, and the chain is reorganised
//! both inside the open epoch and across an already settled one.

use epochfee_ledger::{settle, AccountingConfig, BlockOutcome, FeeAccounting, SettlementResult};
use epochfee_types::{
    effective_gas_price, Amount, BlockFeeBuilder, BlockFeeEvent, FeeRecord, ParticipantId, TxFee,
};

const EPOCH_LENGTH: u64 = 20;
const WEI_PER_ZENNY: Amount = 10_000_000_000;
const BASE_FEE: Amount = 875_000_000;

fn forger(n: u8) -> ParticipantId {
    ParticipantId::from_address(&[n; 20])
}

fn new_accounting() -> FeeAccounting {
    FeeAccounting::new(AccountingConfig {
        first_epoch_id: 60,
        first_block_height: 1,
        epoch_length: Some(EPOCH_LENGTH),
        retained_epochs: 2,
        ..AccountingConfig::default()
    })
    .unwrap()
}

/// Block carrying one EIP-1559 transaction.
fn tx_block(producer: &ParticipantId, gas_used: u64, max_fee: Amount, max_priority: Amount) -> FeeRecord {
    let price = effective_gas_price(BASE_FEE, max_fee, max_priority).unwrap();
    let mut builder = BlockFeeBuilder::new(producer.clone());
    builder
        .add_tx(TxFee::from_receipt(gas_used, price, BASE_FEE).unwrap())
        .unwrap();
    builder.build()
}

/// Block carrying a transfer straight into the forger pool.
fn deposit_block(producer: &ParticipantId, amount: Amount) -> FeeRecord {
    let mut builder = BlockFeeBuilder::new(producer.clone());
    builder.add_pool_deposit(amount).unwrap();
    builder.build()
}

fn push(acc: &mut FeeAccounting, record: &FeeRecord) -> BlockOutcome {
    let event = BlockFeeEvent::new(
        record.participant_id.clone(),
        record.pool_fee as i128,
        record.tip_fee as i128,
        acc.next_height(),
    );
    acc.on_block(&event).unwrap()
}

/// Straightforward per-block accumulation, written independently of the
/// engine: floor share per block, one extra unit for the earliest blocks,
/// tips to the producer.
fn expected_payments(records: &[FeeRecord]) -> Vec<(ParticipantId, Amount)> {
    let n = records.len() as Amount;
    let pool: Amount = records.iter().map(|r| r.pool_fee).sum();
    let mut out: Vec<(ParticipantId, Amount)> = Vec::new();
    for (idx, r) in records.iter().enumerate() {
        let mut credit = r.tip_fee + pool / n;
        if (idx as Amount) < pool % n {
            credit += 1;
        }
        match out.iter_mut().find(|(p, _)| p == &r.participant_id) {
            Some((_, amount)) => *amount += credit,
            None => out.push((r.participant_id.clone(), credit)),
        }
    }
    out
}

fn as_pairs(result: &SettlementResult) -> Vec<(ParticipantId, Amount)> {
    result
        .iter()
        .map(|p| (p.participant_id.clone(), p.amount))
        .collect()
}

/// First epoch of the two-forger scenario: forger 1 forges the stake and
/// transfer blocks, forger 2 joins later with a capped-priority transaction,
/// the rest of the epoch is empty blocks split between them.
fn two_forger_epoch() -> Vec<FeeRecord> {
    let f1 = forger(1);
    let f2 = forger(2);
    let mut blocks = vec![
        FeeRecord::empty(f1.clone()),
        tx_block(&f1, 63_000, BASE_FEE + 3_000_000, 1_000_000),
        FeeRecord::empty(f1.clone()),
        tx_block(&f1, 21_000, BASE_FEE + 2_500_000, 2_500_000),
        tx_block(&f2, 123_400, BASE_FEE + 56_690, 56_700),
    ];
    while blocks.len() < EPOCH_LENGTH as usize {
        let producer = if blocks.len() % 2 == 0 { &f1 } else { &f2 };
        blocks.push(FeeRecord::empty(producer.clone()));
    }
    blocks
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_two_forger_epoch_matches_reference_accumulation() {
    let blocks = two_forger_epoch();
    let mut acc = new_accounting();

    let mut outcome = BlockOutcome::Appended;
    for record in &blocks {
        assert_eq!(outcome, BlockOutcome::Appended);
        outcome = push(&mut acc, record);
    }
    assert_eq!(outcome, BlockOutcome::EpochComplete);

    let result = acc.settle().unwrap();
    assert_eq!(as_pairs(&result), expected_payments(&blocks));

    let total: Amount = blocks.iter().map(|r| r.pool_fee + r.tip_fee).sum();
    assert_eq!(result.total(), Some(total));
    assert_eq!(result.payments()[0].participant_id, forger(1));
    assert_eq!(result.payments()[1].participant_id, forger(2));

    // Mid-epoch there is nothing to report for the next epoch.
    assert!(acc.get_settlement(61).is_none());
    assert_eq!(acc.get_settlement(60), Some(&result));
}

#[test]
fn test_capped_priority_fee_tip() {
    let record = tx_block(&forger(2), 123_400, BASE_FEE + 56_690, 56_700);
    assert_eq!(record.tip_fee, 123_400 * 56_690);
    assert_eq!(record.pool_fee, 123_400 * BASE_FEE);
}

#[test]
fn test_rollback_of_settled_epoch_with_pool_deposit() {
    let f1 = forger(1);
    let f2 = forger(2);
    let deposit = 1_000_000 * WEI_PER_ZENNY;

    let mut original = two_forger_epoch();
    original[18] = deposit_block(&f2, deposit);
    original[19] = FeeRecord::empty(f2.clone());

    let mut acc = new_accounting();
    for record in &original {
        push(&mut acc, record);
    }
    let first = acc.settle().unwrap();
    assert_eq!(as_pairs(&first), expected_payments(&original));
    push(&mut acc, &FeeRecord::empty(f1.clone()));

    // Invalidate the last two blocks of epoch 60 (heights 19 and 20) and
    // replace them with forger 1 blocks carrying a doubled deposit.
    let common_ancestor = 1 + 17;
    acc.on_reorg(common_ancestor).unwrap();
    assert!(acc.get_settlement(60).is_none());
    assert_eq!(acc.current_epoch(), 60);

    let mut replacement = original[..18].to_vec();
    replacement.push(deposit_block(&f1, 2 * deposit));
    replacement.push(FeeRecord::empty(f1.clone()));

    assert_eq!(push(&mut acc, &replacement[18]), BlockOutcome::Appended);
    assert_eq!(push(&mut acc, &replacement[19]), BlockOutcome::EpochComplete);
    let second = acc.settle().unwrap();

    assert_eq!(second, settle(&replacement).unwrap());
    assert_eq!(as_pairs(&second), expected_payments(&replacement));
    assert_ne!(second.digest(), first.digest());
    assert_eq!(acc.get_settlement(60), Some(&second));
    assert_eq!(acc.current_epoch(), 61);
    assert_eq!(acc.epoch_start_height(), 21);
}

#[test]
fn test_chained_reorgs_match_direct_chain() {
    let f1 = forger(1);
    let f2 = forger(2);
    let chain_a: Vec<FeeRecord> = (0..12).map(|i| FeeRecord::new(f1.clone(), 100 + i, 0)).collect();
    let chain_b: Vec<FeeRecord> = (0..5).map(|i| FeeRecord::new(f2.clone(), 7 * i, 3)).collect();
    let chain_c: Vec<FeeRecord> = (0..16).map(|i| FeeRecord::new(f2.clone(), 11 * i + 1, i % 4)).collect();

    let mut acc = new_accounting();
    for r in &chain_a {
        push(&mut acc, r);
    }
    // B forks after the 8th block; C forks after the 4th while B replays.
    acc.on_reorg(8).unwrap();
    for r in &chain_b[..3] {
        push(&mut acc, r);
    }
    assert!(acc.is_reconciling());
    acc.on_reorg(4).unwrap();
    let mut outcome = BlockOutcome::Appended;
    for r in &chain_c {
        outcome = push(&mut acc, r);
    }
    assert!(!acc.is_reconciling());
    assert_eq!(outcome, BlockOutcome::EpochComplete);
    let replayed = acc.settle().unwrap();

    let mut direct_acc = new_accounting();
    let direct: Vec<FeeRecord> = chain_a[..4].iter().chain(&chain_c[..16]).cloned().collect();
    for r in &direct {
        push(&mut direct_acc, r);
    }
    let direct_result = direct_acc.settle().unwrap();

    assert_eq!(replayed, direct_result);
    assert_eq!(replayed.digest(), direct_result.digest());
}

#[test]
fn test_participant_without_blocks_is_absent() {
    let mut acc = new_accounting();
    for _ in 0..EPOCH_LENGTH {
        push(&mut acc, &FeeRecord::new(forger(1), 3, 0));
    }
    let result = acc.settle().unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.amount_of(&forger(2)), None);
    assert_eq!(result.amount_of(&forger(1)), Some(60));
}
