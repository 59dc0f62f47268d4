//! CLI command implementations.

use std::io::Write;
use std::path::Path;

use epochfee_ledger::{settle, AccountingConfig, BlockOutcome, FeeAccounting, SettlementResult};
use epochfee_types::FeeRecord;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CliError;
use crate::events::{LedgerEntry, ReplayEvent};

type Result<T> = std::result::Result<T, CliError>;

// ─── Reports ────────────────────────────────────────────────────────────────

/// Fee payments of one settled epoch.
#[derive(Debug, Serialize)]
pub struct EpochReport {
    pub epoch_id: Option<u64>,
    pub start_height: Option<u64>,
    pub block_count: usize,
    pub digest: String,
    pub payments: SettlementResult,
}

/// State after replaying an event log.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub epochs: Vec<EpochReport>,
    pub open_epoch: u64,
    pub open_blocks: usize,
    pub reconciling: bool,
}

impl ReplayReport {
    fn from_accounting(acc: &FeeAccounting) -> Self {
        let epochs = acc
            .settled_epochs()
            .iter()
            .map(|e| EpochReport {
                epoch_id: Some(e.epoch_id),
                start_height: Some(e.start_height),
                block_count: e.block_count,
                digest: e.settlement.digest_hex(),
                payments: e.settlement.clone(),
            })
            .collect();
        Self {
            epochs,
            open_epoch: acc.current_epoch(),
            open_blocks: acc.ledger_snapshot().len(),
            reconciling: acc.is_reconciling(),
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_epoch(out: &mut impl Write, report: &EpochReport) -> Result<()> {
    match (report.epoch_id, report.start_height) {
        (Some(id), Some(start)) => writeln!(
            out,
            "epoch {}  heights {}..{}  blocks {}  digest {}",
            id,
            start,
            start + report.block_count as u64,
            report.block_count,
            report.digest
        )?,
        _ => writeln!(out, "blocks {}  digest {}", report.block_count, report.digest)?,
    }
    for payment in &report.payments {
        writeln!(out, "  {}  {}", payment.participant_id, payment.amount)?;
    }
    Ok(())
}

fn write_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

// ─── Replay ─────────────────────────────────────────────────────────────────

/// Drive a fresh `FeeAccounting` through `events`.
///
/// With `epoch_length` configured, an epoch is settled as soon as its last
/// block is recorded; explicit `settle` events are honoured either way.
pub fn replay(events: &[ReplayEvent], config: AccountingConfig) -> Result<FeeAccounting> {
    let mut acc = FeeAccounting::new(config)?;
    for (index, event) in events.iter().enumerate() {
        let step = match event {
            ReplayEvent::Block(block) => match acc.on_block(block) {
                Ok(BlockOutcome::EpochComplete) => acc.settle().map(|_| ()),
                Ok(BlockOutcome::Appended) => Ok(()),
                Err(e) => Err(e),
            },
            ReplayEvent::Reorg {
                common_ancestor_height,
            } => acc.on_reorg(*common_ancestor_height).map(|reorg| {
                debug!(
                    "event {}: reorg discarded {} records",
                    index, reorg.records_discarded
                )
            }),
            ReplayEvent::Reconciled => {
                acc.finish_reconciliation();
                Ok(())
            }
            ReplayEvent::Settle => acc.settle().map(|_| ()),
        };
        step.map_err(|source| CliError::Event { index, source })?;
    }
    info!(
        "replayed {} events: {} epochs settled, epoch {} open",
        events.len(),
        acc.settled_epochs().len(),
        acc.current_epoch()
    );
    Ok(acc)
}

pub fn run_replay(
    out: &mut impl Write,
    events_path: &Path,
    config_path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = match config_path {
        Some(path) => load_json::<AccountingConfig>(path)?,
        None => AccountingConfig::default(),
    };
    let events: Vec<ReplayEvent> = load_json(events_path)?;
    let acc = replay(&events, config)?;
    let report = ReplayReport::from_accounting(&acc);

    if json {
        return write_json(out, &report);
    }
    for epoch in &report.epochs {
        write_epoch(out, epoch)?;
    }
    writeln!(
        out,
        "open epoch {}: {} blocks{}",
        report.open_epoch,
        report.open_blocks,
        if report.reconciling { " (reconciling)" } else { "" }
    )?;
    Ok(())
}

// ─── Settle ─────────────────────────────────────────────────────────────────

pub fn run_settle(out: &mut impl Write, ledger_path: &Path, json: bool) -> Result<()> {
    let entries: Vec<LedgerEntry> = load_json(ledger_path)?;
    let records = entries
        .iter()
        .map(LedgerEntry::to_record)
        .collect::<std::result::Result<Vec<FeeRecord>, _>>()?;
    let settlement = settle(&records)?;
    let report = EpochReport {
        epoch_id: None,
        start_height: None,
        block_count: records.len(),
        digest: settlement.digest_hex(),
        payments: settlement,
    };
    if json {
        write_json(out, &report)
    } else {
        write_epoch(out, &report)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
