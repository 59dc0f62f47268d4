//! CLI error types.

use std::path::PathBuf;

use epochfee_types::SettlementError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("event {index}: {source}")]
    Event {
        index: usize,
        #[source]
        source: SettlementError,
    },

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),
}
