use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use thiserror::Error;
use ulid::MonotonicError;

use super::WriterState;
use crate::id::TabletId;

/// Failures surfaced by tablet writer operations.
///
/// None of them are retried internally. Whatever call fails, the caller's only
/// remaining obligation is to `close` the writer.
#[derive(Debug, Error)]
pub enum TabletWriterError {
    #[error("tablet writer io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tablet writer parquet error: {0}")]
    Parquet(#[from] ParquetError),
    #[error("tablet writer arrow error: {0}")]
    Arrow(#[from] ArrowError),
    #[error("segment file id exhausted: {0}")]
    FileId(#[from] MonotonicError),
    #[error("tablet {0} already has an open writer")]
    SlotUnavailable(TabletId),
    #[error("`{op}` is not allowed while the writer is {state}")]
    InvalidState {
        op: &'static str,
        state: WriterState,
    },
    #[error("batch schema does not match the schema of tablet {0}")]
    SchemaMismatch(TabletId),
    #[error("sort key column {column} is out of range for a schema of {fields} fields")]
    InvalidSortKey { column: usize, fields: usize },
    #[error("row {row} of the batch is not ascending by the sort key")]
    OutOfOrder { row: usize },
}

impl TabletWriterError {
    /// Whether the error is a misuse of the writer rather than an IO or data failure.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, TabletWriterError::InvalidState { .. })
    }
}
