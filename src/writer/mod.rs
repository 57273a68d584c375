//! Tablet writer contract and its concrete strategies.
//!
//! A writer is bound to one tablet for one writing session and is driven
//! through a strictly ordered call sequence:
//!
//! ```text
//! Created --open--> Opened --write/flush*--> Opened --finish--> Finished --close--> Closed
//!    \                 \                                                        ^
//!     `----------------`--(any error)--> Failed --------------close-------------'
//! ```
//!
//! Rows written between two flushes keep their relative order in the produced
//! segments. No order is promised across a flush. `close` consumes the writer
//! and must run on every path; the [`crate::session`] driver does that for you.

mod any;
mod error;
mod horizontal;
pub mod order;

use std::{fmt, future::Future};

use arrow::record_batch::RecordBatch;

pub use self::{
    any::{AnyTabletWriter, TableMode, TabletWriterFactory, WriteTarget},
    error::TabletWriterError,
    horizontal::{GeneralTabletWriter, HorizontalTabletWriter, PrimaryKeyTabletWriter},
    order::{RowOrder, SortKeyOrder, TrustedOrder},
};
use crate::{id::TabletId, ondisk::segment::SegmentFile};

/// Lifecycle position of a tablet writer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriterState {
    Created,
    Opened,
    Finished,
    Failed,
    Closed,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriterState::Created => "created",
            WriterState::Opened => "opened",
            WriterState::Finished => "finished",
            WriterState::Failed => "failed",
            WriterState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Write path for one tablet within one writing session.
///
/// Calls are expected from a single driver, one at a time. Every method blocks
/// (awaits) until its observable effect satisfies the documented postcondition.
pub trait TabletWriter: Send {
    /// Tablet this writer is bound to. Valid in every state.
    fn tablet_id(&self) -> TabletId;

    /// Acquire the tablet's write slot and prepare the storage location.
    ///
    /// Must be called exactly once before anything else. After a failure only
    /// [`TabletWriter::close`] may be called.
    fn open(&mut self) -> impl Future<Output = Result<(), TabletWriterError>> + Send;

    /// Append the rows of `batch` to the current ordering domain.
    ///
    /// The batch is borrowed for the duration of the call only. The writer may
    /// keep a clone of it, which shares the Arrow buffers by reference count
    /// rather than copying them. Rows must already be ascending by the table's
    /// sort key.
    fn write(
        &mut self,
        batch: &RecordBatch,
    ) -> impl Future<Output = Result<(), TabletWriterError>> + Send;

    /// Materialize every buffered row into complete segment files and start a
    /// new ordering domain.
    fn flush(&mut self) -> impl Future<Output = Result<(), TabletWriterError>> + Send;

    /// Seal the writer: materialize remaining rows, then freeze the file list
    /// and the counters. Must be called at most once.
    fn finish(&mut self) -> impl Future<Output = Result<(), TabletWriterError>> + Send;

    /// Release every resource held by the writer.
    ///
    /// Runs exactly once on every terminal path; consuming `self` makes a second
    /// call impossible. Output is kept only if `finish` succeeded, otherwise all
    /// segments of the session are discarded. Cleanup failures are logged.
    fn close(self) -> impl Future<Output = ()> + Send;

    /// Segments produced across all flushes and the final seal, in production
    /// order. Only available after a successful `finish`.
    fn files(&self) -> Result<&[SegmentFile], TabletWriterError>;

    /// Sum of all segment sizes in bytes. Provisional until `finish` succeeds.
    fn data_size(&self) -> u64;

    /// Rows absorbed so far. Provisional until `finish` succeeds.
    fn num_rows(&self) -> u64;
}
