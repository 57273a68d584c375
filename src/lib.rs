//! Write path of a tablet-oriented storage engine.
//!
//! A [`TabletWriter`] accepts sorted Arrow batches destined for one tablet,
//! persists them as immutable parquet segment files under the tablet-group
//! root and reports the produced files together with row and byte accounting.
//!
//! ```no_run
//! # use arrow::record_batch::RecordBatch;
//! # use tablet_writer::TabletWriterError;
//! # async fn demo(batch: RecordBatch) -> Result<(), TabletWriterError> {
//! use futures_util::stream;
//! use tablet_writer::{
//!     fs::tokio::TokioFs, write_tablet, TabletId, TabletWriterFactory, TxnId, WriteCommand,
//!     WriteTarget, WriterOptions,
//! };
//!
//! let factory = TabletWriterFactory::new(TokioFs, WriterOptions::from("/data/tablet_group"));
//! let target = WriteTarget::new(TabletId::new(42), TxnId::new(7), 1, batch.schema());
//! let writer = factory.build(target)?;
//! let outcome = write_tablet(writer, stream::iter(vec![WriteCommand::Write(batch)])).await?;
//! assert_eq!(outcome.num_rows, outcome.files.iter().map(|f| f.num_rows()).sum::<u64>());
//! # Ok(())
//! # }
//! ```

mod logging;

/// Storage collaborator abstraction and segment naming.
pub mod fs;
/// Tablet, transaction and file identifiers.
pub mod id;
pub mod metrics;
pub mod ondisk;
pub mod option;
pub mod schema;
pub mod session;
pub mod slot;
pub mod writer;

#[cfg(test)]
mod test_util;

pub use crate::{
    id::{FileId, TabletId, TxnId},
    metrics::WriterMetricsSnapshot,
    ondisk::segment::SegmentFile,
    option::{SegmentCompression, WriterOptions},
    schema::{SchemaId, TabletSchemaMap},
    session::{write_tablet, TabletWriteOutcome, WriteCommand},
    slot::{TabletSlots, WriteSlot},
    writer::{
        AnyTabletWriter, GeneralTabletWriter, PrimaryKeyTabletWriter, TableMode, TabletWriter,
        TabletWriterError, TabletWriterFactory, WriteTarget, WriterState,
    },
};
