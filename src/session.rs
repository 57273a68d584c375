//! Scoped driving of a tablet writer.
//!
//! [`write_tablet`] runs the whole `open → write/flush* → finish` sequence and
//! closes the writer on every exit path, so callers cannot forget the teardown
//! the writer contract requires.

use arrow::record_batch::RecordBatch;
use futures_util::{Stream, StreamExt};

use crate::{
    id::TabletId,
    ondisk::segment::SegmentFile,
    writer::{TabletWriter, TabletWriterError},
};

/// One step of a writing session.
#[derive(Debug, Clone)]
pub enum WriteCommand {
    Write(RecordBatch),
    Flush,
}

/// What a successful session produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabletWriteOutcome {
    pub tablet_id: TabletId,
    /// Segments in production order, paths relative to the tablet-group root.
    pub files: Vec<SegmentFile>,
    pub data_size: u64,
    pub num_rows: u64,
}

/// Drive `writer` through `commands` and always close it.
///
/// On success the sealed segments are kept and described by the returned
/// outcome; on failure the writer is closed, which discards its output, and
/// the first error is returned.
pub async fn write_tablet<W, S>(
    mut writer: W,
    commands: S,
) -> Result<TabletWriteOutcome, TabletWriterError>
where
    W: TabletWriter,
    S: Stream<Item = WriteCommand> + Unpin,
{
    let result = drive(&mut writer, commands).await;
    writer.close().await;
    result
}

async fn drive<W, S>(
    writer: &mut W,
    mut commands: S,
) -> Result<TabletWriteOutcome, TabletWriterError>
where
    W: TabletWriter,
    S: Stream<Item = WriteCommand> + Unpin,
{
    writer.open().await?;
    while let Some(command) = commands.next().await {
        match command {
            WriteCommand::Write(batch) => writer.write(&batch).await?,
            WriteCommand::Flush => writer.flush().await?,
        }
    }
    writer.finish().await?;
    Ok(TabletWriteOutcome {
        tablet_id: writer.tablet_id(),
        files: writer.files()?.to_vec(),
        data_size: writer.data_size(),
        num_rows: writer.num_rows(),
    })
}
