//! Parquet segment files.
//!
//! A segment is written under a temporary name and only renamed to its final
//! name once the parquet footer has been written, so a reader listing the data
//! directory never observes a partially written segment.

use std::{io, path::PathBuf, sync::Arc};

use arrow::{datatypes::SchemaRef, record_batch::RecordBatch};
use log::Level;
use parquet::{arrow::async_writer::AsyncArrowWriter, file::properties::WriterProperties};

use crate::{
    fs::{temp_file_name, FileProvider},
    logging::{tablet_log, LogContext},
    option::WriterOptions,
    writer::TabletWriterError,
};

/// Descriptor of a sealed, immutable segment file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentFile {
    path: String,
    size: u64,
    num_rows: u64,
}

impl SegmentFile {
    /// Path relative to the tablet-group root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Size of the sealed file in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }
}

/// In-progress segment backed by an [`AsyncArrowWriter`].
pub(crate) struct SegmentWriter<F: FileProvider> {
    fs: Arc<F>,
    relative: String,
    temp_path: PathBuf,
    final_path: PathBuf,
    writer: Option<AsyncArrowWriter<F::File>>,
    num_rows: u64,
}

impl<F: FileProvider> SegmentWriter<F> {
    pub(crate) async fn create(
        fs: Arc<F>,
        option: &WriterOptions,
        relative: String,
        schema: SchemaRef,
        properties: WriterProperties,
        log_ctx: LogContext,
    ) -> Result<Self, TabletWriterError> {
        let temp_path = option.segment_path(&temp_file_name(&relative));
        let final_path = option.segment_path(&relative);
        let file = fs.create(&temp_path).await?;
        let writer = match AsyncArrowWriter::try_new(file, schema, Some(properties)) {
            Ok(writer) => writer,
            Err(err) => {
                if let Err(remove_err) = fs.remove(&temp_path).await {
                    tablet_log!(
                        Level::Warn,
                        ctx: log_ctx,
                        "segment_cleanup_failed",
                        "path={} error={}",
                        relative,
                        remove_err
                    );
                }
                return Err(err.into());
            }
        };
        Ok(Self {
            fs,
            relative,
            temp_path,
            final_path,
            writer: Some(writer),
            num_rows: 0,
        })
    }

    pub(crate) fn relative_path(&self) -> &str {
        &self.relative
    }

    pub(crate) fn num_rows(&self) -> u64 {
        self.num_rows
    }

    /// Bytes already encoded into the file. Never more than the sealed size.
    pub(crate) fn encoded_size(&self) -> u64 {
        self.writer
            .as_ref()
            .map(|writer| writer.bytes_written() as u64)
            .unwrap_or(0)
    }

    /// Encoded bytes plus the uncompressed size of the open row group.
    pub(crate) fn estimated_size(&self) -> u64 {
        self.writer
            .as_ref()
            .map(|writer| (writer.bytes_written() + writer.in_progress_size()) as u64)
            .unwrap_or(0)
    }

    pub(crate) async fn write(&mut self, batch: &RecordBatch) -> Result<(), TabletWriterError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "segment writer already closed"))?;
        writer.write(batch).await?;
        self.num_rows += batch.num_rows() as u64;
        Ok(())
    }

    /// Write the footer, publish the segment under its final name and report its size.
    pub(crate) async fn seal(mut self, sync: bool) -> Result<SegmentFile, TabletWriterError> {
        let writer = self
            .writer
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "segment writer already closed"))?;
        writer.close().await?;
        self.fs.rename(&self.temp_path, &self.final_path).await?;
        if sync {
            self.fs.sync(&self.final_path).await?;
        }
        let size = self.fs.size(&self.final_path).await?;
        Ok(SegmentFile {
            path: self.relative.clone(),
            size,
            num_rows: self.num_rows,
        })
    }

    /// Discard the segment. Buffered rows are dropped and the temporary file removed.
    pub(crate) async fn abort(mut self) -> io::Result<()> {
        drop(self.writer.take());
        match self.fs.remove(&self.temp_path).await {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
            _ => Ok(()),
        }
    }
}
