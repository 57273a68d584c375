//! Horizontal (row-range) tablet writer.
//!
//! Incoming batches are coalesced in memory, then streamed into the active
//! parquet segment. A segment is sealed when it reaches the configured row or
//! byte bound, on `flush` and on `finish`; sealed segments are listed in the
//! order they were produced, so inside one ordering domain reading the files
//! in `files()` order yields the rows in write order.

use std::{fmt, io, mem, sync::Arc, time::Instant};

use arrow::{compute::concat_batches, datatypes::SchemaRef, record_batch::RecordBatch};
use log::Level;
use parquet::file::properties::WriterProperties;

use super::{
    order::{RowOrder, SortKeyOrder, TrustedOrder},
    TabletWriter, TabletWriterError, WriterState,
};
use crate::{
    fs::{segment_file_name, temp_file_name, FileProvider},
    id::{FileIdGenerator, TabletId, TxnId},
    logging::{tablet_log, LogContext},
    metrics::{WriterMetrics, WriterMetricsSnapshot},
    ondisk::segment::{SegmentFile, SegmentWriter},
    option::WriterOptions,
    slot::{TabletSlots, WriteSlot},
};

/// Append-only writer: rows are trusted to arrive sorted.
pub type GeneralTabletWriter<F> = HorizontalTabletWriter<F, TrustedOrder>;

/// Merge-aware writer: keys are verified ascending per domain.
pub type PrimaryKeyTabletWriter<F> = HorizontalTabletWriter<F, SortKeyOrder>;

/// Collaborators shared by every writer built from one factory.
pub(crate) struct WriterResources<F> {
    pub(crate) fs: Arc<F>,
    pub(crate) option: Arc<WriterOptions>,
    pub(crate) slots: Arc<TabletSlots>,
    pub(crate) file_ids: Arc<FileIdGenerator>,
}

impl<F> Clone for WriterResources<F> {
    fn clone(&self) -> Self {
        Self {
            fs: Arc::clone(&self.fs),
            option: Arc::clone(&self.option),
            slots: Arc::clone(&self.slots),
            file_ids: Arc::clone(&self.file_ids),
        }
    }
}

pub struct HorizontalTabletWriter<F: FileProvider, O: RowOrder> {
    tablet_id: TabletId,
    txn_id: TxnId,
    resources: WriterResources<F>,
    schema: SchemaRef,
    properties: WriterProperties,
    order: O,
    log_ctx: LogContext,
    state: WriterState,
    slot: Option<WriteSlot>,
    pending: Vec<RecordBatch>,
    pending_rows: usize,
    active: Option<SegmentWriter<F>>,
    sealed: Vec<SegmentFile>,
    // segments whose seal failed half way; they may exist under either name
    orphans: Vec<String>,
    sealed_bytes: u64,
    num_rows: u64,
    metrics: WriterMetrics,
}

impl<F: FileProvider, O: RowOrder> HorizontalTabletWriter<F, O> {
    pub(crate) fn new(
        resources: WriterResources<F>,
        tablet_id: TabletId,
        txn_id: TxnId,
        schema: SchemaRef,
        order: O,
    ) -> Self {
        let properties = resources.option.writer_properties();
        Self {
            tablet_id,
            txn_id,
            resources,
            schema,
            properties,
            order,
            log_ctx: LogContext::new(tablet_id, txn_id),
            state: WriterState::Created,
            slot: None,
            pending: Vec::new(),
            pending_rows: 0,
            active: None,
            sealed: Vec::new(),
            orphans: Vec::new(),
            sealed_bytes: 0,
            num_rows: 0,
            metrics: WriterMetrics::default(),
        }
    }

    pub fn txn_id(&self) -> TxnId {
        self.txn_id
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn metrics(&self) -> WriterMetricsSnapshot {
        self.metrics.snapshot()
    }

    fn expect_state(
        &self,
        op: &'static str,
        expected: WriterState,
    ) -> Result<(), TabletWriterError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(TabletWriterError::InvalidState {
                op,
                state: self.state,
            })
        }
    }

    /// Any failure past the state check leaves the writer closeable only.
    fn settle(
        &mut self,
        op: &'static str,
        result: Result<(), TabletWriterError>,
    ) -> Result<(), TabletWriterError> {
        if let Err(err) = &result {
            self.state = WriterState::Failed;
            tablet_log!(
                Level::Warn,
                ctx: self.log_ctx,
                "tablet_writer_failed",
                "op={} error={}",
                op,
                err
            );
        }
        result
    }

    async fn acquire(&mut self) -> Result<(), TabletWriterError> {
        let slot = self
            .resources
            .slots
            .try_acquire(self.tablet_id)
            .ok_or(TabletWriterError::SlotUnavailable(self.tablet_id))?;
        self.slot = Some(slot);
        self.resources
            .fs
            .create_dir_all(&self.resources.option.data_dir())
            .await?;
        Ok(())
    }

    async fn absorb(&mut self, batch: &RecordBatch) -> Result<(), TabletWriterError> {
        if batch.schema().fields() != self.schema.fields() {
            return Err(TabletWriterError::SchemaMismatch(self.tablet_id));
        }
        let rows = batch.num_rows();
        if rows == 0 {
            return Ok(());
        }
        self.order.check(batch)?;

        self.pending.push(batch.clone());
        self.pending_rows += rows;
        self.num_rows += rows as u64;
        self.metrics.record_rows(rows as u64);

        if self.pending_rows >= self.resources.option.write_batch_rows {
            self.spill().await?;
        }
        Ok(())
    }

    /// Move every pending row into segments, rolling over at the size bounds.
    async fn spill(&mut self) -> Result<(), TabletWriterError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batches = mem::take(&mut self.pending);
        self.pending_rows = 0;
        let merged = if let [single] = batches.as_slice() {
            single.clone()
        } else {
            concat_batches(&self.schema, &batches)?
        };

        let max_rows = self.resources.option.max_rows_per_segment as u64;
        let max_size = self.resources.option.max_segment_size as u64;
        let mut offset = 0;
        while offset < merged.num_rows() {
            let mut segment = match self.active.take() {
                Some(segment) => segment,
                None => self.new_segment().await?,
            };
            let room = (max_rows - segment.num_rows()) as usize;
            let len = room.min(merged.num_rows() - offset);
            if let Err(err) = segment.write(&merged.slice(offset, len)).await {
                self.active = Some(segment);
                return Err(err);
            }
            offset += len;

            if segment.num_rows() >= max_rows || segment.estimated_size() >= max_size {
                self.seal_segment(segment).await?;
            } else {
                self.active = Some(segment);
            }
        }
        Ok(())
    }

    async fn new_segment(&mut self) -> Result<SegmentWriter<F>, TabletWriterError> {
        let file_id = self.resources.file_ids.generate()?;
        let relative = segment_file_name(self.txn_id, file_id);
        let segment = SegmentWriter::create(
            Arc::clone(&self.resources.fs),
            &self.resources.option,
            relative,
            Arc::clone(&self.schema),
            self.properties.clone(),
            self.log_ctx,
        )
        .await?;
        tablet_log!(
            Level::Debug,
            ctx: self.log_ctx,
            "segment_started",
            "path={}",
            segment.relative_path()
        );
        Ok(segment)
    }

    async fn seal_segment(&mut self, segment: SegmentWriter<F>) -> Result<(), TabletWriterError> {
        let relative = segment.relative_path().to_string();
        let started = Instant::now();
        match segment.seal(self.resources.option.sync_on_seal).await {
            Ok(file) => {
                self.sealed_bytes += file.size();
                self.metrics.record_seal(file.size(), started.elapsed());
                tablet_log!(
                    Level::Debug,
                    ctx: self.log_ctx,
                    "segment_sealed",
                    "path={} rows={} bytes={}",
                    file.path(),
                    file.num_rows(),
                    file.size()
                );
                self.sealed.push(file);
                Ok(())
            }
            Err(err) => {
                self.orphans.push(relative);
                Err(err)
            }
        }
    }

    /// Spill pending rows and seal the active segment.
    async fn materialize(&mut self) -> Result<(), TabletWriterError> {
        self.spill().await?;
        if let Some(segment) = self.active.take() {
            self.seal_segment(segment).await?;
        }
        Ok(())
    }

    /// Remove every artifact of an unfinished session.
    async fn discard(&mut self) {
        self.pending.clear();
        self.pending_rows = 0;
        if let Some(segment) = self.active.take() {
            let relative = segment.relative_path().to_string();
            if let Err(err) = segment.abort().await {
                tablet_log!(
                    Level::Warn,
                    ctx: self.log_ctx,
                    "segment_cleanup_failed",
                    "path={} error={}",
                    relative,
                    err
                );
            }
        }
        let fs = self.resources.fs.as_ref();
        let option = self.resources.option.as_ref();
        for file in mem::take(&mut self.sealed) {
            remove_quietly(fs, option, self.log_ctx, file.path()).await;
        }
        for orphan in mem::take(&mut self.orphans) {
            remove_quietly(fs, option, self.log_ctx, &temp_file_name(&orphan)).await;
            remove_quietly(fs, option, self.log_ctx, &orphan).await;
        }
    }
}

async fn remove_quietly<F: FileProvider>(
    fs: &F,
    option: &WriterOptions,
    log_ctx: LogContext,
    relative: &str,
) {
    match fs.remove(&option.segment_path(relative)).await {
        Err(err) if err.kind() != io::ErrorKind::NotFound => {
            tablet_log!(
                Level::Warn,
                ctx: log_ctx,
                "segment_cleanup_failed",
                "path={} error={}",
                relative,
                err
            );
        }
        _ => {}
    }
}

impl<F: FileProvider, O: RowOrder> TabletWriter for HorizontalTabletWriter<F, O> {
    fn tablet_id(&self) -> TabletId {
        self.tablet_id
    }

    async fn open(&mut self) -> Result<(), TabletWriterError> {
        self.expect_state("open", WriterState::Created)?;
        let result = self.acquire().await;
        self.settle("open", result)?;
        self.state = WriterState::Opened;
        tablet_log!(Level::Debug, ctx: self.log_ctx, "tablet_writer_opened", "");
        Ok(())
    }

    async fn write(&mut self, batch: &RecordBatch) -> Result<(), TabletWriterError> {
        self.expect_state("write", WriterState::Opened)?;
        let result = self.absorb(batch).await;
        self.settle("write", result)
    }

    async fn flush(&mut self) -> Result<(), TabletWriterError> {
        self.expect_state("flush", WriterState::Opened)?;
        let result = self.materialize().await;
        self.settle("flush", result)?;
        self.order.reset();
        self.metrics.record_flush();
        tablet_log!(
            Level::Debug,
            ctx: self.log_ctx,
            "tablet_writer_flushed",
            "segments={}",
            self.sealed.len()
        );
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), TabletWriterError> {
        self.expect_state("finish", WriterState::Opened)?;
        let result = self.materialize().await;
        self.settle("finish", result)?;
        self.state = WriterState::Finished;
        tablet_log!(
            Level::Info,
            ctx: self.log_ctx,
            "tablet_writer_finished",
            "segments={} rows={} bytes={}",
            self.sealed.len(),
            self.num_rows,
            self.sealed_bytes
        );
        Ok(())
    }

    async fn close(mut self) {
        let state = self.state;
        if state != WriterState::Finished {
            self.discard().await;
        }
        drop(self.slot.take());
        self.state = WriterState::Closed;
        tablet_log!(
            Level::Debug,
            ctx: self.log_ctx,
            "tablet_writer_closed",
            "from={} kept_segments={}",
            state,
            self.sealed.len()
        );
    }

    fn files(&self) -> Result<&[SegmentFile], TabletWriterError> {
        self.expect_state("files", WriterState::Finished)?;
        Ok(&self.sealed)
    }

    fn data_size(&self) -> u64 {
        self.sealed_bytes
            + self
                .active
                .as_ref()
                .map(SegmentWriter::encoded_size)
                .unwrap_or(0)
    }

    fn num_rows(&self) -> u64 {
        self.num_rows
    }
}

impl<F: FileProvider, O: RowOrder> Drop for HorizontalTabletWriter<F, O> {
    fn drop(&mut self) {
        if !matches!(self.state, WriterState::Created | WriterState::Closed) {
            tablet_log!(
                Level::Warn,
                ctx: self.log_ctx,
                "tablet_writer_dropped",
                "state={} dropped without close, segments may be left behind",
                self.state
            );
        }
    }
}

impl<F: FileProvider, O: RowOrder> fmt::Debug for HorizontalTabletWriter<F, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HorizontalTabletWriter")
            .field("tablet_id", &self.tablet_id)
            .field("txn_id", &self.txn_id)
            .field("state", &self.state)
            .field("pending_rows", &self.pending_rows)
            .field("sealed", &self.sealed.len())
            .field("num_rows", &self.num_rows)
            .finish()
    }
}
