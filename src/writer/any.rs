use std::sync::Arc;

use arrow::{datatypes::SchemaRef, record_batch::RecordBatch};

use super::{
    horizontal::WriterResources, GeneralTabletWriter, HorizontalTabletWriter,
    PrimaryKeyTabletWriter, SortKeyOrder, TabletWriter, TabletWriterError, TrustedOrder,
};
use crate::{
    fs::FileProvider,
    id::{FileIdGenerator, TabletId, TxnId},
    metrics::WriterMetricsSnapshot,
    ondisk::segment::SegmentFile,
    option::WriterOptions,
    schema::{SchemaId, TabletSchemaMap},
    slot::TabletSlots,
};

/// How a table's data is maintained, which decides the writer strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TableMode {
    /// Rows are appended as-is; duplicates are resolved at read time.
    #[default]
    Append,
    /// Rows are keyed and merged on write; keys are verified ascending per domain.
    PrimaryKey,
}

/// Everything the driving layer knows about the tablet it wants to write.
#[derive(Clone, Debug)]
pub struct WriteTarget {
    pub tablet_id: TabletId,
    pub txn_id: TxnId,
    pub schema_id: SchemaId,
    pub schema: SchemaRef,
    pub mode: TableMode,
    /// Column indices forming the sort key; used by [`TableMode::PrimaryKey`].
    pub sort_key: Vec<usize>,
}

impl WriteTarget {
    pub fn new(tablet_id: TabletId, txn_id: TxnId, schema_id: SchemaId, schema: SchemaRef) -> Self {
        Self {
            tablet_id,
            txn_id,
            schema_id,
            schema,
            mode: TableMode::Append,
            sort_key: Vec::new(),
        }
    }

    /// Target a primary-key table sorted by the given columns.
    pub fn primary_key(self, sort_key: Vec<usize>) -> Self {
        Self {
            mode: TableMode::PrimaryKey,
            sort_key,
            ..self
        }
    }
}

/// A tablet writer of either strategy, chosen at runtime from the table mode.
#[derive(Debug)]
pub enum AnyTabletWriter<F: FileProvider> {
    General(GeneralTabletWriter<F>),
    PrimaryKey(PrimaryKeyTabletWriter<F>),
}

impl<F: FileProvider> AnyTabletWriter<F> {
    pub fn mode(&self) -> TableMode {
        match self {
            AnyTabletWriter::General(_) => TableMode::Append,
            AnyTabletWriter::PrimaryKey(_) => TableMode::PrimaryKey,
        }
    }

    pub fn metrics(&self) -> WriterMetricsSnapshot {
        match self {
            AnyTabletWriter::General(writer) => writer.metrics(),
            AnyTabletWriter::PrimaryKey(writer) => writer.metrics(),
        }
    }
}

impl<F: FileProvider> TabletWriter for AnyTabletWriter<F> {
    fn tablet_id(&self) -> TabletId {
        match self {
            AnyTabletWriter::General(writer) => writer.tablet_id(),
            AnyTabletWriter::PrimaryKey(writer) => writer.tablet_id(),
        }
    }

    async fn open(&mut self) -> Result<(), TabletWriterError> {
        match self {
            AnyTabletWriter::General(writer) => writer.open().await,
            AnyTabletWriter::PrimaryKey(writer) => writer.open().await,
        }
    }

    async fn write(&mut self, batch: &RecordBatch) -> Result<(), TabletWriterError> {
        match self {
            AnyTabletWriter::General(writer) => writer.write(batch).await,
            AnyTabletWriter::PrimaryKey(writer) => writer.write(batch).await,
        }
    }

    async fn flush(&mut self) -> Result<(), TabletWriterError> {
        match self {
            AnyTabletWriter::General(writer) => writer.flush().await,
            AnyTabletWriter::PrimaryKey(writer) => writer.flush().await,
        }
    }

    async fn finish(&mut self) -> Result<(), TabletWriterError> {
        match self {
            AnyTabletWriter::General(writer) => writer.finish().await,
            AnyTabletWriter::PrimaryKey(writer) => writer.finish().await,
        }
    }

    async fn close(self) {
        match self {
            AnyTabletWriter::General(writer) => writer.close().await,
            AnyTabletWriter::PrimaryKey(writer) => writer.close().await,
        }
    }

    fn files(&self) -> Result<&[SegmentFile], TabletWriterError> {
        match self {
            AnyTabletWriter::General(writer) => writer.files(),
            AnyTabletWriter::PrimaryKey(writer) => writer.files(),
        }
    }

    fn data_size(&self) -> u64 {
        match self {
            AnyTabletWriter::General(writer) => writer.data_size(),
            AnyTabletWriter::PrimaryKey(writer) => writer.data_size(),
        }
    }

    fn num_rows(&self) -> u64 {
        match self {
            AnyTabletWriter::General(writer) => writer.num_rows(),
            AnyTabletWriter::PrimaryKey(writer) => writer.num_rows(),
        }
    }
}

/// Builds tablet writers that share storage, configuration, write slots and
/// schemas.
pub struct TabletWriterFactory<F: FileProvider> {
    resources: WriterResources<F>,
    schemas: Arc<TabletSchemaMap>,
}

impl<F: FileProvider> TabletWriterFactory<F> {
    pub fn new(fs: F, option: WriterOptions) -> Self {
        Self::with_shared(
            Arc::new(fs),
            Arc::new(option),
            Arc::new(TabletSlots::new()),
            Arc::new(TabletSchemaMap::new()),
        )
    }

    /// Build a factory over collaborators shared with other factories.
    pub fn with_shared(
        fs: Arc<F>,
        option: Arc<WriterOptions>,
        slots: Arc<TabletSlots>,
        schemas: Arc<TabletSchemaMap>,
    ) -> Self {
        Self {
            resources: WriterResources {
                fs,
                option,
                slots,
                file_ids: Arc::new(FileIdGenerator::new()),
            },
            schemas,
        }
    }

    pub fn option(&self) -> &WriterOptions {
        &self.resources.option
    }

    pub fn slots(&self) -> &Arc<TabletSlots> {
        &self.resources.slots
    }

    pub fn schemas(&self) -> &Arc<TabletSchemaMap> {
        &self.schemas
    }

    /// Append-only writer for `tablet_id`.
    pub fn general(
        &self,
        tablet_id: TabletId,
        txn_id: TxnId,
        schema: SchemaRef,
    ) -> GeneralTabletWriter<F> {
        HorizontalTabletWriter::new(self.resources.clone(), tablet_id, txn_id, schema, TrustedOrder)
    }

    /// Merge-aware writer for `tablet_id` verifying order on `sort_key`.
    pub fn primary_key(
        &self,
        tablet_id: TabletId,
        txn_id: TxnId,
        schema: SchemaRef,
        sort_key: Vec<usize>,
    ) -> Result<PrimaryKeyTabletWriter<F>, TabletWriterError> {
        let order = SortKeyOrder::new(&schema, sort_key)?;
        Ok(HorizontalTabletWriter::new(
            self.resources.clone(),
            tablet_id,
            txn_id,
            schema,
            order,
        ))
    }

    /// Pick the strategy matching the target's table mode.
    pub fn build(&self, target: WriteTarget) -> Result<AnyTabletWriter<F>, TabletWriterError> {
        let (schema, _) = self.schemas.emplace(target.schema_id, target.schema);
        match target.mode {
            TableMode::Append => Ok(AnyTabletWriter::General(self.general(
                target.tablet_id,
                target.txn_id,
                schema,
            ))),
            TableMode::PrimaryKey => Ok(AnyTabletWriter::PrimaryKey(self.primary_key(
                target.tablet_id,
                target.txn_id,
                schema,
                target.sort_key,
            )?)),
        }
    }
}

impl<F: FileProvider> std::fmt::Debug for TabletWriterFactory<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabletWriterFactory")
            .field("option", &self.resources.option)
            .field("slots", &self.resources.slots)
            .finish()
    }
}
