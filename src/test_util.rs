//! Test-only helpers for building Arrow batches and injecting storage faults.

use std::{
    io,
    ops::Range,
    path::Path,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use arrow::{
    array::{ArrayRef, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use tokio::io::AsyncWrite;

use crate::fs::{tokio::TokioFs, FileProvider};

pub(crate) fn int_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("k", DataType::Int64, false),
        Field::new("v", DataType::Utf8, true),
    ]))
}

/// Batch whose key column holds `keys` in order and whose value column echoes them.
pub(crate) fn int_batch(keys: Range<i64>) -> RecordBatch {
    keys_batch(keys.collect())
}

pub(crate) fn keys_batch(keys: Vec<i64>) -> RecordBatch {
    let values: Vec<String> = keys.iter().map(|key| format!("v{key}")).collect();
    RecordBatch::try_new(
        int_schema(),
        vec![
            Arc::new(Int64Array::from(keys)) as ArrayRef,
            Arc::new(StringArray::from(values)) as ArrayRef,
        ],
    )
    .expect("valid batch")
}

/// Switches that make [`FaultyFs`] reject specific operations.
#[derive(Debug, Default)]
pub(crate) struct Faults {
    pub(crate) create_dir: AtomicBool,
    pub(crate) create: AtomicBool,
    pub(crate) write: AtomicBool,
    pub(crate) rename: AtomicBool,
}

impl Faults {
    pub(crate) fn fail_create_dir(&self) {
        self.create_dir.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_create(&self) {
        self.create.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_write(&self) {
        self.write.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_rename(&self) {
        self.rename.store(true, Ordering::SeqCst);
    }
}

fn injected(op: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("injected {op} failure"))
}

/// Local filesystem wrapper with switchable failures.
#[derive(Debug, Default)]
pub(crate) struct FaultyFs {
    pub(crate) faults: Arc<Faults>,
}

pub(crate) struct FaultyFile {
    inner: tokio::fs::File,
    faults: Arc<Faults>,
}

impl AsyncWrite for FaultyFile {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.faults.write.load(Ordering::SeqCst) {
            return Poll::Ready(Err(injected("write")));
        }
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

impl FileProvider for FaultyFs {
    type File = FaultyFile;

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        if self.faults.create_dir.load(Ordering::SeqCst) {
            return Err(injected("create_dir"));
        }
        TokioFs.create_dir_all(path).await
    }

    async fn create(&self, path: &Path) -> io::Result<Self::File> {
        if self.faults.create.load(Ordering::SeqCst) {
            return Err(injected("create"));
        }
        Ok(FaultyFile {
            inner: TokioFs.create(path).await?,
            faults: Arc::clone(&self.faults),
        })
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.faults.rename.load(Ordering::SeqCst) {
            return Err(injected("rename"));
        }
        TokioFs.rename(from, to).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        TokioFs.remove(path).await
    }

    async fn size(&self, path: &Path) -> io::Result<u64> {
        TokioFs.size(path).await
    }

    async fn sync(&self, path: &Path) -> io::Result<()> {
        TokioFs.sync(path).await
    }
}

/// Files (relative to `root`) currently present in the data directory, sorted.
pub(crate) fn list_data_dir(root: &Path) -> Vec<String> {
    let data_dir = root.join(crate::fs::DATA_DIR);
    let Ok(entries) = std::fs::read_dir(data_dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|entry| {
            format!(
                "{}/{}",
                crate::fs::DATA_DIR,
                entry.expect("dir entry").file_name().to_string_lossy()
            )
        })
        .collect();
    names.sort();
    names
}

/// Read back every key of a segment, in file order.
pub(crate) fn read_keys(path: &Path) -> Vec<i64> {
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    let file = std::fs::File::open(path).expect("open segment");
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .expect("parquet reader")
        .build()
        .expect("build reader");
    let mut keys = Vec::new();
    for batch in reader {
        let batch = batch.expect("read batch");
        let column = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("int64 key column");
        keys.extend(column.values().iter().copied());
    }
    keys
}
