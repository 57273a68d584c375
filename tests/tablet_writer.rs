use std::{fs::File, path::Path, sync::Arc};

use arrow::{
    array::{ArrayRef, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use futures::stream;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tablet_writer::{
    fs::{parse_segment_name, tokio::TokioFs},
    write_tablet, TabletId, TabletWriter, TabletWriterError, TabletWriterFactory, TxnId,
    WriteCommand, WriteTarget, WriterOptions, WriterState,
};
use tempfile::TempDir;

fn schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
    ]))
}

fn build_batch(schema: SchemaRef, ids: Vec<i64>) -> RecordBatch {
    let names: Vec<String> = ids.iter().map(|id| format!("row-{id}")).collect();
    let columns = vec![
        Arc::new(Int64Array::from(ids)) as ArrayRef,
        Arc::new(StringArray::from(names)) as ArrayRef,
    ];
    RecordBatch::try_new(schema, columns).expect("record batch")
}

fn read_ids(path: &Path) -> Vec<i64> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path).expect("open segment"))
        .expect("parquet reader")
        .build()
        .expect("build reader");
    let mut ids = Vec::new();
    for batch in reader {
        let batch = batch.expect("read batch");
        let column = batch
            .column(0)
            .as_any()
            .downcast_ref::<Int64Array>()
            .expect("id column");
        ids.extend(column.values().iter().copied());
    }
    ids
}

fn factory(root: &Path) -> TabletWriterFactory<TokioFs> {
    TabletWriterFactory::new(TokioFs, WriterOptions::from(root))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_batches_without_flush() {
    let temp_dir = TempDir::new().unwrap();
    let factory = factory(temp_dir.path());
    let schema = schema();
    let mut writer = factory
        .build(WriteTarget::new(TabletId::new(42), TxnId::new(1), 1, schema.clone()))
        .unwrap();
    assert_eq!(writer.tablet_id(), TabletId::new(42));

    writer.open().await.unwrap();
    writer
        .write(&build_batch(schema.clone(), vec![1, 2, 3]))
        .await
        .unwrap();
    writer
        .write(&build_batch(schema.clone(), vec![4, 5]))
        .await
        .unwrap();
    writer.finish().await.unwrap();

    assert_eq!(writer.num_rows(), 5);
    let files = writer.files().unwrap().to_vec();
    assert!(!files.is_empty());
    assert_eq!(
        writer.data_size(),
        files.iter().map(|file| file.size()).sum::<u64>()
    );

    let mut ids = Vec::new();
    for file in &files {
        let on_disk = std::fs::metadata(temp_dir.path().join(file.path()))
            .unwrap()
            .len();
        assert_eq!(file.size(), on_disk);
        assert_eq!(
            parse_segment_name(file.path()).map(|(txn, _)| txn),
            Some(TxnId::new(1))
        );
        ids.extend(read_ids(&temp_dir.path().join(file.path())));
    }
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);

    writer.close().await;
    assert!(!factory.slots().is_held(TabletId::new(42)));
    for file in &files {
        assert!(temp_dir.path().join(file.path()).exists());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn flush_produces_separate_segments() {
    let temp_dir = TempDir::new().unwrap();
    let factory = factory(temp_dir.path());
    let schema = schema();
    let mut writer = factory.general(TabletId::new(42), TxnId::new(2), schema.clone());

    writer.open().await.unwrap();
    writer
        .write(&build_batch(schema.clone(), vec![10, 11, 12]))
        .await
        .unwrap();
    writer.flush().await.unwrap();
    let flushed_size = writer.data_size();
    assert!(flushed_size > 0);

    writer
        .write(&build_batch(schema.clone(), vec![1, 2]))
        .await
        .unwrap();
    writer.finish().await.unwrap();

    let files = writer.files().unwrap();
    assert!(files.len() >= 2);
    assert_eq!(writer.num_rows(), 5);
    assert!(writer.data_size() > flushed_size);
    assert_eq!(
        writer.data_size(),
        files.iter().map(|file| file.size()).sum::<u64>()
    );

    // only the row multiset is defined across a flush boundary
    let mut ids: Vec<i64> = files
        .iter()
        .flat_map(|file| read_ids(&temp_dir.path().join(file.path())))
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 10, 11, 12]);
    assert_eq!(writer.metrics().flush_count, 1);
    writer.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn open_fails_when_tablet_is_locked() {
    let temp_dir = TempDir::new().unwrap();
    let factory = factory(temp_dir.path());
    let schema = schema();

    let mut holder = factory.general(TabletId::new(42), TxnId::new(3), schema.clone());
    holder.open().await.unwrap();

    let mut contender = factory.general(TabletId::new(42), TxnId::new(4), schema.clone());
    assert!(matches!(
        contender.open().await,
        Err(TabletWriterError::SlotUnavailable(tablet)) if tablet == TabletId::new(42)
    ));
    assert_eq!(contender.state(), WriterState::Failed);
    contender.close().await;
    assert!(factory.slots().is_held(TabletId::new(42)));

    holder.close().await;
    assert!(factory.slots().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn finish_freezes_counters() {
    let temp_dir = TempDir::new().unwrap();
    let factory = factory(temp_dir.path());
    let schema = schema();
    let mut writer = factory.general(TabletId::new(7), TxnId::new(5), schema.clone());

    writer.open().await.unwrap();
    writer
        .write(&build_batch(schema.clone(), (0..100).collect()))
        .await
        .unwrap();
    writer.finish().await.unwrap();
    let (rows, size) = (writer.num_rows(), writer.data_size());

    assert!(writer
        .write(&build_batch(schema.clone(), vec![100]))
        .await
        .is_err());
    assert!(writer.flush().await.is_err());
    assert_eq!((writer.num_rows(), writer.data_size()), (rows, size));
    assert_eq!(writer.state(), WriterState::Finished);
    writer.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn random_batches_keep_order_across_rollovers() {
    let temp_dir = TempDir::new().unwrap();
    let option = WriterOptions::from(temp_dir.path())
        .write_batch_rows(64)
        .max_rows_per_segment(150);
    let factory = TabletWriterFactory::new(TokioFs, option);
    let schema = schema();
    let writer = factory
        .build(
            WriteTarget::new(TabletId::new(9), TxnId::new(6), 2, schema.clone())
                .primary_key(vec![0]),
        )
        .unwrap();

    let mut rng = fastrand::Rng::with_seed(0x5eed);
    let mut commands = Vec::new();
    let mut next = 0i64;
    while next < 1000 {
        let len = rng.i64(0..40).min(1000 - next);
        commands.push(WriteCommand::Write(build_batch(
            schema.clone(),
            (next..next + len).collect(),
        )));
        next += len;
    }

    let outcome = write_tablet(writer, stream::iter(commands)).await.unwrap();
    assert_eq!(outcome.num_rows, 1000);
    assert!(outcome.files.len() >= 7);
    assert!(outcome.files.iter().all(|file| file.num_rows() <= 150));
    assert_eq!(
        outcome.data_size,
        outcome.files.iter().map(|file| file.size()).sum::<u64>()
    );

    let ids: Vec<i64> = outcome
        .files
        .iter()
        .flat_map(|file| read_ids(&temp_dir.path().join(file.path())))
        .collect();
    assert_eq!(ids, (0..1000).collect::<Vec<_>>());
    assert!(factory.slots().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn session_with_flushes_reports_every_segment() {
    let temp_dir = TempDir::new().unwrap();
    let factory = factory(temp_dir.path());
    let schema = schema();
    let writer = factory.general(TabletId::new(11), TxnId::new(8), schema.clone());

    let commands = vec![
        WriteCommand::Write(build_batch(schema.clone(), vec![1, 2])),
        WriteCommand::Flush,
        WriteCommand::Flush,
        WriteCommand::Write(build_batch(schema.clone(), vec![3])),
        WriteCommand::Flush,
        WriteCommand::Write(build_batch(schema.clone(), vec![4, 5, 6])),
    ];
    let outcome = write_tablet(writer, stream::iter(commands)).await.unwrap();
    assert_eq!(outcome.tablet_id, TabletId::new(11));
    assert_eq!(outcome.files.len(), 3);
    assert_eq!(outcome.num_rows, 6);

    let mut on_disk: Vec<String> = std::fs::read_dir(temp_dir.path().join("data"))
        .unwrap()
        .map(|entry| format!("data/{}", entry.unwrap().file_name().to_string_lossy()))
        .collect();
    on_disk.sort();
    let mut reported: Vec<String> = outcome
        .files
        .iter()
        .map(|file| file.path().to_string())
        .collect();
    reported.sort();
    assert_eq!(on_disk, reported);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_session_produces_no_files() {
    let temp_dir = TempDir::new().unwrap();
    let factory = factory(temp_dir.path());
    let schema = schema();
    let writer = factory.general(TabletId::new(12), TxnId::new(9), schema.clone());

    let commands = vec![
        WriteCommand::Write(RecordBatch::new_empty(schema.clone())),
        WriteCommand::Flush,
    ];
    let outcome = write_tablet(writer, stream::iter(commands)).await.unwrap();
    assert!(outcome.files.is_empty());
    assert_eq!(outcome.num_rows, 0);
    assert_eq!(outcome.data_size, 0);
}
