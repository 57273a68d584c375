use std::path::{Path, PathBuf};

use parquet::{
    basic::{Compression, ZstdLevel},
    file::properties::WriterProperties,
};

use crate::fs::DATA_DIR;

/// Compression choices applied when no explicit parquet properties are set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SegmentCompression {
    /// Leave pages uncompressed (useful for tests and debugging).
    None,
    /// Apply Zstd compression with default tuning.
    #[default]
    Zstd,
}

/// Configuration shared by every writer built from one factory.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub(crate) root: PathBuf,
    pub(crate) write_batch_rows: usize,
    pub(crate) max_rows_per_segment: usize,
    pub(crate) max_segment_size: usize,
    pub(crate) compression: SegmentCompression,
    pub(crate) write_parquet_option: Option<WriterProperties>,
    pub(crate) sync_on_seal: bool,
}

impl<P> From<P> for WriterOptions
where
    P: Into<PathBuf>,
{
    fn from(root: P) -> Self {
        WriterOptions {
            root: root.into(),
            write_batch_rows: 4096,
            max_rows_per_segment: 1024 * 1024,
            max_segment_size: 512 * 1024 * 1024,
            compression: SegmentCompression::default(),
            write_parquet_option: None,
            sync_on_seal: true,
        }
    }
}

impl WriterOptions {
    /// Tablet-group root every reported segment path is relative to.
    pub fn root(self, root: impl Into<PathBuf>) -> Self {
        WriterOptions {
            root: root.into(),
            ..self
        }
    }

    /// Rows coalesced in memory before they are handed to the active segment.
    pub fn write_batch_rows(self, write_batch_rows: usize) -> Self {
        WriterOptions {
            write_batch_rows: write_batch_rows.max(1),
            ..self
        }
    }

    pub fn max_rows_per_segment(self, max_rows_per_segment: usize) -> Self {
        WriterOptions {
            max_rows_per_segment: max_rows_per_segment.max(1),
            ..self
        }
    }

    pub fn max_segment_size(self, max_segment_size: usize) -> Self {
        WriterOptions {
            max_segment_size: max_segment_size.max(1),
            ..self
        }
    }

    pub fn compression(self, compression: SegmentCompression) -> Self {
        WriterOptions {
            compression,
            ..self
        }
    }

    /// Explicit parquet properties; takes precedence over [`Self::compression`].
    pub fn write_parquet_option(self, write_parquet_option: WriterProperties) -> Self {
        WriterOptions {
            write_parquet_option: Some(write_parquet_option),
            ..self
        }
    }

    /// Fsync every segment once it has been sealed.
    pub fn sync_on_seal(self, sync_on_seal: bool) -> Self {
        WriterOptions {
            sync_on_seal,
            ..self
        }
    }
}

impl WriterOptions {
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub(crate) fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// Resolve a path relative to the tablet-group root.
    pub fn segment_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub(crate) fn writer_properties(&self) -> WriterProperties {
        if let Some(properties) = &self.write_parquet_option {
            return properties.clone();
        }
        let builder = match self.compression {
            SegmentCompression::None => {
                WriterProperties::builder().set_compression(Compression::UNCOMPRESSED)
            }
            SegmentCompression::Zstd => {
                WriterProperties::builder().set_compression(Compression::ZSTD(ZstdLevel::default()))
            }
        };
        builder.build()
    }
}
