#[cfg(feature = "tokio")]
pub mod tokio;

use std::{
    fmt::{Display, Formatter},
    future::Future,
    io,
    path::Path,
    str::FromStr,
};

use ::tokio::io::AsyncWrite;

use crate::id::{FileId, TxnId};

/// Directory, relative to the tablet-group root, holding segment files.
pub(crate) const DATA_DIR: &str = "data";

/// Storage collaborator the tablet writer delegates physical IO to.
///
/// Implementations allocate files under the tablet-group root, accept
/// arbitrary bytes and finalize them durably. Errors propagate unchanged as
/// failures of the writer call that triggered them.
pub trait FileProvider: Send + Sync + 'static {
    type File: AsyncWrite + Unpin + Send + 'static;

    fn create_dir_all(&self, path: &Path) -> impl Future<Output = io::Result<()>> + Send;

    /// Create (or truncate) a file for writing.
    fn create(&self, path: &Path) -> impl Future<Output = io::Result<Self::File>> + Send;

    fn rename(&self, from: &Path, to: &Path) -> impl Future<Output = io::Result<()>> + Send;

    fn remove(&self, path: &Path) -> impl Future<Output = io::Result<()>> + Send;

    fn size(&self, path: &Path) -> impl Future<Output = io::Result<u64>> + Send;

    /// Flush file content and metadata to stable storage.
    fn sync(&self, path: &Path) -> impl Future<Output = io::Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Parquet,
    Temp,
}

impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FileType::Parquet => write!(f, "parquet"),
            FileType::Temp => write!(f, "tmp"),
        }
    }
}

/// Path of a sealed segment, relative to the tablet-group root.
pub(crate) fn segment_file_name(txn_id: TxnId, file_id: FileId) -> String {
    format!(
        "{}/{:016x}_{}.{}",
        DATA_DIR,
        txn_id.raw(),
        file_id,
        FileType::Parquet
    )
}

/// Path a segment is written under until it is sealed.
pub(crate) fn temp_file_name(segment: &str) -> String {
    format!("{}.{}", segment, FileType::Temp)
}

/// Split a segment file name (with or without the data directory) into its
/// transaction and file identifiers.
pub fn parse_segment_name(name: &str) -> Option<(TxnId, FileId)> {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    let stem = file_name.strip_suffix(&format!(".{}", FileType::Parquet))?;
    let (txn, file_id) = stem.split_once('_')?;
    let txn = u64::from_str_radix(txn, 16).ok()?;
    let file_id = FileId::from_str(file_id).ok()?;
    Some((TxnId::new(txn as i64), file_id))
}
