use std::{io, path::Path};

use tokio::fs::{create_dir_all, metadata, remove_file, rename, File, OpenOptions};

use super::FileProvider;

/// [`FileProvider`] backed by the local filesystem through `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFs;

impl FileProvider for TokioFs {
    type File = File;

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        create_dir_all(path).await
    }

    async fn create(&self, path: &Path) -> io::Result<Self::File> {
        OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        rename(from, to).await
    }

    async fn remove(&self, path: &Path) -> io::Result<()> {
        remove_file(path).await
    }

    async fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(metadata(path).await?.len())
    }

    async fn sync(&self, path: &Path) -> io::Result<()> {
        File::open(path).await?.sync_all().await
    }
}

#[cfg(test)]
impl TokioFs {
    pub(crate) async fn file_exist(path: impl AsRef<Path>) -> io::Result<bool> {
        match tokio::fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(err) => {
                if err.kind() == io::ErrorKind::NotFound {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }
}
