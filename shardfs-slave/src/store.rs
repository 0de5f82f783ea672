//! Flat shard store.
//!
//! Maps `(logical name, shard index)` to a single file `name.part<i>`
//! directly under the storage root. There is no index, no atomic
//! rename and no locking: a reader racing a writer on the same shard
//! name can observe a partial file. Concurrent writers interleave.

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::debug;

use shardfs_protocol::{codec, naming};

use crate::error::{SlaveError, SlaveResult};

/// Flat keyspace of shard files under one storage root.
#[derive(Debug, Clone)]
pub struct ShardStore {
    root: PathBuf,
}

impl ShardStore {
    /// Opens a store, creating the root directory if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> SlaveResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The storage root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Streams exactly `size` bytes from `reader` into the shard file,
    /// overwriting any previous shard of the same name and index.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or a name that would escape the
    /// root.
    pub async fn store_shard<R>(
        &self,
        name: &str,
        index: u32,
        size: u64,
        reader: &mut R,
    ) -> SlaveResult<()>
    where
        R: AsyncRead + Unpin,
    {
        let path = self.shard_path(&naming::part_file_name(name, index))?;
        let mut file = fs::File::create(&path).await?;
        codec::copy_exact(reader, &mut file, size).await?;
        file.flush().await?;
        debug!(shard = %path.display(), size, "stored shard");
        Ok(())
    }

    /// Opens a shard for reading, returning the file handle and its
    /// size.
    ///
    /// # Errors
    ///
    /// Returns [`SlaveError::ShardNotFound`] if the shard file does not
    /// exist.
    pub async fn open_shard(&self, name: &str, index: u32) -> SlaveResult<(fs::File, u64)> {
        let part_name = naming::part_file_name(name, index);
        let path = self.shard_path(&part_name)?;
        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SlaveError::ShardNotFound { name: part_name });
            }
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata().await?.len();
        Ok((file, size))
    }

    /// Lists every stored shard filename, suffix intact, in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be read.
    pub async fn list_shards(&self) -> SlaveResult<Vec<String>> {
        let mut names = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let raw = entry.file_name().to_string_lossy().into_owned();
            if naming::is_part_name(&raw) {
                names.push(raw);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Deletes a shard by its exact `.partN` filename.
    ///
    /// # Errors
    ///
    /// Returns [`SlaveError::ShardNotFound`] if no such file exists.
    pub async fn delete_shard(&self, full_part_name: &str) -> SlaveResult<()> {
        let path = self.shard_path(full_part_name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(shard = %path.display(), "deleted shard");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SlaveError::ShardNotFound {
                name: full_part_name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves a shard filename inside the root, rejecting names that
    /// traverse outside it.
    fn shard_path(&self, file_name: &str) -> SlaveResult<PathBuf> {
        if file_name.is_empty()
            || file_name.contains('/')
            || file_name.contains('\\')
            || file_name == ".."
        {
            return Err(SlaveError::InvalidName {
                name: file_name.to_string(),
            });
        }
        Ok(self.root.join(file_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn store() -> (tempfile::TempDir, ShardStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ShardStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn store_and_open_round_trip() {
        let (_dir, store) = store().await;
        let mut src = Cursor::new(b"ABCDE".to_vec());
        store.store_shard("data.bin", 1, 5, &mut src).await.unwrap();

        let (mut file, size) = store.open_shard("data.bin", 1).await.unwrap();
        assert_eq!(size, 5);
        let mut out = Vec::new();
        tokio::io::copy(&mut file, &mut out).await.unwrap();
        assert_eq!(out, b"ABCDE");
    }

    #[tokio::test]
    async fn store_overwrites_existing_shard() {
        let (_dir, store) = store().await;
        let mut first = Cursor::new(b"oldcontent".to_vec());
        store
            .store_shard("data.bin", 2, 10, &mut first)
            .await
            .unwrap();
        let mut second = Cursor::new(b"new".to_vec());
        store
            .store_shard("data.bin", 2, 3, &mut second)
            .await
            .unwrap();

        let (_, size) = store.open_shard("data.bin", 2).await.unwrap();
        assert_eq!(size, 3);
    }

    #[tokio::test]
    async fn missing_shard_is_not_found() {
        let (_dir, store) = store().await;
        let err = store.open_shard("ghost", 1).await.unwrap_err();
        assert!(matches!(err, SlaveError::ShardNotFound { .. }));
    }

    #[tokio::test]
    async fn list_returns_only_part_files_with_suffix() {
        let (_dir, store) = store().await;
        for (name, idx) in [("a.txt", 1), ("b.txt", 2)] {
            let mut src = Cursor::new(b"x".to_vec());
            store.store_shard(name, idx, 1, &mut src).await.unwrap();
        }
        // A stray non-shard file is ignored.
        tokio::fs::write(store.root().join("notes.md"), b"hi")
            .await
            .unwrap();

        let names = store.list_shards().await.unwrap();
        assert_eq!(names, vec!["a.txt.part1", "b.txt.part2"]);
    }

    #[tokio::test]
    async fn delete_by_exact_name() {
        let (_dir, store) = store().await;
        let mut src = Cursor::new(b"x".to_vec());
        store.store_shard("a.txt", 1, 1, &mut src).await.unwrap();

        store.delete_shard("a.txt.part1").await.unwrap();
        let err = store.delete_shard("a.txt.part1").await.unwrap_err();
        assert!(matches!(err, SlaveError::ShardNotFound { .. }));
    }

    #[tokio::test]
    async fn traversal_names_are_rejected() {
        let (_dir, store) = store().await;
        let err = store.delete_shard("../escape.part1").await.unwrap_err();
        assert!(matches!(err, SlaveError::InvalidName { .. }));
    }
}
