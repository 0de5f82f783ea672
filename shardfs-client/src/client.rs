//! Client calls against the master's command set.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use shardfs_protocol::{codec, tree, ClientCommand, Node, STATUS_CONNECTED};

use crate::error::{ClientError, ClientResult};

/// One entry of a LIST reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Logical name, `.partN` suffixes already stripped by the master.
    pub name: String,
    /// Whether the master reports the entry as a file. Listings are
    /// derived from shard names, so this is always true today.
    pub is_file: bool,
}

/// Client handle for one master address.
///
/// Holds no connection; every call dials the master afresh.
#[derive(Debug, Clone)]
pub struct MasterClient {
    addr: String,
}

impl MasterClient {
    /// Creates a client for the master at `addr` (`host:port`).
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// CONNECT handshake; verifies the master answers `CONNECTE`.
    ///
    /// # Errors
    ///
    /// Returns an error if the master is unreachable or answers
    /// something else.
    pub async fn connect(&self) -> ClientResult<()> {
        let mut stream = self.dial().await?;
        codec::write_string(&mut stream, ClientCommand::Connect.as_str()).await?;
        stream.flush().await?;
        codec::expect_status(&mut stream, STATUS_CONNECTED).await?;
        Ok(())
    }

    /// Uploads a file or directory from the local filesystem.
    ///
    /// Files are sharded across the slaves by the master; directories
    /// go whole into the master's local storage. The master sends no
    /// reply for uploads.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is missing or the transfer fails.
    pub async fn upload_path(&self, path: &Path) -> ClientResult<()> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|_| ClientError::NoSuchPath {
                path: path.to_path_buf(),
            })?;

        if meta.is_dir() {
            let node = Node::from_path(path).await?;
            let mut stream = self.dial().await?;
            codec::write_string(&mut stream, ClientCommand::Upload.as_str()).await?;
            codec::write_bool(&mut stream, true).await?;
            tree::write_node(&mut stream, &node).await?;
            stream.flush().await?;
        } else {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let size = meta.len();
            let mut file = tokio::fs::File::open(path).await?;

            let mut stream = self.dial().await?;
            codec::write_string(&mut stream, ClientCommand::Upload.as_str()).await?;
            codec::write_bool(&mut stream, false).await?;
            codec::write_string(&mut stream, &name).await?;
            codec::write_i64(&mut stream, i64::try_from(size).unwrap_or(i64::MAX)).await?;
            codec::copy_exact(&mut file, &mut stream, size).await?;
            stream.flush().await?;
        }
        debug!(path = %path.display(), "upload sent");
        Ok(())
    }

    /// Uploads an in-memory payload under a logical name (sharded).
    ///
    /// # Errors
    ///
    /// Returns an error if the transfer fails.
    pub async fn upload_bytes(&self, name: &str, bytes: &[u8]) -> ClientResult<()> {
        let mut stream = self.dial().await?;
        codec::write_string(&mut stream, ClientCommand::Upload.as_str()).await?;
        codec::write_bool(&mut stream, false).await?;
        codec::write_string(&mut stream, name).await?;
        codec::write_i64(&mut stream, i64::try_from(bytes.len()).unwrap_or(i64::MAX)).await?;
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Lists logical names known to the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails.
    pub async fn list(&self) -> ClientResult<Vec<Listing>> {
        let mut stream = self.dial().await?;
        codec::write_string(&mut stream, ClientCommand::List.as_str()).await?;
        stream.flush().await?;

        let count = codec::read_count(&mut stream, "entry count").await?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = codec::read_string(&mut stream).await?;
            let is_file = codec::read_bool(&mut stream).await?;
            entries.push(Listing { name, is_file });
        }
        Ok(entries)
    }

    /// Downloads a sharded file into `dest_dir`, returning the written
    /// path.
    ///
    /// The master reassembles whatever shards are reachable; the
    /// result can be shorter than the original upload if slaves are
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the master answers an
    /// in-band `ERREUR` status.
    pub async fn download_file(&self, name: &str, dest_dir: &Path) -> ClientResult<PathBuf> {
        let mut stream = self.dial().await?;
        codec::write_string(&mut stream, ClientCommand::DownloadFile.as_str()).await?;
        codec::write_string(&mut stream, name).await?;
        stream.flush().await?;

        codec::expect_status(&mut stream, shardfs_protocol::STATUS_OK).await?;
        let reply_name = codec::read_string(&mut stream).await?;
        let size = codec::read_size(&mut stream, "file size").await?;

        // Keep only the base name; the server controls this field.
        let base = Path::new(&reply_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| reply_name.clone());
        let dest = dest_dir.join(base);
        let mut file = tokio::fs::File::create(&dest).await?;
        codec::copy_exact(&mut stream, &mut file, size).await?;
        file.flush().await?;
        debug!(name, size, dest = %dest.display(), "file downloaded");
        Ok(dest)
    }

    /// Downloads a directory tree into `dest_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or the master answers an
    /// in-band `ERREUR` status.
    pub async fn download_dir(&self, name: &str, dest_dir: &Path) -> ClientResult<()> {
        let mut stream = self.dial().await?;
        codec::write_string(&mut stream, ClientCommand::DownloadDir.as_str()).await?;
        codec::write_string(&mut stream, name).await?;
        stream.flush().await?;

        let node = tree::read_node_with_status(&mut stream, false).await?;
        node.materialize(dest_dir).await?;
        debug!(name, "directory downloaded");
        Ok(())
    }

    /// Downloads a name of unknown kind: LISTs first to discover
    /// whether it is a directory, then issues the matching download on
    /// a fresh connection. Unlisted names are assumed to be files.
    ///
    /// # Errors
    ///
    /// Returns an error if either exchange fails.
    pub async fn download(&self, name: &str, dest_dir: &Path) -> ClientResult<()> {
        let is_directory = self
            .list()
            .await?
            .into_iter()
            .find(|entry| entry.name == name)
            .is_some_and(|entry| !entry.is_file);

        if is_directory {
            self.download_dir(name, dest_dir).await
        } else {
            self.download_file(name, dest_dir).await.map(|_| ())
        }
    }

    /// Deletes a logical file's shards. Fire-and-forget: the master
    /// sends no reply and per-slave outcomes stay on the master's logs.
    ///
    /// # Errors
    ///
    /// Returns an error only if the request itself cannot be sent.
    pub async fn delete(&self, name: &str) -> ClientResult<()> {
        let mut stream = self.dial().await?;
        codec::write_string(&mut stream, ClientCommand::Delete.as_str()).await?;
        codec::write_string(&mut stream, name).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn dial(&self) -> ClientResult<TcpStream> {
        Ok(TcpStream::connect(&self.addr).await?)
    }
}
