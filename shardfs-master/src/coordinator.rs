//! Shard coordinator: split, fan-out, fan-in, aggregate, delete.
//!
//! All fan-out is sequential, one fresh connection per slave per
//! operation. Per-slave failures are logged and skipped, never retried:
//! uploads silently drop the shard of an unreachable slave, downloads
//! silently omit unavailable shards, delete outcomes are logged but not
//! reported to the client. Best-effort by design; see DESIGN.md.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use shardfs_protocol::{codec, naming, STATUS_OK};

use crate::error::{MasterError, MasterResult};
use crate::registry::SlaveRegistry;
use crate::slave_link::SlaveLink;
use crate::split;

/// Coordinates sharded file operations across the slave registry.
#[derive(Debug, Clone)]
pub struct ShardCoordinator {
    registry: Arc<SlaveRegistry>,
    storage_root: PathBuf,
}

impl ShardCoordinator {
    /// Creates a coordinator over the given registry and local root.
    ///
    /// The root holds only per-download temporary shard buffers (and
    /// the unsharded directory trees, managed elsewhere).
    #[must_use]
    pub fn new(registry: Arc<SlaveRegistry>, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            storage_root: storage_root.into(),
        }
    }

    /// The registry this coordinator fans out to.
    #[must_use]
    pub fn registry(&self) -> &Arc<SlaveRegistry> {
        &self.registry
    }

    /// Splits an uploaded file across the slaves.
    ///
    /// The whole body is buffered in memory first, so memory use is
    /// bounded by the file size. Shard `i` goes to the slave at
    /// registry position `i`; a disconnected slave's shard is never
    /// transmitted.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be read off the client
    /// connection or the name is invalid. Slave-side failures are
    /// logged and skipped.
    pub async fn upload_file<R>(&self, name: &str, size: u64, reader: &mut R) -> MasterResult<()>
    where
        R: AsyncRead + Unpin,
    {
        validate_name(name)?;
        info!(name, size, "receiving file");
        let body = codec::read_payload(reader, size).await?;

        if self.registry.is_empty() {
            error!(name, "no slaves configured, upload dropped");
            return Ok(());
        }

        let ranges = split::shard_ranges(size, self.registry.len());
        for (i, (endpoint, range)) in self
            .registry
            .endpoints()
            .iter()
            .zip(ranges)
            .enumerate()
        {
            // Wire shard indices are 1-based.
            let index = u32::try_from(i).unwrap_or(u32::MAX) + 1;
            if !endpoint.is_connected() {
                warn!(slave = %endpoint.addr(), index, "slave not connected, shard skipped");
                continue;
            }

            // Safe casts: ranges are bounded by the buffered body length.
            #[allow(clippy::cast_possible_truncation)]
            let shard: Bytes = body.slice(range.start as usize..range.end as usize);

            if let Err(e) = send_shard(&endpoint.addr(), name, index, &shard).await {
                warn!(slave = %endpoint.addr(), index, error = %e, "shard upload failed");
            } else {
                debug!(slave = %endpoint.addr(), index, size = shard.len(), "shard sent");
            }
        }
        info!(name, "file distributed");
        Ok(())
    }

    /// Reassembles a file from its shards and streams it to the client.
    ///
    /// Each available shard is first staged in a temporary buffer file
    /// under the storage root, then the response (`OK`, name, summed
    /// size, bytes) is streamed in ascending shard-index order; each
    /// buffer is deleted right after it is sent, and all of them are
    /// deleted if the client connection breaks mid-reply. Missing
    /// shards are
    /// silently omitted, so the result can be shorter than the original.
    ///
    /// # Errors
    ///
    /// Returns an error if the client connection fails or the name is
    /// invalid. Slave-side failures are logged and treated as missing
    /// shards.
    pub async fn download_file<W>(&self, name: &str, client: &mut W) -> MasterResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        validate_name(name)?;
        let mut staged: Vec<PathBuf> = Vec::new();
        let mut total: u64 = 0;

        for (i, endpoint) in self.registry.endpoints().iter().enumerate() {
            let index = u32::try_from(i).unwrap_or(u32::MAX) + 1;
            if !endpoint.is_connected() {
                continue;
            }

            let buffer_path = self
                .storage_root
                .join(naming::part_file_name(name, index));
            match self.fetch_shard(endpoint.addr(), name, index, &buffer_path).await {
                Ok(Some(size)) => {
                    total += size;
                    staged.push(buffer_path);
                }
                Ok(None) => {
                    debug!(slave = %endpoint.addr(), index, "shard unavailable");
                }
                Err(e) => {
                    warn!(slave = %endpoint.addr(), index, error = %e, "shard fetch failed");
                }
            }
        }

        codec::write_string(client, STATUS_OK).await?;
        codec::write_string(client, name).await?;
        codec::write_i64(client, i64::try_from(total).unwrap_or(i64::MAX)).await?;

        for (pos, buffer_path) in staged.iter().enumerate() {
            let streamed: MasterResult<()> = async {
                let mut buffer = tokio::fs::File::open(buffer_path).await?;
                tokio::io::copy(&mut buffer, client).await?;
                Ok(())
            }
            .await;
            let _ = tokio::fs::remove_file(buffer_path).await;
            if let Err(e) = streamed {
                // The reply is already broken; drop the buffers that
                // were never sent instead of leaving them in the root.
                for leftover in &staged[pos + 1..] {
                    let _ = tokio::fs::remove_file(leftover).await;
                }
                return Err(e);
            }
        }
        client.flush().await?;
        info!(name, total, "file reassembled");
        Ok(())
    }

    /// Aggregates the slaves' shard listings into unique logical names,
    /// first-seen order, `.partN` suffixes stripped.
    ///
    /// Per-slave failures are logged and that slave's names are simply
    /// absent from the aggregate.
    pub async fn list_logical(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for endpoint in self.registry.endpoints() {
            if !endpoint.is_connected() {
                continue;
            }
            let raw_names = match slave_list(&endpoint.addr()).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(slave = %endpoint.addr(), error = %e, "list failed");
                    continue;
                }
            };
            for raw in raw_names {
                let logical = naming::logical_name(&raw).unwrap_or(&raw).to_string();
                if !names.contains(&logical) {
                    names.push(logical);
                }
            }
        }
        names
    }

    /// Fans out shard deletes for a logical name.
    ///
    /// Every registry position is attempted regardless of its liveness
    /// flag; connection failures and `ERREUR` replies are logged, and
    /// nothing is reported back to the client.
    pub async fn delete(&self, name: &str) {
        for (i, endpoint) in self.registry.endpoints().iter().enumerate() {
            let index = u32::try_from(i).unwrap_or(u32::MAX) + 1;
            let part_name = naming::part_file_name(name, index);
            let addr = endpoint.addr();

            let outcome = async {
                let mut link = SlaveLink::connect(&addr).await?;
                link.delete_part(&part_name).await
            }
            .await;

            match outcome {
                Ok(status) if status == STATUS_OK => {
                    info!(slave = %addr, shard = %part_name, "shard deleted");
                }
                Ok(status) => {
                    warn!(slave = %addr, shard = %part_name, %status, "shard delete refused");
                }
                Err(e) => {
                    warn!(slave = %addr, shard = %part_name, error = %e, "shard delete failed");
                }
            }
        }
    }

    /// Fetches one shard into a temporary buffer file.
    async fn fetch_shard(
        &self,
        addr: String,
        name: &str,
        index: u32,
        buffer_path: &Path,
    ) -> MasterResult<Option<u64>> {
        let mut link = SlaveLink::connect(&addr).await?;
        let mut buffer = tokio::fs::File::create(buffer_path).await?;
        let fetched = link.download_part_to(name, index, &mut buffer).await?;
        buffer.flush().await?;
        if fetched.is_none() {
            // Nothing arrived; drop the empty buffer file.
            drop(buffer);
            let _ = tokio::fs::remove_file(buffer_path).await;
        }
        Ok(fetched)
    }
}

async fn send_shard(addr: &str, name: &str, index: u32, bytes: &[u8]) -> MasterResult<()> {
    let mut link = SlaveLink::connect(addr).await?;
    link.upload_part(name, index, bytes).await
}

async fn slave_list(addr: &str) -> MasterResult<Vec<String>> {
    let mut link = SlaveLink::connect(addr).await?;
    link.list().await
}

/// Rejects client-supplied names that would escape the storage root.
pub(crate) fn validate_name(name: &str) -> MasterResult<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
        return Err(MasterError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation() {
        assert!(validate_name("film.mp4").is_ok());
        assert!(validate_name("dossier.tar.gz").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a\\b").is_err());
    }
}
