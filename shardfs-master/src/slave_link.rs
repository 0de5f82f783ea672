//! Single-purpose connection from the master to one slave.
//!
//! The fan-out model is one fresh connection per shard operation:
//! connect, send one command, read the reply, drop. Connections are
//! never pooled or reused.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

use shardfs_protocol::{codec, SlaveCommand, STATUS_CONNECTED, STATUS_OK, STATUS_SHARD_MISSING};

use crate::error::{MasterError, MasterResult};

/// A connected, single-use link to one slave.
pub struct SlaveLink {
    stream: TcpStream,
}

impl SlaveLink {
    /// Opens a TCP connection to a slave.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(addr: &str) -> MasterResult<Self> {
        let stream = TcpStream::connect(addr).await?;
        trace!(%addr, "slave link opened");
        Ok(Self { stream })
    }

    /// CONNECT handshake; expects `CONNECTE`.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or an unexpected reply.
    pub async fn handshake(&mut self) -> MasterResult<()> {
        codec::write_string(&mut self.stream, SlaveCommand::Connect.as_str()).await?;
        self.stream.flush().await?;
        codec::expect_status(&mut self.stream, STATUS_CONNECTED).await?;
        Ok(())
    }

    /// UPLOAD_PART: sends one shard. The slave gives no reply.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub async fn upload_part(&mut self, name: &str, index: u32, bytes: &[u8]) -> MasterResult<()> {
        codec::write_string(&mut self.stream, SlaveCommand::UploadPart.as_str()).await?;
        codec::write_string(&mut self.stream, name).await?;
        codec::write_i32(&mut self.stream, i32::try_from(index).unwrap_or(i32::MAX)).await?;
        codec::write_i64(&mut self.stream, i64::try_from(bytes.len()).unwrap_or(i64::MAX)).await?;
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// DOWNLOAD_PART: streams the shard into `writer`.
    ///
    /// Returns `Ok(None)` when the slave answered `ERROR` (shard
    /// absent), `Ok(Some(size))` on success.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or an unexpected status.
    pub async fn download_part_to<W>(
        &mut self,
        name: &str,
        index: u32,
        writer: &mut W,
    ) -> MasterResult<Option<u64>>
    where
        W: AsyncWrite + Unpin,
    {
        codec::write_string(&mut self.stream, SlaveCommand::DownloadPart.as_str()).await?;
        codec::write_string(&mut self.stream, name).await?;
        codec::write_i32(&mut self.stream, i32::try_from(index).unwrap_or(i32::MAX)).await?;
        self.stream.flush().await?;

        let status = codec::read_string(&mut self.stream).await?;
        if status == STATUS_SHARD_MISSING {
            return Ok(None);
        }
        if status != STATUS_OK {
            return Err(MasterError::Protocol(
                shardfs_protocol::ProtocolError::UnexpectedStatus {
                    expected: STATUS_OK,
                    got: status,
                },
            ));
        }

        let size = codec::read_size(&mut self.stream, "part size").await?;
        codec::copy_exact(&mut self.stream, writer, size).await?;
        Ok(Some(size))
    }

    /// LIST: raw shard filenames stored on the slave.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or malformed fields.
    pub async fn list(&mut self) -> MasterResult<Vec<String>> {
        codec::write_string(&mut self.stream, SlaveCommand::List.as_str()).await?;
        self.stream.flush().await?;

        let count = codec::read_count(&mut self.stream, "file count").await?;
        let mut names = Vec::with_capacity(count as usize);
        for _ in 0..count {
            names.push(codec::read_string(&mut self.stream).await?);
        }
        Ok(names)
    }

    /// DELETE: removes one shard by full `.partN` name, returning the
    /// slave's raw `OK`/`ERREUR` status.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub async fn delete_part(&mut self, full_part_name: &str) -> MasterResult<String> {
        codec::write_string(&mut self.stream, SlaveCommand::Delete.as_str()).await?;
        codec::write_string(&mut self.stream, full_part_name).await?;
        self.stream.flush().await?;
        Ok(codec::read_string(&mut self.stream).await?)
    }
}
