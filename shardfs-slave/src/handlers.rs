//! Per-command handlers for the slave server.
//!
//! Each accepted connection carries exactly one command. The command
//! string is read first; its fixed field sequence follows. Failures on
//! the storage side are answered in-band (`ERROR`/`ERREUR`), never by
//! aborting the connection.

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use shardfs_protocol::{
    codec, SlaveCommand, STATUS_CONNECTED, STATUS_DELETE_FAILED, STATUS_OK, STATUS_SHARD_MISSING,
    UNKNOWN_COMMAND_REPLY,
};

use crate::error::{SlaveError, SlaveResult};
use crate::store::ShardStore;

/// Reads and serves one command on the connection.
pub(crate) async fn handle_connection(
    stream: &mut TcpStream,
    store: &ShardStore,
) -> SlaveResult<()> {
    let raw = codec::read_string(stream).await?;
    let Some(command) = SlaveCommand::parse(&raw) else {
        warn!(command = %raw, "unknown command");
        codec::write_string(stream, UNKNOWN_COMMAND_REPLY).await?;
        stream.flush().await?;
        return Ok(());
    };

    match command {
        SlaveCommand::Connect => handle_connect(stream).await,
        SlaveCommand::UploadPart => handle_upload_part(stream, store).await,
        SlaveCommand::DownloadPart => handle_download_part(stream, store).await,
        SlaveCommand::List => handle_list(stream, store).await,
        SlaveCommand::Delete => handle_delete(stream, store).await,
    }
}

async fn handle_connect(stream: &mut TcpStream) -> SlaveResult<()> {
    codec::write_string(stream, STATUS_CONNECTED).await?;
    stream.flush().await?;
    Ok(())
}

/// UPLOAD_PART: name, i32 index, i64 size, size raw bytes. No reply.
async fn handle_upload_part(stream: &mut TcpStream, store: &ShardStore) -> SlaveResult<()> {
    let name = codec::read_string(stream).await?;
    let index = codec::read_count(stream, "part index").await?;
    let size = codec::read_size(stream, "part size").await?;
    store.store_shard(&name, index, size, stream).await?;
    debug!(name, index, size, "shard received");
    Ok(())
}

/// DOWNLOAD_PART: name, i32 index → `OK` + i64 size + bytes, or
/// `ERROR` when the shard is absent.
async fn handle_download_part(stream: &mut TcpStream, store: &ShardStore) -> SlaveResult<()> {
    let name = codec::read_string(stream).await?;
    let index = codec::read_count(stream, "part index").await?;

    let (mut file, size) = match store.open_shard(&name, index).await {
        Ok(opened) => opened,
        Err(SlaveError::ShardNotFound { name }) => {
            debug!(shard = %name, "shard missing");
            codec::write_string(stream, STATUS_SHARD_MISSING).await?;
            stream.flush().await?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    codec::write_string(stream, STATUS_OK).await?;
    codec::write_i64(stream, i64::try_from(size).unwrap_or(i64::MAX)).await?;
    tokio::io::copy(&mut file, stream).await?;
    stream.flush().await?;
    Ok(())
}

/// LIST → i32 count, then count raw shard filenames.
async fn handle_list(stream: &mut TcpStream, store: &ShardStore) -> SlaveResult<()> {
    let names = store.list_shards().await?;
    codec::write_i32(stream, i32::try_from(names.len()).unwrap_or(i32::MAX)).await?;
    for name in &names {
        codec::write_string(stream, name).await?;
    }
    stream.flush().await?;
    Ok(())
}

/// DELETE: full `.partN` filename → `OK`/`ERREUR`.
async fn handle_delete(stream: &mut TcpStream, store: &ShardStore) -> SlaveResult<()> {
    let name = codec::read_string(stream).await?;
    let status = match store.delete_shard(&name).await {
        Ok(()) => STATUS_OK,
        Err(SlaveError::ShardNotFound { .. } | SlaveError::InvalidName { .. }) => {
            STATUS_DELETE_FAILED
        }
        Err(e) => return Err(e),
    };
    codec::write_string(stream, status).await?;
    stream.flush().await?;
    Ok(())
}
