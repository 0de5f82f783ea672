//! Per-command handlers for the client-facing server.
//!
//! One command per connection. Sharded file traffic goes through the
//! coordinator; directory transfers read and write the master's local
//! storage root directly and never touch the slaves.

use std::path::PathBuf;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, warn};

use shardfs_protocol::{codec, tree, ClientCommand, STATUS_CONNECTED, UNKNOWN_COMMAND_REPLY};

use crate::coordinator::{validate_name, ShardCoordinator};
use crate::error::{MasterError, MasterResult};

/// Shared state for client connection handlers.
pub(crate) struct HandlerContext {
    pub(crate) coordinator: ShardCoordinator,
    pub(crate) storage_root: PathBuf,
}

/// Reads and serves one command on the connection.
pub(crate) async fn handle_connection(
    stream: &mut TcpStream,
    ctx: &HandlerContext,
) -> MasterResult<()> {
    let raw = codec::read_string(stream).await?;
    let Some(command) = ClientCommand::parse(&raw) else {
        warn!(command = %raw, "unknown command");
        codec::write_string(stream, UNKNOWN_COMMAND_REPLY).await?;
        stream.flush().await?;
        return Ok(());
    };

    match command {
        ClientCommand::Connect => handle_connect(stream).await,
        ClientCommand::Upload => handle_upload(stream, ctx).await,
        ClientCommand::List => handle_list(stream, ctx).await,
        ClientCommand::DownloadFile => handle_download_file(stream, ctx).await,
        ClientCommand::DownloadDir => handle_download_dir(stream, ctx).await,
        ClientCommand::Delete => handle_delete(stream, ctx).await,
    }
}

async fn handle_connect(stream: &mut TcpStream) -> MasterResult<()> {
    codec::write_string(stream, STATUS_CONNECTED).await?;
    stream.flush().await?;
    Ok(())
}

/// UPLOAD: bool `is_directory`, then a file record (sharded to the
/// slaves) or a directory record (stored under the local root). No
/// reply either way.
async fn handle_upload(stream: &mut TcpStream, ctx: &HandlerContext) -> MasterResult<()> {
    let is_directory = codec::read_bool(stream).await?;
    if is_directory {
        let node = tree::read_node(stream, false).await?;
        validate_name(node.name())?;
        node.materialize(&ctx.storage_root).await?;
        info!(name = %node.name(), "directory stored");
    } else {
        let name = codec::read_string(stream).await?;
        let size = codec::read_size(stream, "file size").await?;
        ctx.coordinator.upload_file(&name, size, stream).await?;
    }
    Ok(())
}

/// LIST → i32 count, then per name (string, bool `is_file` = true).
///
/// Listings are derived purely from shard names observed on the
/// slaves, so everything reports as a file, including names that were
/// uploaded as directories through the unsharded path.
async fn handle_list(stream: &mut TcpStream, ctx: &HandlerContext) -> MasterResult<()> {
    let names = ctx.coordinator.list_logical().await;
    codec::write_i32(stream, i32::try_from(names.len()).unwrap_or(i32::MAX)).await?;
    for name in &names {
        codec::write_string(stream, name).await?;
        codec::write_bool(stream, true).await?;
    }
    stream.flush().await?;
    Ok(())
}

/// DOWNLOAD_FILE: string name → `OK`, name, i64 total size, bytes.
async fn handle_download_file(stream: &mut TcpStream, ctx: &HandlerContext) -> MasterResult<()> {
    let name = codec::read_string(stream).await?;
    match ctx.coordinator.download_file(&name, stream).await {
        Ok(()) => Ok(()),
        Err(MasterError::InvalidName { name }) => {
            warn!(%name, "invalid download name");
            codec::write_string(stream, "ERREUR: Nom invalide.").await?;
            stream.flush().await?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// DOWNLOAD_DIR: string name → `OK` + recursive tree, or an in-band
/// `ERREUR` status when the directory is absent.
async fn handle_download_dir(stream: &mut TcpStream, ctx: &HandlerContext) -> MasterResult<()> {
    let name = codec::read_string(stream).await?;
    if validate_name(&name).is_err() {
        warn!(%name, "invalid directory name");
        codec::write_string(stream, "ERREUR: Dossier introuvable.").await?;
        stream.flush().await?;
        return Ok(());
    }

    let path = ctx.storage_root.join(&name);
    let is_dir = tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        codec::write_string(stream, "ERREUR: Dossier introuvable.").await?;
        stream.flush().await?;
        return Ok(());
    }

    let node = tree::Node::from_path(&path).await?;
    tree::write_node_with_status(stream, &node).await?;
    stream.flush().await?;
    info!(%name, "directory served");
    Ok(())
}

/// DELETE: string name. Fire-and-forget; nothing is sent back.
async fn handle_delete(stream: &mut TcpStream, ctx: &HandlerContext) -> MasterResult<()> {
    let name = codec::read_string(stream).await?;
    if validate_name(&name).is_err() {
        warn!(%name, "invalid delete name");
        return Ok(());
    }
    info!(%name, "delete requested");
    ctx.coordinator.delete(&name).await;
    Ok(())
}
