//! Recursive directory-tree wire format.
//!
//! Directory transfers bypass sharding entirely: the master stores the
//! tree under its own root. The wire format is recursive and preserves
//! field order on both legs:
//!
//! ```text
//! file record:      string name, i64 size, size raw bytes
//! directory record: string name, i32 child count,
//!                   then per child: bool is_file + nested record
//! ```
//!
//! On the download leg every record is additionally preceded by a status
//! string (`OK`, or `ERREUR: ...` in place of the whole record when the
//! requested tree is absent). The upload leg carries no statuses.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec;
use crate::error::{ProtocolError, ProtocolResult};
use crate::{ERROR_PREFIX, STATUS_OK};

/// A node of a transferred directory tree.
///
/// File bytes are held in memory; directory transfers are the small,
/// unsharded side path of the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A regular file with its full contents.
    File {
        /// Base name of the file.
        name: String,
        /// File contents.
        bytes: Bytes,
    },
    /// A directory with its children in wire order.
    Directory {
        /// Base name of the directory.
        name: String,
        /// Children, serialized in sequence.
        children: Vec<Node>,
    },
}

impl Node {
    /// Base name of this node.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Directory { name, .. } => name,
        }
    }

    /// Whether this node is a file.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    /// Builds a tree from a filesystem path.
    ///
    /// Children are read in name order so the wire layout is stable.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be read.
    pub async fn from_path(path: &Path) -> ProtocolResult<Self> {
        from_path_inner(path).await
    }

    /// Writes this tree under `dest_dir`, creating directories as
    /// needed and overwriting existing files.
    ///
    /// Names arrive off the wire and must not resolve outside
    /// `dest_dir`; the whole tree is checked before anything is
    /// written, so a bad record leaves no partial output.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnsafeName`] if any node name is empty,
    /// contains a path separator, or is `..`; otherwise an error if any
    /// file or directory cannot be written.
    pub async fn materialize(&self, dest_dir: &Path) -> ProtocolResult<()> {
        check_tree(self)?;
        materialize_inner(self, dest_dir).await
    }
}

/// Writes an upload-leg record (no statuses).
///
/// The leading `is_file` tag of the top-level record is the caller's
/// concern; nested children carry their own tags.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub async fn write_node<W>(writer: &mut W, node: &Node) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin + Send,
{
    write_node_inner(writer, node, false).await
}

/// Writes a download-leg record, prefixing each nested record with an
/// `OK` status.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub async fn write_node_with_status<W>(writer: &mut W, node: &Node) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin + Send,
{
    write_node_inner(writer, node, true).await
}

/// Reads an upload-leg record of known kind.
///
/// # Errors
///
/// Returns an error on I/O failure or malformed fields.
pub async fn read_node<R>(reader: &mut R, is_file: bool) -> ProtocolResult<Node>
where
    R: AsyncRead + Unpin + Send,
{
    read_node_inner(reader, is_file, false).await
}

/// Reads a download-leg record of known kind, checking the per-record
/// status strings.
///
/// # Errors
///
/// Returns [`ProtocolError::PeerError`] if the peer answered with an
/// in-band `ERREUR` status instead of a record.
pub async fn read_node_with_status<R>(reader: &mut R, is_file: bool) -> ProtocolResult<Node>
where
    R: AsyncRead + Unpin + Send,
{
    read_node_inner(reader, is_file, true).await
}

fn write_node_inner<'a, W>(
    writer: &'a mut W,
    node: &'a Node,
    with_status: bool,
) -> Pin<Box<dyn Future<Output = ProtocolResult<()>> + Send + 'a>>
where
    W: AsyncWrite + Unpin + Send,
{
    Box::pin(async move {
        if with_status {
            codec::write_string(writer, STATUS_OK).await?;
        }
        match node {
            Node::File { name, bytes } => {
                codec::write_string(writer, name).await?;
                let size = i64::try_from(bytes.len()).map_err(|_| {
                    ProtocolError::NegativeField {
                        field: "file size",
                        value: i64::MAX,
                    }
                })?;
                codec::write_i64(writer, size).await?;
                tokio::io::AsyncWriteExt::write_all(writer, bytes).await?;
            }
            Node::Directory { name, children } => {
                codec::write_string(writer, name).await?;
                let count = i32::try_from(children.len()).map_err(|_| {
                    ProtocolError::NegativeField {
                        field: "child count",
                        value: i64::MAX,
                    }
                })?;
                codec::write_i32(writer, count).await?;
                for child in children {
                    codec::write_bool(writer, child.is_file()).await?;
                    write_node_inner(writer, child, with_status).await?;
                }
            }
        }
        Ok(())
    })
}

fn read_node_inner<'a, R>(
    reader: &'a mut R,
    is_file: bool,
    with_status: bool,
) -> Pin<Box<dyn Future<Output = ProtocolResult<Node>> + Send + 'a>>
where
    R: AsyncRead + Unpin + Send,
{
    Box::pin(async move {
        if with_status {
            let status = codec::read_string(reader).await?;
            if status != STATUS_OK {
                if status.starts_with(ERROR_PREFIX) {
                    return Err(ProtocolError::PeerError(status));
                }
                return Err(ProtocolError::UnexpectedStatus {
                    expected: STATUS_OK,
                    got: status,
                });
            }
        }
        let name = codec::read_string(reader).await?;
        if is_file {
            let size = codec::read_size(reader, "file size").await?;
            let bytes = codec::read_payload(reader, size).await?;
            Ok(Node::File { name, bytes })
        } else {
            let count = codec::read_count(reader, "child count").await?;
            let mut children = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let child_is_file = codec::read_bool(reader).await?;
                children.push(read_node_inner(reader, child_is_file, with_status).await?);
            }
            Ok(Node::Directory { name, children })
        }
    })
}

fn from_path_inner(path: &Path) -> Pin<Box<dyn Future<Output = ProtocolResult<Node>> + Send + '_>> {
    Box::pin(async move {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let meta = tokio::fs::metadata(path).await?;
        if meta.is_file() {
            let bytes = Bytes::from(tokio::fs::read(path).await?);
            return Ok(Node::File { name, bytes });
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(path).await?;
        while let Some(entry) = dir.next_entry().await? {
            entries.push(entry.path());
        }
        entries.sort();

        let mut children = Vec::with_capacity(entries.len());
        for entry in &entries {
            children.push(from_path_inner(entry).await?);
        }
        Ok(Node::Directory { name, children })
    })
}

fn materialize_inner<'a>(
    node: &'a Node,
    dest_dir: &'a Path,
) -> Pin<Box<dyn Future<Output = ProtocolResult<()>> + Send + 'a>> {
    Box::pin(async move {
        match node {
            Node::File { name, bytes } => {
                tokio::fs::write(dest_dir.join(name), bytes).await?;
            }
            Node::Directory { name, children } => {
                let dir = dest_dir.join(name);
                tokio::fs::create_dir_all(&dir).await?;
                for child in children {
                    materialize_inner(child, &dir).await?;
                }
            }
        }
        Ok(())
    })
}

/// Node names come off the wire; any name that would resolve outside
/// its parent is refused before the tree touches the filesystem.
fn check_tree(node: &Node) -> ProtocolResult<()> {
    let name = node.name();
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
        return Err(ProtocolError::UnsafeName {
            name: name.to_string(),
        });
    }
    if let Node::Directory { children, .. } = node {
        for child in children {
            check_tree(child)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_tree() -> Node {
        Node::Directory {
            name: "album".to_string(),
            children: vec![
                Node::File {
                    name: "cover.jpg".to_string(),
                    bytes: Bytes::from_static(b"jpegdata"),
                },
                Node::Directory {
                    name: "tracks".to_string(),
                    children: vec![Node::File {
                        name: "01.flac".to_string(),
                        bytes: Bytes::from_static(b"flacdata"),
                    }],
                },
            ],
        }
    }

    #[tokio::test]
    async fn upload_leg_round_trip() {
        let tree = sample_tree();
        let mut buf = Vec::new();
        write_node(&mut buf, &tree).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let read = read_node(&mut cursor, false).await.unwrap();
        assert_eq!(read, tree);
    }

    #[tokio::test]
    async fn download_leg_round_trip() {
        let tree = sample_tree();
        let mut buf = Vec::new();
        write_node_with_status(&mut buf, &tree).await.unwrap();

        let mut cursor = Cursor::new(buf);
        let read = read_node_with_status(&mut cursor, false).await.unwrap();
        assert_eq!(read, tree);
    }

    #[tokio::test]
    async fn download_leg_surfaces_erreur_status() {
        let mut buf = Vec::new();
        codec::write_string(&mut buf, "ERREUR: Dossier introuvable.")
            .await
            .unwrap();
        let mut cursor = Cursor::new(buf);
        let err = read_node_with_status(&mut cursor, false)
            .await
            .unwrap_err();
        assert!(matches!(err, ProtocolError::PeerError(_)));
    }

    #[tokio::test]
    async fn materialize_refuses_traversal_in_nested_names() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("inbox");
        tokio::fs::create_dir_all(&dest).await.unwrap();

        let tree = Node::Directory {
            name: "photos".to_string(),
            children: vec![Node::File {
                name: "../../escaped.txt".to_string(),
                bytes: Bytes::from_static(b"loose"),
            }],
        };
        let err = tree.materialize(&dest).await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnsafeName { .. }));

        // Nothing landed above the destination, and no partial output
        // either: validation runs before the first write.
        assert!(tokio::fs::metadata(tmp.path().join("escaped.txt"))
            .await
            .is_err());
        assert!(tokio::fs::metadata(dest.join("photos")).await.is_err());
    }

    #[tokio::test]
    async fn materialize_refuses_absolute_and_empty_names() {
        let dest = tempfile::tempdir().unwrap();
        for bad in ["/etc/hosts", "a\\b", "", ".."] {
            let tree = Node::File {
                name: bad.to_string(),
                bytes: Bytes::new(),
            };
            let err = tree.materialize(dest.path()).await.unwrap_err();
            assert!(matches!(err, ProtocolError::UnsafeName { .. }), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn filesystem_round_trip() {
        let src = tempfile::tempdir().unwrap();
        let root = src.path().join("docs");
        tokio::fs::create_dir_all(root.join("inner")).await.unwrap();
        tokio::fs::write(root.join("a.txt"), b"alpha").await.unwrap();
        tokio::fs::write(root.join("inner").join("b.txt"), b"beta")
            .await
            .unwrap();

        let tree = Node::from_path(&root).await.unwrap();
        assert_eq!(tree.name(), "docs");
        assert!(!tree.is_file());

        let dest = tempfile::tempdir().unwrap();
        tree.materialize(dest.path()).await.unwrap();

        let a = tokio::fs::read(dest.path().join("docs").join("a.txt"))
            .await
            .unwrap();
        assert_eq!(a, b"alpha");
        let b = tokio::fs::read(dest.path().join("docs").join("inner").join("b.txt"))
            .await
            .unwrap();
        assert_eq!(b, b"beta");
    }
}
