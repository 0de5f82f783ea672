//! Typed stream primitives.
//!
//! All helpers operate directly on an async byte stream. The protocol has
//! no framing layer, so a failed read mid-sequence is unrecoverable for
//! that connection.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, ProtocolResult};

/// Chunk size for stream-to-stream payload copies.
pub const COPY_CHUNK_BYTES: usize = 8 * 1024;

/// Reads a length-prefixed UTF-8 string.
///
/// # Errors
///
/// Returns an error on I/O failure or if the bytes are not valid UTF-8.
pub async fn read_string<R>(reader: &mut R) -> ProtocolResult<String>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u16().await? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    String::from_utf8(buf).map_err(|_| ProtocolError::InvalidUtf8)
}

/// Writes a length-prefixed UTF-8 string.
///
/// # Errors
///
/// Returns an error on I/O failure or if the string exceeds the u16
/// length prefix.
pub async fn write_string<W>(writer: &mut W, value: &str) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u16::try_from(value.len())
        .map_err(|_| ProtocolError::StringTooLong { len: value.len() })?;
    writer.write_u16(len).await?;
    writer.write_all(value.as_bytes()).await?;
    Ok(())
}

/// Reads a 1-byte boolean. Any nonzero byte reads as `true`.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub async fn read_bool<R>(reader: &mut R) -> ProtocolResult<bool>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_u8().await? != 0)
}

/// Writes a 1-byte boolean.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub async fn write_bool<W>(writer: &mut W, value: bool) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_u8(u8::from(value)).await?;
    Ok(())
}

/// Reads a 4-byte big-endian signed integer.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub async fn read_i32<R>(reader: &mut R) -> ProtocolResult<i32>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_i32().await?)
}

/// Writes a 4-byte big-endian signed integer.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub async fn write_i32<W>(writer: &mut W, value: i32) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_i32(value).await?;
    Ok(())
}

/// Reads an 8-byte big-endian signed integer.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub async fn read_i64<R>(reader: &mut R) -> ProtocolResult<i64>
where
    R: AsyncRead + Unpin,
{
    Ok(reader.read_i64().await?)
}

/// Writes an 8-byte big-endian signed integer.
///
/// # Errors
///
/// Returns an error on I/O failure.
pub async fn write_i64<W>(writer: &mut W, value: i64) -> ProtocolResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_i64(value).await?;
    Ok(())
}

/// Reads a declared-size count field (i64) and validates it is not
/// negative.
///
/// # Errors
///
/// Returns an error on I/O failure or a negative value.
pub async fn read_size<R>(reader: &mut R, field: &'static str) -> ProtocolResult<u64>
where
    R: AsyncRead + Unpin,
{
    let raw = reader.read_i64().await?;
    u64::try_from(raw).map_err(|_| ProtocolError::NegativeField { field, value: raw })
}

/// Reads a declared-count field (i32) and validates it is not negative.
///
/// # Errors
///
/// Returns an error on I/O failure or a negative value.
pub async fn read_count<R>(reader: &mut R, field: &'static str) -> ProtocolResult<u32>
where
    R: AsyncRead + Unpin,
{
    let raw = reader.read_i32().await?;
    u32::try_from(raw).map_err(|_| ProtocolError::NegativeField {
        field,
        value: i64::from(raw),
    })
}

/// Reads exactly `len` payload bytes into memory.
///
/// # Errors
///
/// Returns an error on I/O failure, including a short read.
pub async fn read_payload<R>(reader: &mut R, len: u64) -> ProtocolResult<Bytes>
where
    R: AsyncRead + Unpin,
{
    // Payload sizes come off the wire as i64; the in-memory path is only
    // used where the whole body is buffered anyway.
    let cap = usize::try_from(len).map_err(|_| ProtocolError::PayloadTooLarge { len })?;
    let mut buf = BytesMut::zeroed(cap);
    reader.read_exact(&mut buf).await?;
    Ok(buf.freeze())
}

/// Copies exactly `len` bytes from `reader` to `writer` in fixed-size
/// chunks, without buffering the whole payload.
///
/// # Errors
///
/// Returns an error on I/O failure, including the reader ending before
/// `len` bytes were produced.
pub async fn copy_exact<R, W>(reader: &mut R, writer: &mut W, len: u64) -> ProtocolResult<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut remaining = len;
    let mut chunk = [0u8; COPY_CHUNK_BYTES];
    while remaining > 0 {
        // Safe cast: bounded by COPY_CHUNK_BYTES.
        #[allow(clippy::cast_possible_truncation)]
        let want = remaining.min(COPY_CHUNK_BYTES as u64) as usize;
        reader.read_exact(&mut chunk[..want]).await?;
        writer.write_all(&chunk[..want]).await?;
        remaining -= want as u64;
    }
    Ok(())
}

/// Reads a status string and requires it to equal `expected`.
///
/// # Errors
///
/// Returns [`ProtocolError::PeerError`] if the peer sent an in-band
/// error status, [`ProtocolError::UnexpectedStatus`] for anything else.
pub async fn expect_status<R>(reader: &mut R, expected: &'static str) -> ProtocolResult<()>
where
    R: AsyncRead + Unpin,
{
    let status = read_string(reader).await?;
    if status == expected {
        return Ok(());
    }
    if status.starts_with(crate::ERROR_PREFIX) {
        return Err(ProtocolError::PeerError(status));
    }
    Err(ProtocolError::UnexpectedStatus {
        expected,
        got: status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn string_round_trip() {
        let mut buf = Vec::new();
        write_string(&mut buf, "fichier.bin").await.unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_string(&mut cursor).await.unwrap(), "fichier.bin");
    }

    #[tokio::test]
    async fn empty_string_round_trip() {
        let mut buf = Vec::new();
        write_string(&mut buf, "").await.unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_string(&mut cursor).await.unwrap(), "");
    }

    #[tokio::test]
    async fn string_wire_layout_is_u16_prefixed() {
        let mut buf = Vec::new();
        write_string(&mut buf, "ab").await.unwrap();
        assert_eq!(buf, vec![0, 2, b'a', b'b']);
    }

    #[tokio::test]
    async fn scalar_round_trips() {
        let mut buf = Vec::new();
        write_bool(&mut buf, true).await.unwrap();
        write_i32(&mut buf, -7).await.unwrap();
        write_i64(&mut buf, 1 << 40).await.unwrap();

        let mut cursor = Cursor::new(buf);
        assert!(read_bool(&mut cursor).await.unwrap());
        assert_eq!(read_i32(&mut cursor).await.unwrap(), -7);
        assert_eq!(read_i64(&mut cursor).await.unwrap(), 1 << 40);
    }

    #[tokio::test]
    async fn truncated_string_is_an_error() {
        // Length prefix promises 5 bytes, stream holds 2.
        let mut cursor = Cursor::new(vec![0u8, 5, b'a', b'b']);
        assert!(read_string(&mut cursor).await.is_err());
    }

    #[tokio::test]
    async fn negative_size_is_rejected() {
        let mut buf = Vec::new();
        write_i64(&mut buf, -1).await.unwrap();
        let mut cursor = Cursor::new(buf);
        let err = read_size(&mut cursor, "part size").await.unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::NegativeField {
                field: "part size",
                value: -1
            }
        ));
    }

    #[test]
    fn oversize_payload_error_carries_the_declared_length() {
        let err = ProtocolError::PayloadTooLarge { len: 1 << 40 };
        assert_eq!(
            err.to_string(),
            format!("payload length {} too large to buffer", 1u64 << 40)
        );
    }

    #[tokio::test]
    async fn copy_exact_moves_declared_bytes_only() {
        let src = b"ABCDEFGHIJtrailing".to_vec();
        let mut reader = Cursor::new(src);
        let mut out = Vec::new();
        copy_exact(&mut reader, &mut out, 10).await.unwrap();
        assert_eq!(out, b"ABCDEFGHIJ");
        assert_eq!(reader.position(), 10);
    }

    #[tokio::test]
    async fn copy_exact_short_source_is_an_error() {
        let mut reader = Cursor::new(b"abc".to_vec());
        let mut out = Vec::new();
        assert!(copy_exact(&mut reader, &mut out, 10).await.is_err());
    }

    #[tokio::test]
    async fn expect_status_maps_erreur_to_peer_error() {
        let mut buf = Vec::new();
        write_string(&mut buf, "ERREUR: Dossier introuvable.")
            .await
            .unwrap();
        let mut cursor = Cursor::new(buf);
        let err = expect_status(&mut cursor, "OK").await.unwrap_err();
        assert!(matches!(err, ProtocolError::PeerError(_)));
    }
}
