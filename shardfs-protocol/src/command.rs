//! Command sets for the two legs of the protocol.
//!
//! The client-facing and slave-facing legs share the codec but carry
//! different command vocabularies. Commands travel as plain strings;
//! the mapping here is the single source of truth for both peers.

/// Commands accepted by the master from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// Liveness handshake; answered with `CONNECTE`.
    Connect,
    /// Upload a file (sharded) or a directory tree (master-local).
    Upload,
    /// List logical names aggregated from the slaves.
    List,
    /// Download a sharded file, reassembled by the master.
    DownloadFile,
    /// Download a directory tree from the master's local storage.
    DownloadDir,
    /// Fan-out delete of a logical file's shards.
    Delete,
}

impl ClientCommand {
    /// Parses a raw command string. Returns `None` for unknown commands,
    /// which the server answers in-band.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CONNECT" => Some(Self::Connect),
            "UPLOAD" => Some(Self::Upload),
            "LIST" => Some(Self::List),
            "DOWNLOAD_FILE" => Some(Self::DownloadFile),
            "DOWNLOAD_DIR" => Some(Self::DownloadDir),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    /// The wire representation of this command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Upload => "UPLOAD",
            Self::List => "LIST",
            Self::DownloadFile => "DOWNLOAD_FILE",
            Self::DownloadDir => "DOWNLOAD_DIR",
            Self::Delete => "DELETE",
        }
    }
}

/// Commands accepted by a slave from the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlaveCommand {
    /// Liveness handshake; answered with `CONNECTE`.
    Connect,
    /// Store one shard: name, index, size, bytes. No reply.
    UploadPart,
    /// Fetch one shard: `OK` + size + bytes, or `ERROR` if absent.
    DownloadPart,
    /// List raw shard filenames (suffixes not stripped).
    List,
    /// Delete a shard by its full `.partN` filename; `OK`/`ERREUR`.
    Delete,
}

impl SlaveCommand {
    /// Parses a raw command string.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CONNECT" => Some(Self::Connect),
            "UPLOAD_PART" => Some(Self::UploadPart),
            "DOWNLOAD_PART" => Some(Self::DownloadPart),
            "LIST" => Some(Self::List),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    /// The wire representation of this command.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::UploadPart => "UPLOAD_PART",
            Self::DownloadPart => "DOWNLOAD_PART",
            Self::List => "LIST",
            Self::Delete => "DELETE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_commands_round_trip() {
        for cmd in [
            ClientCommand::Connect,
            ClientCommand::Upload,
            ClientCommand::List,
            ClientCommand::DownloadFile,
            ClientCommand::DownloadDir,
            ClientCommand::Delete,
        ] {
            assert_eq!(ClientCommand::parse(cmd.as_str()), Some(cmd));
        }
    }

    #[test]
    fn slave_commands_round_trip() {
        for cmd in [
            SlaveCommand::Connect,
            SlaveCommand::UploadPart,
            SlaveCommand::DownloadPart,
            SlaveCommand::List,
            SlaveCommand::Delete,
        ] {
            assert_eq!(SlaveCommand::parse(cmd.as_str()), Some(cmd));
        }
    }

    #[test]
    fn unknown_commands_parse_to_none() {
        assert_eq!(ClientCommand::parse("FORMAT_DISK"), None);
        assert_eq!(SlaveCommand::parse("UPLOAD"), None);
        assert_eq!(ClientCommand::parse("connect"), None);
    }
}
