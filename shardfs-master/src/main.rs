//! shardfs coordinator binary.
//!
//! ```bash
//! shardfs-master --listen 0.0.0.0:4100 --storage-root ./reception \
//!     --slave 10.0.0.1:4101 --slave 10.0.0.2:4102
//! ```
//!
//! Slave order on the command line determines shard index assignment
//! and must match across restarts for existing data to reassemble.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{error, warn, Level};

use shardfs_master::{MasterConfig, MasterServer};

/// shardfs coordinator: splits uploads across slaves and reassembles
/// downloads.
#[derive(Debug, Parser)]
#[command(name = "shardfs-master", version)]
struct Args {
    /// Address to listen on for clients.
    #[arg(long, default_value = "127.0.0.1:4100")]
    listen: SocketAddr,

    /// Local storage root (directory trees and download buffers).
    #[arg(long)]
    storage_root: PathBuf,

    /// Slave endpoint as host:port; repeat once per slave, in shard
    /// order.
    #[arg(long = "slave", value_name = "HOST:PORT", value_parser = parse_endpoint)]
    slaves: Vec<(String, u16)>,

    /// Startup probe rounds before giving up on unreachable slaves.
    #[arg(long, default_value_t = 3)]
    probe_attempts: u32,

    /// Seconds between probe rounds.
    #[arg(long, default_value_t = 5)]
    probe_delay_secs: u64,

    /// Maximum concurrent client connections.
    #[arg(long, default_value_t = 1024)]
    max_connections: usize,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn parse_endpoint(raw: &str) -> Result<(String, u16), String> {
    let (host, port) = raw
        .rsplit_once(':')
        .ok_or_else(|| format!("expected host:port, got {raw:?}"))?;
    if host.is_empty() {
        return Err(format!("empty host in {raw:?}"));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| format!("invalid port in {raw:?}"))?;
    Ok((host.to_string(), port))
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let config = MasterConfig::new(args.listen, args.storage_root)
        .with_slaves(args.slaves)
        .with_probe_policy(args.probe_attempts, Duration::from_secs(args.probe_delay_secs))
        .with_max_connections(args.max_connections);

    let server = match MasterServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to start master server");
            std::process::exit(1);
        }
    };

    let connected = server.probe_slaves().await;
    let total = server.registry().len();
    if connected < total {
        warn!(connected, total, "starting with unreachable slaves");
    }

    if let Err(e) = server.run().await {
        error!(error = %e, "master server failed");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::parse_endpoint;

    #[test]
    fn parses_endpoints() {
        assert_eq!(
            parse_endpoint("10.0.0.1:4101").unwrap(),
            ("10.0.0.1".to_string(), 4101)
        );
        assert!(parse_endpoint("noport").is_err());
        assert!(parse_endpoint(":4101").is_err());
        assert!(parse_endpoint("host:notaport").is_err());
    }
}
