//! shardfs storage worker binary.
//!
//! ```bash
//! shardfs-slave --listen 0.0.0.0:4101 --storage-dir ./slave1
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, Level};

use shardfs_slave::{SlaveServer, SlaveServerConfig};

/// shardfs storage worker: holds one positional shard per uploaded file.
#[derive(Debug, Parser)]
#[command(name = "shardfs-slave", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "127.0.0.1:4101")]
    listen: SocketAddr,

    /// Directory holding shard files.
    #[arg(long)]
    storage_dir: PathBuf,

    /// Maximum concurrent connections.
    #[arg(long, default_value_t = 1024)]
    max_connections: usize,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let config = SlaveServerConfig::new(args.listen, args.storage_dir)
        .with_max_connections(args.max_connections);

    let server = match SlaveServer::bind(config).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to start slave server");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        error!(error = %e, "slave server failed");
        std::process::exit(1);
    }
}
