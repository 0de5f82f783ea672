//! Integration tests driving the slave server over real sockets.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use shardfs_protocol::codec;
use shardfs_slave::{SlaveServer, SlaveServerConfig};

async fn start_slave(dir: &tempfile::TempDir) -> SocketAddr {
    let config = SlaveServerConfig::new("127.0.0.1:0".parse().unwrap(), dir.path());
    let server = SlaveServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn dial(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.unwrap()
}

async fn upload_part(addr: SocketAddr, name: &str, index: i32, bytes: &[u8]) {
    let mut stream = dial(addr).await;
    codec::write_string(&mut stream, "UPLOAD_PART").await.unwrap();
    codec::write_string(&mut stream, name).await.unwrap();
    codec::write_i32(&mut stream, index).await.unwrap();
    codec::write_i64(&mut stream, bytes.len() as i64).await.unwrap();
    stream.write_all(bytes).await.unwrap();
    stream.flush().await.unwrap();
    // No reply; wait for the server to close its end so the write is
    // known to be fully consumed.
    let mut sink = Vec::new();
    stream.read_to_end(&mut sink).await.unwrap();
}

#[tokio::test]
async fn connect_answers_connecte() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_slave(&dir).await;

    let mut stream = dial(addr).await;
    codec::write_string(&mut stream, "CONNECT").await.unwrap();
    stream.flush().await.unwrap();
    assert_eq!(codec::read_string(&mut stream).await.unwrap(), "CONNECTE");
}

#[tokio::test]
async fn upload_then_download_part() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_slave(&dir).await;

    upload_part(addr, "data.bin", 1, b"ABCDE").await;

    let mut stream = dial(addr).await;
    codec::write_string(&mut stream, "DOWNLOAD_PART").await.unwrap();
    codec::write_string(&mut stream, "data.bin").await.unwrap();
    codec::write_i32(&mut stream, 1).await.unwrap();
    stream.flush().await.unwrap();

    assert_eq!(codec::read_string(&mut stream).await.unwrap(), "OK");
    let size = codec::read_i64(&mut stream).await.unwrap();
    assert_eq!(size, 5);
    let mut body = vec![0u8; 5];
    stream.read_exact(&mut body).await.unwrap();
    assert_eq!(body, b"ABCDE");
}

#[tokio::test]
async fn missing_part_answers_error() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_slave(&dir).await;

    let mut stream = dial(addr).await;
    codec::write_string(&mut stream, "DOWNLOAD_PART").await.unwrap();
    codec::write_string(&mut stream, "ghost.bin").await.unwrap();
    codec::write_i32(&mut stream, 1).await.unwrap();
    stream.flush().await.unwrap();

    assert_eq!(codec::read_string(&mut stream).await.unwrap(), "ERROR");
}

#[tokio::test]
async fn list_returns_raw_part_names() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_slave(&dir).await;

    upload_part(addr, "a.txt", 1, b"x").await;
    upload_part(addr, "b.txt", 2, b"y").await;

    let mut stream = dial(addr).await;
    codec::write_string(&mut stream, "LIST").await.unwrap();
    stream.flush().await.unwrap();

    let count = codec::read_i32(&mut stream).await.unwrap();
    assert_eq!(count, 2);
    let mut names = Vec::new();
    for _ in 0..count {
        names.push(codec::read_string(&mut stream).await.unwrap());
    }
    names.sort();
    assert_eq!(names, vec!["a.txt.part1", "b.txt.part2"]);
}

#[tokio::test]
async fn delete_answers_ok_then_erreur() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_slave(&dir).await;

    upload_part(addr, "a.txt", 1, b"x").await;

    let mut stream = dial(addr).await;
    codec::write_string(&mut stream, "DELETE").await.unwrap();
    codec::write_string(&mut stream, "a.txt.part1").await.unwrap();
    stream.flush().await.unwrap();
    assert_eq!(codec::read_string(&mut stream).await.unwrap(), "OK");

    // Second delete of the same name fails in-band.
    let mut stream = dial(addr).await;
    codec::write_string(&mut stream, "DELETE").await.unwrap();
    codec::write_string(&mut stream, "a.txt.part1").await.unwrap();
    stream.flush().await.unwrap();
    assert_eq!(codec::read_string(&mut stream).await.unwrap(), "ERREUR");
}

#[tokio::test]
async fn shutdown_is_prompt_with_connection_cap_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let config = SlaveServerConfig::new("127.0.0.1:0".parse().unwrap(), dir.path())
        .with_max_connections(1);
    let server = SlaveServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let running = tokio::spawn(server.run());

    // The only permit rides in a handler that is parked waiting for a
    // command that never comes.
    let _held = dial(addr).await;
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    shutdown.notify_one();
    tokio::time::timeout(std::time::Duration::from_secs(1), running)
        .await
        .expect("shutdown stalled behind the connection cap")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn unknown_command_is_answered_in_band() {
    let dir = tempfile::tempdir().unwrap();
    let addr = start_slave(&dir).await;

    let mut stream = dial(addr).await;
    codec::write_string(&mut stream, "REPLICATE").await.unwrap();
    stream.flush().await.unwrap();
    assert_eq!(
        codec::read_string(&mut stream).await.unwrap(),
        "Commande inconnue"
    );

    // The server is still alive.
    let mut stream = dial(addr).await;
    codec::write_string(&mut stream, "CONNECT").await.unwrap();
    stream.flush().await.unwrap();
    assert_eq!(codec::read_string(&mut stream).await.unwrap(), "CONNECTE");
}
