//! Per-connection echo relay.
//!
//! Each worker owns its connection exclusively: read a chunk, write it
//! back verbatim, repeat. There is no buffering across reads and no state
//! shared with the listener or other workers. The socket closes exactly
//! once, when the task returns and the stream drops.

use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{error, info};

/// Read buffer size
const BUFFER_SIZE: usize = 4096;

/// Serve a single client connection until the peer disconnects or an
/// I/O error terminates the relay. Never joined by the accept loop.
pub async fn handle_connection(mut stream: TcpStream, peer: SocketAddr) {
    info!(peer = %peer, "Client connected");

    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    loop {
        buffer.clear();

        match read_chunk(&mut stream, &mut buffer).await {
            Ok(0) => {
                // Peer closed its write side
                info!(peer = %peer, "Client disconnected");
                break;
            }
            Ok(n) => {
                if let Err(e) = write_full(&mut stream, &buffer[..n]).await {
                    error!(peer = %peer, error = %e, "send failed");
                    break;
                }
            }
            Err(e) => {
                error!(peer = %peer, error = %e, "recv failed");
                break;
            }
        }
    }
}

/// Issue a single read of up to the buffer's spare capacity, retrying
/// transparently when the read is interrupted.
async fn read_chunk<R>(reader: &mut R, buffer: &mut BytesMut) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    loop {
        match reader.read_buf(buffer).await {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

/// Write all of `data`, resuming from the current offset after a short
/// write and retrying transparently when the write is interrupted.
async fn write_full<W>(writer: &mut W, data: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut sent = 0;
    while sent < data.len() {
        match writer.write(&data[sent..]).await {
            Ok(0) => {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "write returned 0"));
            }
            Ok(n) => sent += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
