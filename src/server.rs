//! TCP listener and accept loop.
//!
//! Owns the listening endpoint for the process lifetime. Every accepted
//! connection is handed to a detached worker task and the loop resumes
//! accepting immediately, so a slow connection never stalls accepts.

use crate::connection;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tracing::{error, info};

/// Server instance holding the bound, listening endpoint.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    port: u16,
}

impl Server {
    /// Bind the listening endpoint on the wildcard address.
    ///
    /// Address reuse is enabled so a restart can rebind a recently-used
    /// port immediately; the backlog is the platform maximum. Any failure
    /// here (socket, option, bind, listen) is a fatal startup error for
    /// the caller to report.
    pub fn bind(port: u16) -> io::Result<Server> {
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        socket.bind(&addr.into())?;
        socket.listen(libc::SOMAXCONN)?;

        socket.set_nonblocking(true)?;
        let listener = TcpListener::from_std(socket.into())?;

        // Resolve the actual port so binding port 0 reports the real one.
        let port = listener.local_addr()?.port();

        Ok(Server { listener, port })
    }

    /// Get the bound port for testing
    #[cfg(test)]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accept connections until a fatal accept error occurs.
    ///
    /// An interrupted accept is retried transparently. Any other accept
    /// failure stops the loop; dropping `self` then closes the endpoint
    /// while already-spawned workers run on to their own completion.
    pub async fn run(self) {
        info!("Listening on port {}", self.port);

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    // Fire and forget: no join handle, no backpressure.
                    tokio::spawn(connection::handle_connection(stream, peer));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!(error = %e, "accept failed, no longer serving");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_bind_reports_resolved_port() {
        let server = Server::bind(0).unwrap();
        assert_ne!(server.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_fails_when_port_in_use() {
        let server = Server::bind(0).unwrap();
        let err = Server::bind(server.port()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);
    }

    #[tokio::test]
    async fn test_accepts_connections_sequentially() {
        let server = Server::bind(0).unwrap();
        let port = server.port();
        tokio::spawn(server.run());

        // Each connection gets its own worker; later connections are
        // unaffected by earlier ones having come and gone.
        for payload in [b"first".as_slice(), b"second", b"third"] {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            stream.write_all(payload).await.unwrap();

            let mut buf = vec![0u8; payload.len()];
            stream.read_exact(&mut buf).await.unwrap();
            assert_eq!(buf, payload);
        }
    }

    #[tokio::test]
    async fn test_concurrent_connections_no_cross_talk() {
        let server = Server::bind(0).unwrap();
        let port = server.port();
        tokio::spawn(server.run());

        let mut tasks = Vec::new();
        for i in 0..8 {
            tasks.push(tokio::spawn(async move {
                let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
                let payload = format!("payload-{i};").repeat(100);
                stream.write_all(payload.as_bytes()).await.unwrap();

                let mut buf = vec![0u8; payload.len()];
                stream.read_exact(&mut buf).await.unwrap();
                assert_eq!(buf, payload.as_bytes());
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
    }
}
