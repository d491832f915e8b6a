// listener.rs — Accepting mutually-authenticated TLS connections.
//
// accept() only takes the TCP connection; the handshake is finished by
// PendingHandshake::complete(), normally on the per-connection task, so one
// slow or hostile client cannot stall the accept loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::server::TlsStream;
use tokio_rustls::TlsAcceptor;
use veil_policy::Identity;

use crate::error::TlsError;
use crate::identity::peer_identity;

pub struct TlsListener {
    listener: TcpListener,
    acceptor: TlsAcceptor,
    handshake_timeout: Duration,
}

impl TlsListener {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        config: Arc<ServerConfig>,
        handshake_timeout: Duration,
    ) -> Result<Self, TlsError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(config),
            handshake_timeout,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TlsError> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the next TCP connection.
    pub async fn accept(&self) -> Result<PendingHandshake, TlsError> {
        let (stream, remote) = self.listener.accept().await?;
        Ok(PendingHandshake {
            stream,
            remote,
            acceptor: self.acceptor.clone(),
            timeout: self.handshake_timeout,
        })
    }
}

/// A TCP connection whose TLS handshake has not run yet.
pub struct PendingHandshake {
    stream: TcpStream,
    remote: SocketAddr,
    acceptor: TlsAcceptor,
    timeout: Duration,
}

impl PendingHandshake {
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }

    /// Run the handshake and return the stream plus the authorized client
    /// identity.
    ///
    /// The timeout only fires between polls. Certificate authorization runs
    /// synchronously inside the handshake, so an authorizer that blocks (a
    /// [`PolicyAuthorizer`](crate::PolicyAuthorizer) reading a policy file
    /// from a stalled filesystem, say) holds this task's worker thread until
    /// it returns, and the timeout is only observed afterwards.
    pub async fn complete(self) -> Result<(TlsStream<TcpStream>, Identity), TlsError> {
        let stream = tokio::time::timeout(self.timeout, self.acceptor.accept(self.stream))
            .await
            .map_err(|_| TlsError::HandshakeTimeout { after: self.timeout })?
            .map_err(TlsError::from_io)?;
        let (_, connection) = stream.get_ref();
        let peer = peer_identity(connection.peer_certificates())?;
        Ok((stream, peer))
    }
}
