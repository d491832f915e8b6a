// dialer.rs — Outbound mutually-authenticated TLS connections.
//
// The dial timeout covers TCP connect and the TLS handshake together.
// dial_with_retry() keeps trying on a fixed delay, which is how long-running
// clients wait for a server that is not up yet.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::TlsConnector;
use veil_policy::Identity;

use crate::error::TlsError;
use crate::identity::peer_identity;

/// How dial_with_retry() spaces and bounds its attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

#[derive(Clone)]
pub struct TlsDialer {
    connector: TlsConnector,
    server_name: ServerName<'static>,
    timeout: Duration,
}

impl TlsDialer {
    /// `server_name` is sent as SNI; it must be a DNS name or IP address.
    pub fn new(config: Arc<ClientConfig>, server_name: &str, timeout: Duration) -> Result<Self, TlsError> {
        let server_name = ServerName::try_from(server_name.to_string())
            .map_err(|_| TlsError::InvalidServerName(server_name.to_string()))?;
        Ok(Self {
            connector: TlsConnector::from(config),
            server_name,
            timeout,
        })
    }

    /// Connect once. Returns the stream and the authorized server identity.
    pub async fn dial(&self, addr: &str) -> Result<(TlsStream<TcpStream>, Identity), TlsError> {
        let connect = async {
            let tcp = TcpStream::connect(addr).await?;
            self.connector
                .connect(self.server_name.clone(), tcp)
                .await
                .map_err(TlsError::from_io)
        };
        let stream = tokio::time::timeout(self.timeout, connect)
            .await
            .map_err(|_| TlsError::HandshakeTimeout { after: self.timeout })??;
        let (_, connection) = stream.get_ref();
        let peer = peer_identity(connection.peer_certificates())?;
        tracing::debug!(%addr, %peer, "connected");
        Ok((stream, peer))
    }

    /// Connect, retrying every `policy.delay` until it works or the attempt
    /// budget runs out. The last error is returned.
    pub async fn dial_with_retry(
        &self,
        addr: &str,
        policy: &RetryPolicy,
    ) -> Result<(TlsStream<TcpStream>, Identity), TlsError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.dial(addr).await {
                Ok(connected) => return Ok(connected),
                Err(e) => {
                    if policy.max_attempts.is_some_and(|max| attempt >= max) {
                        return Err(e);
                    }
                    tracing::warn!(
                        %addr,
                        attempt,
                        error = %e,
                        retry_in = ?policy.delay,
                        "unable to connect, retrying"
                    );
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
}
