// db_server.rs — The record service behind mutual TLS.
//
// Connection lifecycle:
//
// 1. TlsListener accepts TCP; the handshake runs on the connection's own task
// 2. The client certificate is verified and authorized inside the handshake
// 3. Each request line is answered:
//      "/getdata..." → redacted records as one JSON line
//      anything else → "Hello <peer identity>"
// 4. EOF from the client ends the session
//
// Fetching and redacting run on the blocking pool under the policy timeout.
// A timeout, a join failure or an unreadable record source all answer with
// an empty record set.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::ToSocketAddrs;
use veil_policy::Identity;
use veil_records::protocol::{encode_records, greeting, Command};
use veil_records::{Patient, RecordSource};
use veil_redact::Redactor;
use veil_tls::rustls::ServerConfig;
use veil_tls::{PendingHandshake, TlsError, TlsListener};

/// Pause after a failed accept (e.g. EMFILE) before accepting again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Answers requests for one verified peer at a time.
#[derive(Clone)]
pub struct RecordService {
    records: Arc<dyn RecordSource>,
    redactor: Redactor,
    redact_timeout: Duration,
}

impl RecordService {
    pub fn new(records: Arc<dyn RecordSource>, redactor: Redactor, redact_timeout: Duration) -> Self {
        Self {
            records,
            redactor,
            redact_timeout,
        }
    }

    /// The record set `peer` is allowed to see.
    pub async fn records_for(&self, peer: &Identity) -> Vec<Patient> {
        let records = Arc::clone(&self.records);
        let redactor = self.redactor.clone();
        let who = peer.clone();
        let work = tokio::task::spawn_blocking(move || match records.fetch() {
            Ok(all) => redactor.redact(&who, &all),
            Err(e) => {
                tracing::warn!(peer = %who, error = %e, "record source failed; returning no records");
                Vec::new()
            }
        });

        match tokio::time::timeout(self.redact_timeout, work).await {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                tracing::error!(%peer, error = %e, "redaction task failed; returning no records");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    %peer,
                    timeout = ?self.redact_timeout,
                    "redaction policy timed out; returning no records"
                );
                Vec::new()
            }
        }
    }

    /// The reply line for one request line.
    pub async fn respond(&self, peer: &Identity, line: &str) -> String {
        match Command::parse(line) {
            Command::GetData => {
                let records = self.records_for(peer).await;
                tracing::info!(%peer, count = records.len(), "sending records");
                encode_records(&records).unwrap_or_else(|e| {
                    tracing::error!(%peer, error = %e, "failed to encode records");
                    "[]\n".to_string()
                })
            }
            Command::Greeting(text) => {
                tracing::info!(%peer, message = %text, "client says");
                greeting(peer.as_str())
            }
        }
    }

    /// Serve request lines from `stream` until the client closes it.
    pub async fn serve_connection<S>(&self, stream: S, peer: Identity) -> std::io::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            let reply = self.respond(&peer, &line).await;
            writer.write_all(reply.as_bytes()).await?;
            writer.flush().await?;
        }
        tracing::debug!(%peer, "client closed the connection");
        writer.shutdown().await
    }
}

/// The db-server: a TLS listener feeding a RecordService.
pub struct RecordServer {
    listener: TlsListener,
    service: RecordService,
}

impl RecordServer {
    pub async fn bind(
        addr: impl ToSocketAddrs,
        tls: Arc<ServerConfig>,
        handshake_timeout: Duration,
        service: RecordService,
    ) -> Result<Self, TlsError> {
        let listener = TlsListener::bind(addr, tls, handshake_timeout).await?;
        Ok(Self { listener, service })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TlsError> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one task each.
    pub async fn run(self) -> Result<(), TlsError> {
        tracing::info!(addr = %self.local_addr()?, "db-server listening");
        loop {
            let Some(pending) = accepted(self.listener.accept().await).await else {
                continue;
            };
            let service = self.service.clone();
            tokio::spawn(async move {
                let remote = pending.remote_addr();
                match pending.complete().await {
                    Ok((stream, peer)) => {
                        tracing::info!(%remote, %peer, "connection authorized");
                        if let Err(e) = service.serve_connection(stream, peer.clone()).await {
                            tracing::debug!(%remote, %peer, error = %e, "connection ended with error");
                        }
                    }
                    Err(e) if e.is_authorization_failure() => {
                        tracing::warn!(%remote, error = %e, "handshake rejected");
                    }
                    Err(e) => {
                        tracing::warn!(%remote, error = %e, "handshake failed");
                    }
                }
            });
        }
    }
}

async fn accepted(result: Result<PendingHandshake, TlsError>) -> Option<PendingHandshake> {
    match result {
        Ok(pending) => Some(pending),
        Err(e) => {
            tracing::warn!(error = %e, backoff = ?ACCEPT_BACKOFF, "accept failed");
            tokio::time::sleep(ACCEPT_BACKOFF).await;
            None
        }
    }
}
