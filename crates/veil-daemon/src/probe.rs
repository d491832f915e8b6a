// probe.rs — Long-running reconnect client.
//
// Dials the db-server with a fixed delay between failed attempts, says
// hello, closes its sending side and then logs every line the server sends
// until the server closes the connection.

use std::io::ErrorKind;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use veil_records::protocol::HELLO;
use veil_records::Command;
use veil_tls::{RetryPolicy, TlsDialer, TlsError};

use crate::error::UpstreamError;

/// Run one probe session. Returns how many lines the server sent.
pub async fn run_probe(
    dialer: &TlsDialer,
    address: &str,
    retry: &RetryPolicy,
) -> Result<usize, UpstreamError> {
    let (stream, server) = dialer.dial_with_retry(address, retry).await?;
    tracing::info!(%address, %server, "created TLS connection");

    let (reader, mut writer) = tokio::io::split(stream);
    let hello = Command::Greeting(HELLO.to_string()).to_line();
    writer
        .write_all(hello.as_bytes())
        .await
        .map_err(TlsError::from_io)?;
    writer.shutdown().await.map_err(TlsError::from_io)?;

    let mut lines = BufReader::new(reader).lines();
    let mut received = 0;
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                received += 1;
                tracing::info!(server_says = %line, "server says");
            }
            Ok(None) => break,
            // Some servers drop the socket without a TLS close_notify.
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(TlsError::from_io(e).into()),
        }
    }
    tracing::info!(%server, received, "server closed the connection");
    Ok(received)
}
