// upstream.rs — The gateway's client for the db-server.
//
// Every call opens a fresh mutually-authenticated connection, sends one
// command line and reads one reply line. Nothing is retried: a failed
// request is reported to the HTTP caller as is.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use veil_records::protocol::{decode_records, HELLO};
use veil_records::{Command, Patient};
use veil_tls::{TlsDialer, TlsError};

use crate::error::UpstreamError;

#[derive(Clone)]
pub struct UpstreamClient {
    dialer: TlsDialer,
    address: String,
    io_timeout: Duration,
}

impl UpstreamClient {
    pub fn new(dialer: TlsDialer, address: impl Into<String>, io_timeout: Duration) -> Self {
        Self {
            dialer,
            address: address.into(),
            io_timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Say hello; returns the server's greeting without its line terminator.
    pub async fn greet(&self) -> Result<String, UpstreamError> {
        let reply = self.exchange(&Command::Greeting(HELLO.to_string())).await?;
        Ok(reply.trim_end().to_string())
    }

    /// Ask for the records this gateway's identity may see.
    pub async fn fetch_records(&self) -> Result<Vec<Patient>, UpstreamError> {
        let reply = self.exchange(&Command::GetData).await?;
        Ok(decode_records(&reply)?)
    }

    async fn exchange(&self, command: &Command) -> Result<String, UpstreamError> {
        let (stream, server) = self.dialer.dial(&self.address).await?;
        tracing::debug!(address = %self.address, %server, ?command, "sending command");

        let round_trip = async {
            let (reader, mut writer) = tokio::io::split(stream);
            writer
                .write_all(command.to_line().as_bytes())
                .await
                .map_err(TlsError::from_io)?;
            writer.flush().await.map_err(TlsError::from_io)?;

            let mut reply = String::new();
            let read = BufReader::new(reader)
                .read_line(&mut reply)
                .await
                .map_err(TlsError::from_io)?;
            if read == 0 {
                return Err(UpstreamError::Closed);
            }
            Ok(reply)
        };

        tokio::time::timeout(self.io_timeout, round_trip)
            .await
            .map_err(|_| UpstreamError::Timeout {
                after: self.io_timeout,
            })?
    }
}
