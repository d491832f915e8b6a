// error.rs — Error types for the daemon.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use veil_policy::Identity;
use veil_records::RecordError;
use veil_tls::TlsError;

/// Startup failures: configuration and listener setup.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// Failures talking to the db-server on behalf of a gateway request.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("db-server closed the connection without answering")]
    Closed,

    #[error("malformed response from db-server: {0}")]
    Decode(#[from] RecordError),

    #[error("db-server did not answer within {after:?}")]
    Timeout { after: Duration },
}

impl UpstreamError {
    /// The human-readable `reason` reported to the HTTP caller. `local` is
    /// the identity this gateway presented upstream.
    pub fn reason(&self, local: &Identity) -> String {
        match self {
            UpstreamError::Tls(TlsError::RejectedByPeer) => {
                format!("Policy denied request: unexpected peer ID {}", local)
            }
            UpstreamError::Tls(TlsError::Denied { identity }) => {
                format!("Policy denied db-server: unexpected peer ID {}", identity)
            }
            other => other.to_string(),
        }
    }
}
