// config.rs — Daemon configuration (veil.toml).
//
// Every section and key has a default, so an empty file is a valid config.
// Relative paths (TLS material, policy, records file) are resolved against
// the directory holding the config file.
//
// The config also knows how to turn itself into the runtime pieces every
// role needs: the policy client, the peer authorizer, the record source and
// the rustls configurations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use veil_policy::{FilePolicySource, PolicyClient, PolicyQueries, RuleEngine};
use veil_records::{JsonFileRecordSource, RecordSource, SampleRecordSource};
use veil_redact::Redactor;
use veil_tls::{
    AuthorizeAny, AuthorizeId, Authorizer, PolicyAuthorizer, RetryPolicy, TlsConfig, TlsDialer,
    TlsMaterial,
};

use crate::error::DaemonError;

/// Top-level configuration from veil.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Our certificate, key and trust bundle.
    pub tls: TlsConfig,
    pub policy: PolicyConfig,
    /// How peers are authorized during the handshake.
    pub authorization: AuthorizationMode,
    pub db_server: DbServerConfig,
    pub gateway: GatewayConfig,
    /// The db-server that the gateway and probe dial.
    pub upstream: UpstreamConfig,
}

/// Where the policy lives and which queries to ask it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_policy_path")]
    pub path: PathBuf,

    #[serde(flatten)]
    pub queries: PolicyQueries,

    /// Upper bound on one redaction evaluation.
    #[serde(default = "default_policy_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            path: default_policy_path(),
            queries: PolicyQueries::default(),
            timeout_secs: default_policy_timeout_secs(),
        }
    }
}

/// Peer authorization strategy:
///
/// ```toml
/// [authorization]
/// mode = "id"
/// id = "spiffe://domain.test/db-server"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthorizationMode {
    /// Accept any peer whose chain verifies.
    Any,
    /// Accept exactly this SPIFFE ID.
    Id { id: String },
    /// Ask the policy's allow query.
    #[default]
    Policy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbServerConfig {
    #[serde(default = "default_db_listen")]
    pub listen: String,

    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,

    /// JSON array of patients; the built-in sample set when absent.
    #[serde(default)]
    pub records_file: Option<PathBuf>,
}

impl Default for DbServerConfig {
    fn default() -> Self {
        Self {
            listen: default_db_listen(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
            records_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_listen")]
    pub listen: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: default_gateway_listen(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// host:port of the db-server.
    #[serde(default = "default_upstream_address")]
    pub address: String,

    /// SNI name sent when dialing.
    #[serde(default = "default_server_name")]
    pub server_name: String,

    /// Bound on TCP connect plus handshake.
    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,

    /// Bound on one request/response exchange after connecting.
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,

    /// Probe only: pause between failed dials.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Probe only: give up after this many dials. Unbounded when absent.
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: default_upstream_address(),
            server_name: default_server_name(),
            dial_timeout_secs: default_dial_timeout_secs(),
            io_timeout_secs: default_io_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            max_attempts: None,
        }
    }
}

// Serde default functions
fn default_policy_path() -> PathBuf {
    PathBuf::from("policy.yaml")
}

fn default_policy_timeout_secs() -> u64 {
    5
}

fn default_db_listen() -> String {
    "0.0.0.0:8082".to_string()
}

fn default_handshake_timeout_secs() -> u64 {
    30
}

fn default_gateway_listen() -> String {
    "0.0.0.0:8002".to_string()
}

fn default_upstream_address() -> String {
    "db:8082".to_string()
}

fn default_server_name() -> String {
    "db".to_string()
}

fn default_dial_timeout_secs() -> u64 {
    120
}

fn default_io_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_secs() -> u64 {
    120
}

impl DaemonConfig {
    /// Load from a TOML file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self, DaemonError> {
        let content = std::fs::read_to_string(path).map_err(|source| DaemonError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: DaemonConfig =
            toml::from_str(&content).map_err(|source| DaemonError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Make relative file paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.tls.certificate);
        resolve(&mut self.tls.private_key);
        resolve(&mut self.tls.trust_bundle);
        resolve(&mut self.policy.path);
        if let Some(records) = self.db_server.records_file.as_mut() {
            resolve(records);
        }
    }

    /// A client over the policy file, re-read on every evaluation.
    pub fn policy_client(&self) -> PolicyClient {
        PolicyClient::new(
            Arc::new(RuleEngine::new()),
            Arc::new(FilePolicySource::new(&self.policy.path)),
        )
    }

    pub fn authorizer(&self, client: &PolicyClient) -> Arc<dyn Authorizer> {
        match &self.authorization {
            AuthorizationMode::Any => Arc::new(AuthorizeAny),
            AuthorizationMode::Id { id } => Arc::new(AuthorizeId::new(id.as_str())),
            AuthorizationMode::Policy => Arc::new(PolicyAuthorizer::new(
                client.clone(),
                self.policy.queries.allow.as_str(),
            )),
        }
    }

    pub fn redactor(&self, client: &PolicyClient) -> Redactor {
        Redactor::new(client.clone(), self.policy.queries.pii_fields.as_str())
    }

    pub fn record_source(&self) -> Arc<dyn RecordSource> {
        match &self.db_server.records_file {
            Some(path) => Arc::new(JsonFileRecordSource::new(path)),
            None => Arc::new(SampleRecordSource),
        }
    }

    pub fn tls_material(&self) -> Result<TlsMaterial, DaemonError> {
        Ok(TlsMaterial::load(&self.tls)?)
    }

    /// Dialer for the configured upstream, authorizing the server with
    /// `authorizer`.
    pub fn dialer(
        &self,
        material: &TlsMaterial,
        authorizer: Arc<dyn Authorizer>,
    ) -> Result<TlsDialer, DaemonError> {
        let config = veil_tls::client_config(material, authorizer)?;
        Ok(TlsDialer::new(
            config,
            &self.upstream.server_name,
            self.dial_timeout(),
        )?)
    }

    pub fn policy_timeout(&self) -> Duration {
        Duration::from_secs(self.policy.timeout_secs)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.db_server.handshake_timeout_secs)
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.dial_timeout_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.io_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            delay: Duration::from_secs(self.upstream.retry_delay_secs),
            max_attempts: self.upstream.max_attempts,
        }
    }
}
