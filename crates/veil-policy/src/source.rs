// source.rs — Policy source providers.
//
// A PolicySource hands out the *current* policy bytes. The file-backed
// provider reads the file on every call, so a policy edit takes effect on the
// very next handshake or redaction. A provider that caches (e.g. with a
// debounce) can be swapped in behind the same trait without touching callers.

use std::path::{Path, PathBuf};

use crate::error::PolicyError;

/// Pluggable provider of policy source bytes.
///
/// `Send + Sync` because one source is shared by every connection task.
pub trait PolicySource: Send + Sync {
    /// Load the policy as it is right now.
    fn load_current_policy(&self) -> Result<Vec<u8>, PolicyError>;

    /// Human-readable name for logs and error messages (e.g. the file path).
    fn name(&self) -> String;
}

/// Reads the policy from a file on every call.
#[derive(Debug, Clone)]
pub struct FilePolicySource {
    path: PathBuf,
}

impl FilePolicySource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PolicySource for FilePolicySource {
    fn load_current_policy(&self) -> Result<Vec<u8>, PolicyError> {
        std::fs::read(&self.path).map_err(|error| PolicyError::SourceUnreadable {
            source_name: self.name(),
            error,
        })
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fixed, in-memory policy bytes.
#[derive(Debug, Clone)]
pub struct StaticPolicySource {
    policy: Vec<u8>,
}

impl StaticPolicySource {
    pub fn new(policy: impl Into<Vec<u8>>) -> Self {
        Self {
            policy: policy.into(),
        }
    }
}

impl PolicySource for StaticPolicySource {
    fn load_current_policy(&self) -> Result<Vec<u8>, PolicyError> {
        Ok(self.policy.clone())
    }

    fn name(&self) -> String {
        "<static policy>".to_string()
    }
}
