//! Credential resolution.
//!
//! Explicit values win over the layered [`ConfigSource`], which itself puts
//! the process environment ahead of any env file. A value that cannot be
//! found anywhere is reported before any request is made.

use crate::error::{ConfigError, CredentialField, Result};

use super::source::ConfigSource;

/// `RunPod` API credentials. The key is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Wraps an API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Returns the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns true if no usable key is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.api_key.trim().is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Resolves the API key and pod identifier for one invocation.
#[derive(Debug, Clone, Default)]
pub struct CredentialResolver {
    api_key: Option<String>,
    pod_id: Option<String>,
    source: ConfigSource,
}

impl CredentialResolver {
    /// Creates a resolver over a configuration source.
    #[must_use]
    pub fn new(source: ConfigSource) -> Self {
        Self {
            api_key: None,
            pod_id: None,
            source,
        }
    }

    /// Sets an explicit API key, taking priority over the source.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Sets an explicit pod identifier, taking priority over the source.
    #[must_use]
    pub fn with_pod_id(mut self, pod_id: Option<String>) -> Self {
        self.pod_id = pod_id;
        self
    }

    fn lookup(&self, explicit: Option<&String>, field: CredentialField) -> Option<String> {
        explicit
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .or_else(|| self.source.get(field.key()).map(str::trim))
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    }

    /// Resolves only the API key, for operations that need no pod.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if no key is configured.
    pub fn resolve_api_key(&self) -> Result<Credentials> {
        self.lookup(self.api_key.as_ref(), CredentialField::ApiKey)
            .map(Credentials::new)
            .ok_or_else(|| {
                ConfigError::MissingCredential {
                    missing: vec![CredentialField::ApiKey],
                }
                .into()
            })
    }

    /// Resolves both the API key and the pod identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] naming every absent value.
    pub fn resolve(&self) -> Result<(Credentials, String)> {
        let api_key = self.lookup(self.api_key.as_ref(), CredentialField::ApiKey);
        let pod_id = self.lookup(self.pod_id.as_ref(), CredentialField::PodId);

        match (api_key, pod_id) {
            (Some(key), Some(id)) => Ok((Credentials::new(key), id)),
            (key, id) => {
                let missing = [
                    (key.is_none(), CredentialField::ApiKey),
                    (id.is_none(), CredentialField::PodId),
                ]
                .into_iter()
                .filter_map(|(absent, field)| absent.then_some(field))
                .collect();
                Err(ConfigError::MissingCredential { missing }.into())
            }
        }
    }
}
