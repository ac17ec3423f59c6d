//! Client configuration
//!
//! Everything is passed to [`Client`](crate::Client) at construction; there
//! is no process-wide state.

use crate::{AuthenticatorConfig, Error, Result};

use serde::Deserialize;

/// Ceremony orchestrator configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Configuration of the built-in platform authenticator
    pub authenticator: AuthenticatorConfig,

    /// Hold a failed ceremony until its timeout expires
    ///
    /// Makes "no credential" indistinguishable from "user declined" by
    /// response time. Disabling it lets RPs enumerate accounts.
    ///
    /// Default: true
    pub wait_on_failure: bool,

    /// Allow registering the same account once per transport
    ///
    /// When set, exclude-list entries that name the authenticator's own
    /// transport are not passed to it.
    ///
    /// Default: false
    pub multi_transport_registration: bool,

    /// RP IDs allowed to request enterprise attestation
    pub enterprise_rp_ids: Vec<String>,

    /// Keep a per-RP list of registered accounts in the key store
    ///
    /// Default: false
    pub accounts_list: bool,
}

impl Config {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            authenticator: AuthenticatorConfig::new(),
            wait_on_failure: true,
            multi_transport_registration: false,
            enterprise_rp_ids: Vec::new(),
            accounts_list: false,
        }
    }

    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(json)
            .map_err(|e| Error::bad_data(format!("invalid configuration: {e}")))?;
        config.authenticator = config.authenticator.normalized();
        Ok(config)
    }

    pub fn with_authenticator(mut self, authenticator: AuthenticatorConfig) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn with_wait_on_failure(mut self, wait: bool) -> Self {
        self.wait_on_failure = wait;
        self
    }

    pub fn with_multi_transport_registration(mut self, enabled: bool) -> Self {
        self.multi_transport_registration = enabled;
        self
    }

    /// Add RP IDs to the enterprise attestation allow list
    pub fn with_enterprise_rp_ids<I, S>(mut self, rp_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enterprise_rp_ids.extend(rp_ids.into_iter().map(Into::into));
        self
    }

    pub fn with_accounts_list(mut self, enabled: bool) -> Self {
        self.accounts_list = enabled;
        self
    }

    /// True when `rp_id` may receive enterprise attestation
    pub fn enterprise_rp(&self, rp_id: &str) -> bool {
        self.enterprise_rp_ids.iter().any(|id| id == rp_id)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
