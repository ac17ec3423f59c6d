//! Ceremony orchestrator
//!
//! [`Client`] plays the WebAuthn client role: it turns RP options into
//! authenticator requests, walks its authenticators in order until one
//! succeeds, and shapes the result into a `PublicKeyCredential`.
//!
//! A failed search is held until the ceremony timeout expires (see
//! [`Config::wait_on_failure`]) so a missing credential and a declined
//! prompt look the same to the RP.
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#sctn-createCredential>

mod client_data;
mod create;
mod get;
pub mod timeout;

pub use client_data::{ClientData, ClientDataType};

use crate::accounts::{Account, AccountsList};
use crate::config::Config;
use crate::options::{
    AuthenticatorSelectionCriteria, ResidentKeyRequirement, UserVerificationRequirement,
};
use crate::{
    Authenticator, ConsentProvider, CredentialStore, Error, FirstCredential, KeyStore,
    PlatformAuthenticator, Result, SelectionPolicy,
};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use timeout::LifetimeTimer;
use tracing::{debug, info};
use url::Url;

/// WebAuthn client driving one ceremony at a time
pub struct Client {
    config: Config,
    authenticators: Vec<Arc<dyn Authenticator>>,
    selection: Arc<dyn SelectionPolicy>,
    accounts: AccountsList,
    cancelled: AtomicBool,
}

impl Client {
    /// Create a client over an ordered list of authenticators
    ///
    /// # Arguments
    ///
    /// * `config` - Client configuration
    /// * `key_store` - Backing store of the accounts list
    /// * `authenticators` - Tried in order on every ceremony
    pub fn new(
        config: Config,
        key_store: Arc<dyn KeyStore>,
        authenticators: Vec<Arc<dyn Authenticator>>,
    ) -> Self {
        Self {
            config,
            authenticators,
            selection: Arc::new(FirstCredential),
            accounts: AccountsList::new(key_store),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Create a client with a single [`PlatformAuthenticator`] built from
    /// `config.authenticator`
    pub fn platform(
        config: Config,
        store: Arc<dyn CredentialStore>,
        key_store: Arc<dyn KeyStore>,
        consent: Arc<dyn ConsentProvider>,
    ) -> Self {
        let authenticator = PlatformAuthenticator::new(
            config.authenticator.clone(),
            store,
            key_store.clone(),
            consent,
        );
        let authenticators: Vec<Arc<dyn Authenticator>> = vec![Arc::new(authenticator)];
        Self::new(config, key_store, authenticators)
    }

    /// Policy picking the account offered by conditional mediation
    pub fn with_selection_policy(mut self, selection: Arc<dyn SelectionPolicy>) -> Self {
        self.selection = selection;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stop the ceremony before its next authenticator
    ///
    /// A call already in progress runs to completion. A cancel issued
    /// while no ceremony runs applies to the next one.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Accounts recorded for `rp_id`
    pub fn accounts(&self, rp_id: &str) -> Result<Vec<Account>> {
        self.accounts.list(rp_id)
    }

    /// Delete resident credentials and recorded accounts of one RP, or of
    /// every RP when `None`
    pub async fn clear_keys(&self, rp_id: Option<&str>) -> Result<()> {
        for authenticator in &self.authenticators {
            authenticator.clear_keys(rp_id).await?;
        }
        self.accounts.clear(rp_id)
    }

    /// Return every authenticator to its initial state
    pub async fn reset(&self) -> Result<()> {
        for authenticator in &self.authenticators {
            authenticator.reset().await?;
        }
        self.accounts.clear(None)?;
        info!("Client reset");
        Ok(())
    }

    fn take_cancelled(&self) -> bool {
        self.cancelled.swap(false, Ordering::SeqCst)
    }

    /// Error of a ceremony no authenticator completed
    ///
    /// Always `NotAllowed`, so a declined prompt cannot be told apart from a
    /// missing credential or a lifetime that ran out. When configured, the
    /// ceremony is first held for whatever lifetime is left.
    async fn no_credential(&self, timer: &LifetimeTimer) -> Error {
        if self.config.wait_on_failure && !timer.is_expired() {
            if let Some(remaining) = timer.remaining() {
                debug!(wait_ms = remaining.as_millis() as u64, "Holding failed ceremony");
                tokio::time::sleep(remaining).await;
            }
        }
        Error::not_allowed("no authenticator completed the ceremony")
    }
}

impl core::fmt::Debug for Client {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("authenticators", &self.authenticators.len())
            .finish_non_exhaustive()
    }
}

/// RP ID of a ceremony: the explicit one, else the origin's host
fn pick_rp_id(rp_id: Option<&str>, origin: &str) -> String {
    if let Some(rp_id) = rp_id {
        return rp_id.to_string();
    }
    Url::parse(origin)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| origin.to_string())
}

/// Whether to ask the authenticator for user verification
fn judge_user_verification(
    requirement: Option<UserVerificationRequirement>,
    capable: bool,
) -> bool {
    match requirement {
        Some(UserVerificationRequirement::Required) => true,
        Some(UserVerificationRequirement::Discouraged) => false,
        Some(UserVerificationRequirement::Preferred) | None => capable,
    }
}

/// Whether to ask the authenticator for a resident credential
fn effective_resident_key(criteria: Option<&AuthenticatorSelectionCriteria>, capable: bool) -> bool {
    let Some(criteria) = criteria else {
        return capable;
    };
    criteria.require_resident_key.unwrap_or(false)
        || match criteria.resident_key {
            Some(ResidentKeyRequirement::Required) => true,
            Some(ResidentKeyRequirement::Preferred) => capable,
            Some(ResidentKeyRequirement::Discouraged) | None => false,
        }
}

/// Why `authenticator` cannot serve a registration, if it cannot
fn creation_skip_reason(
    criteria: &AuthenticatorSelectionCriteria,
    authenticator: &dyn Authenticator,
) -> Option<&'static str> {
    if criteria
        .authenticator_attachment
        .is_some_and(|attachment| attachment != authenticator.attachment())
    {
        return Some("attachment mismatch");
    }

    let resident_required = match criteria.resident_key {
        Some(requirement) => requirement == ResidentKeyRequirement::Required,
        None => criteria.require_resident_key.unwrap_or(false),
    };
    if resident_required && !authenticator.can_store_resident_key() {
        return Some("resident key required but not supported");
    }

    if criteria.user_verification == Some(UserVerificationRequirement::Required)
        && !authenticator.can_perform_user_verification()
    {
        return Some("user verification required but not supported");
    }
    None
}
