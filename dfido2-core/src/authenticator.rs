//! Platform authenticator
//!
//! [`Authenticator`] is the seam the ceremony orchestrator drives. The
//! shipped implementation, [`PlatformAuthenticator`], is an on-device
//! authenticator: it keeps resident credentials in a [`CredentialStore`],
//! seals non-resident ones into their credential IDs and asks the user for
//! consent through a [`ConsentProvider`].

use crate::attestation::AttestationObject;
use crate::callbacks::{
    ConsentProvider, ConstantSignCount, CredentialStore, FirstCredential, KeyStore,
    SelectionPolicy, SignCounter,
};
use crate::cbor::MapOrdering;
use crate::commands;
use crate::credential::PublicKeyCredentialSource;
use crate::request::{AssertionResult, GetAssertionRequest, MakeCredentialRequest};
use crate::status::{Error, Result};
use crate::types::{AuthenticatorAttachment, AuthenticatorTransport, CoseAlgorithm};
use crate::wrapping::CredentialWrapper;

use async_trait::async_trait;
use dfido2_crypto::DEFAULT_WRAPPING_KEY_BITS;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{debug, info};

/// Authenticator configuration
///
/// Deserializable so hosts can ship it as JSON; missing fields take their
/// defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthenticatorConfig {
    /// AAGUID written into attested credential data
    ///
    /// Default: all zero, which marks packed self attestation. In JSON it is
    /// a hex string; dashes are ignored so UUID notation works too.
    #[serde(deserialize_with = "aaguid_from_hex")]
    pub aaguid: [u8; 16],

    /// Supported algorithms, in no particular order
    ///
    /// Negotiation walks the RP's list and picks the first entry found here.
    pub algorithms: Vec<CoseAlgorithm>,

    /// Whether credentials can be stored on the device
    pub resident_storage: bool,

    /// Whether resident credentials can be listed without an allow list
    ///
    /// Requires `resident_storage`.
    pub silent_discovery: bool,

    /// Whether the consent prompt verifies the user (biometric / passcode)
    pub user_verification: bool,

    /// RSA modulus size of the credential wrapping key
    pub wrapping_key_bits: usize,

    /// Map ordering used for everything this authenticator serializes
    pub map_ordering: MapOrdering,
}

impl AuthenticatorConfig {
    /// Create a new authenticator configuration with defaults
    pub fn new() -> Self {
        Self {
            aaguid: [0u8; 16],
            algorithms: CoseAlgorithm::ALL.to_vec(),
            resident_storage: true,
            silent_discovery: true,
            user_verification: true,
            wrapping_key_bits: DEFAULT_WRAPPING_KEY_BITS,
            map_ordering: MapOrdering::Insertion,
        }
    }

    /// Set AAGUID
    pub fn with_aaguid(mut self, aaguid: [u8; 16]) -> Self {
        self.aaguid = aaguid;
        self
    }

    /// Set supported algorithms
    pub fn with_algorithms(mut self, algorithms: Vec<CoseAlgorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Enable or disable resident storage
    ///
    /// Disabling it also disables silent discovery, which has nothing to list
    /// without stored credentials.
    pub fn with_resident_storage(mut self, enabled: bool) -> Self {
        self.resident_storage = enabled;
        if !enabled && self.silent_discovery {
            info!("Resident storage disabled, disabling silent discovery");
            self.silent_discovery = false;
        }
        self
    }

    /// Enable or disable silent discovery
    ///
    /// Enabling it also enables resident storage.
    pub fn with_silent_discovery(mut self, enabled: bool) -> Self {
        self.silent_discovery = enabled;
        if enabled && !self.resident_storage {
            info!("Silent discovery enabled, enabling resident storage");
            self.resident_storage = true;
        }
        self
    }

    pub fn with_user_verification(mut self, enabled: bool) -> Self {
        self.user_verification = enabled;
        self
    }

    /// Set wrapping key size (2048, 3072 or 4096)
    pub fn with_wrapping_key_bits(mut self, bits: usize) -> Self {
        self.wrapping_key_bits = bits;
        self
    }

    pub fn with_map_ordering(mut self, ordering: MapOrdering) -> Self {
        self.map_ordering = ordering;
        self
    }

    /// Bring deserialized toggles back in line with the builder's coupling
    ///
    /// Silent discovery without resident storage is meaningless; resident
    /// storage wins.
    pub fn normalized(mut self) -> Self {
        if self.silent_discovery && !self.resident_storage {
            debug!("Silent discovery requires resident storage, disabling it");
            self.silent_discovery = false;
        }
        self
    }
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn aaguid_from_hex<'de, D>(deserializer: D) -> core::result::Result<[u8; 16], D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let mut aaguid = [0u8; 16];
    hex::decode_to_slice(text.replace('-', ""), &mut aaguid).map_err(serde::de::Error::custom)?;
    Ok(aaguid)
}

/// An authenticator the orchestrator can drive
///
/// Object safe; the orchestrator holds `Arc<dyn Authenticator>`.
#[async_trait]
pub trait Authenticator: Send + Sync {
    fn attachment(&self) -> AuthenticatorAttachment;

    fn transport(&self) -> AuthenticatorTransport;

    fn can_store_resident_key(&self) -> bool;

    fn can_perform_user_verification(&self) -> bool;

    fn can_silent_credential_discovery(&self) -> bool;

    /// `authenticatorMakeCredential`
    async fn make_credential(&self, request: MakeCredentialRequest) -> Result<AttestationObject>;

    /// `authenticatorGetAssertion`
    async fn get_assertion(&self, request: GetAssertionRequest) -> Result<AssertionResult>;

    /// Resolve one credential ID for an RP
    async fn lookup_credential_source(
        &self,
        rp_id: &str,
        credential_id: &[u8],
    ) -> Result<Option<PublicKeyCredentialSource>>;

    /// List the resident credentials of an RP without user interaction
    async fn silent_credential_discovery(
        &self,
        rp_id: &str,
    ) -> Result<Vec<PublicKeyCredentialSource>>;

    /// Delete resident credentials of one RP, or of every RP when `None`
    async fn clear_keys(&self, rp_id: Option<&str>) -> Result<()>;

    /// Delete every credential and the wrapping key
    async fn reset(&self) -> Result<()>;
}

/// On-device authenticator (attachment `platform`, transport `internal`)
pub struct PlatformAuthenticator {
    config: AuthenticatorConfig,
    store: Arc<dyn CredentialStore>,
    wrapper: CredentialWrapper,
    consent: Arc<dyn ConsentProvider>,
    selection: Arc<dyn SelectionPolicy>,
    sign_counter: Arc<dyn SignCounter>,
}

impl PlatformAuthenticator {
    /// Create an authenticator over the given platform capabilities
    ///
    /// Selection defaults to the first candidate and the signature counter
    /// to a constant zero.
    pub fn new(
        config: AuthenticatorConfig,
        store: Arc<dyn CredentialStore>,
        key_store: Arc<dyn KeyStore>,
        consent: Arc<dyn ConsentProvider>,
    ) -> Self {
        let config = config.normalized();
        let wrapper =
            CredentialWrapper::new(key_store, config.wrapping_key_bits, config.map_ordering);
        Self {
            config,
            store,
            wrapper,
            consent,
            selection: Arc::new(FirstCredential),
            sign_counter: Arc::new(ConstantSignCount),
        }
    }

    pub fn with_selection_policy(mut self, selection: Arc<dyn SelectionPolicy>) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_sign_counter(mut self, sign_counter: Arc<dyn SignCounter>) -> Self {
        self.sign_counter = sign_counter;
        self
    }

    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    pub(crate) fn wrapper(&self) -> &CredentialWrapper {
        &self.wrapper
    }

    pub(crate) fn consent(&self) -> &dyn ConsentProvider {
        self.consent.as_ref()
    }

    pub(crate) fn selection(&self) -> &dyn SelectionPolicy {
        self.selection.as_ref()
    }

    pub(crate) fn sign_counter(&self) -> &dyn SignCounter {
        self.sign_counter.as_ref()
    }
}

#[async_trait]
impl Authenticator for PlatformAuthenticator {
    fn attachment(&self) -> AuthenticatorAttachment {
        AuthenticatorAttachment::Platform
    }

    fn transport(&self) -> AuthenticatorTransport {
        AuthenticatorTransport::Internal
    }

    fn can_store_resident_key(&self) -> bool {
        self.config.resident_storage
    }

    fn can_perform_user_verification(&self) -> bool {
        self.config.user_verification
    }

    fn can_silent_credential_discovery(&self) -> bool {
        self.config.silent_discovery
    }

    async fn make_credential(&self, request: MakeCredentialRequest) -> Result<AttestationObject> {
        commands::make_credential::handle(self, request).await
    }

    async fn get_assertion(&self, request: GetAssertionRequest) -> Result<AssertionResult> {
        commands::get_assertion::handle(self, request).await
    }

    /// Resident lookup first, then the ID is tried as a wrapped credential
    async fn lookup_credential_source(
        &self,
        rp_id: &str,
        credential_id: &[u8],
    ) -> Result<Option<PublicKeyCredentialSource>> {
        if let Some(source) = self.store.lookup(rp_id, credential_id)? {
            return Ok(Some(source));
        }
        match self.wrapper.unwrap(credential_id).await {
            Ok(source) if source.rp_id == rp_id => Ok(Some(source)),
            Ok(_) | Err(_) => Ok(None),
        }
    }

    async fn silent_credential_discovery(
        &self,
        rp_id: &str,
    ) -> Result<Vec<PublicKeyCredentialSource>> {
        if !self.config.silent_discovery {
            return Err(Error::not_supported("silent credential discovery is disabled"));
        }
        let sources = self.store.load_all(rp_id)?;
        debug!(rp_id, count = sources.len(), "Silent credential discovery");
        Ok(sources)
    }

    async fn clear_keys(&self, rp_id: Option<&str>) -> Result<()> {
        self.store.remove_all(&[], rp_id)?;
        info!(rp_id = rp_id.unwrap_or("*"), "Cleared resident credentials");
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.store.remove_all(&[], None)?;
        self.wrapper.reset().await?;
        info!("Authenticator reset");
        Ok(())
    }
}

impl core::fmt::Debug for PlatformAuthenticator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlatformAuthenticator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AuthenticatorConfig::default();
        assert_eq!(config.aaguid, [0u8; 16]);
        assert_eq!(config.algorithms, CoseAlgorithm::ALL.to_vec());
        assert!(config.resident_storage);
        assert!(config.silent_discovery);
        assert!(config.user_verification);
        assert_eq!(config.wrapping_key_bits, 4096);
        assert_eq!(config.map_ordering, MapOrdering::Insertion);
    }

    #[test]
    fn test_resident_storage_off_disables_discovery() {
        let config = AuthenticatorConfig::new().with_resident_storage(false);
        assert!(!config.resident_storage);
        assert!(!config.silent_discovery);
    }

    #[test]
    fn test_discovery_on_enables_resident_storage() {
        let config = AuthenticatorConfig::new()
            .with_resident_storage(false)
            .with_silent_discovery(true);
        assert!(config.resident_storage);
        assert!(config.silent_discovery);
    }

    #[test]
    fn test_discovery_off_keeps_resident_storage() {
        let config = AuthenticatorConfig::new().with_silent_discovery(false);
        assert!(config.resident_storage);
        assert!(!config.silent_discovery);
    }

    #[test]
    fn test_config_from_json() {
        let config: AuthenticatorConfig = serde_json::from_str(
            r#"{
                "aaguid": "6f158274-aab6-443d-9bcf-8a3f69297c88",
                "algorithms": [-7, -257],
                "residentStorage": false,
                "mapOrdering": "canonical"
            }"#,
        )
        .unwrap();

        assert_eq!(config.aaguid[..4], [0x6f, 0x15, 0x82, 0x74]);
        assert_eq!(config.algorithms, vec![CoseAlgorithm::Es256, CoseAlgorithm::Rs256]);
        assert!(!config.resident_storage);
        assert_eq!(config.map_ordering, MapOrdering::Canonical);
        // Untouched fields keep their defaults
        assert!(config.user_verification);
        assert_eq!(config.wrapping_key_bits, 4096);
        // Coupling is applied by normalized(), not by serde
        assert!(!config.normalized().silent_discovery);
    }

    #[test]
    fn test_config_from_json_rejects_bad_aaguid() {
        assert!(serde_json::from_str::<AuthenticatorConfig>(r#"{"aaguid": "abcd"}"#).is_err());
        assert!(serde_json::from_str::<AuthenticatorConfig>(r#"{"algorithms": [-8]}"#).is_err());
    }

    #[test]
    fn test_normalized() {
        let mut config = AuthenticatorConfig::new();
        config.resident_storage = false;
        let config = config.normalized();
        assert!(!config.silent_discovery);
    }
}
