//! Authenticator operation inputs and outputs
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#sctn-op-make-cred>

use crate::cbor::Map;
use crate::types::{CoseAlgorithm, PublicKeyCredentialDescriptor, RelyingParty, User};

/// Input of `authenticatorMakeCredential`
#[derive(Debug, Clone)]
pub struct MakeCredentialRequest {
    /// Text shown in the consent prompt
    pub message: String,
    pub client_data_hash: [u8; 32],
    pub rp: RelyingParty,
    pub user: User,
    pub require_resident_key: bool,
    pub require_user_presence: bool,
    pub require_user_verification: bool,
    /// Acceptable algorithms in RP preference order
    pub algorithms: Vec<CoseAlgorithm>,
    pub exclude_list: Vec<PublicKeyCredentialDescriptor>,
    pub enterprise_attestation_possible: bool,
    /// Extension outputs to place in the authenticator data
    pub extensions: Map,
}

impl MakeCredentialRequest {
    /// Request with defaults: user presence only, ES256
    pub fn new(client_data_hash: [u8; 32], rp: RelyingParty, user: User) -> Self {
        Self {
            message: String::new(),
            client_data_hash,
            rp,
            user,
            require_resident_key: false,
            require_user_presence: true,
            require_user_verification: false,
            algorithms: vec![CoseAlgorithm::Es256],
            exclude_list: Vec::new(),
            enterprise_attestation_possible: false,
            extensions: Map::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_resident_key(mut self, require: bool) -> Self {
        self.require_resident_key = require;
        self
    }

    /// Sets UV and, as its complement, UP
    pub fn with_user_verification(mut self, require: bool) -> Self {
        self.require_user_verification = require;
        self.require_user_presence = !require;
        self
    }

    pub fn with_algorithms(mut self, algorithms: Vec<CoseAlgorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    pub fn with_exclude_list(mut self, exclude_list: Vec<PublicKeyCredentialDescriptor>) -> Self {
        self.exclude_list = exclude_list;
        self
    }

    pub fn with_enterprise_attestation(mut self, possible: bool) -> Self {
        self.enterprise_attestation_possible = possible;
        self
    }
}

/// Input of `authenticatorGetAssertion`
#[derive(Debug, Clone)]
pub struct GetAssertionRequest {
    pub message: String,
    pub rp_id: String,
    pub client_data_hash: [u8; 32],
    /// Empty means any resident credential of the RP
    pub allow_list: Vec<PublicKeyCredentialDescriptor>,
    pub require_user_presence: bool,
    pub require_user_verification: bool,
    pub extensions: Map,
}

impl GetAssertionRequest {
    pub fn new(rp_id: impl Into<String>, client_data_hash: [u8; 32]) -> Self {
        Self {
            message: String::new(),
            rp_id: rp_id.into(),
            client_data_hash,
            allow_list: Vec::new(),
            require_user_presence: true,
            require_user_verification: false,
            extensions: Map::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_allow_list(mut self, allow_list: Vec<PublicKeyCredentialDescriptor>) -> Self {
        self.allow_list = allow_list;
        self
    }

    /// Sets UV and, as its complement, UP
    pub fn with_user_verification(mut self, require: bool) -> Self {
        self.require_user_verification = require;
        self.require_user_presence = !require;
        self
    }
}

/// Output of `authenticatorGetAssertion`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    pub authenticator_data: Vec<u8>,
    /// Signature over `authenticator_data || client_data_hash`
    pub signature: Vec<u8>,
    /// Omitted when the allow list named exactly one credential
    pub credential_id: Option<Vec<u8>>,
    pub user_handle: Option<Vec<u8>>,
}
