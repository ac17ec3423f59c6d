//! Capabilities consumed by the platform authenticator
//!
//! These traits define the interface between the authenticator logic and
//! the platform: credential persistence, secret key storage, the user
//! consent prompt, credential selection and signature counting.

use crate::credential::PublicKeyCredentialSource;
use crate::status::Result;

use async_trait::async_trait;

/// Outcome of a consent prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentResult {
    /// User approved (and was verified when the prompt requires it)
    Granted,
    /// User declined or verification failed
    Denied,
    /// The device has no way to ask
    Unsupported,
}

impl ConsentResult {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// User consent / verification prompt
///
/// Implementations typically show a biometric or passcode prompt with the
/// supplied message.
#[async_trait]
pub trait ConsentProvider: Send + Sync {
    /// Ask the user to approve an operation
    ///
    /// # Arguments
    ///
    /// * `message` - Text displayed to the user
    async fn request_consent(&self, message: &str) -> Result<ConsentResult>;
}

/// Persistent store of resident credential sources
///
/// Storage is scoped by RP ID. Within one RP a credential ID is unique.
pub trait CredentialStore: Send + Sync {
    /// Look up one credential
    fn lookup(&self, rp_id: &str, credential_id: &[u8]) -> Result<Option<PublicKeyCredentialSource>>;

    /// Insert or replace a credential
    fn save(&self, source: &PublicKeyCredentialSource) -> Result<()>;

    /// All credentials for an RP
    fn load_all(&self, rp_id: &str) -> Result<Vec<PublicKeyCredentialSource>>;

    /// Delete one credential; returns whether it existed
    fn delete(&self, source: &PublicKeyCredentialSource) -> Result<bool>;

    /// Delete every credential of one account (RP ID + user handle)
    fn delete_all(&self, rp_id: &str, user_handle: &[u8]) -> Result<()>;

    /// Delete every credential whose ID is not in `keep`, optionally limited to one RP
    fn remove_all(&self, keep: &[Vec<u8>], rp_id: Option<&str>) -> Result<()>;
}

/// Secret key storage (secure enclave, keychain, TPM-backed file, ...)
pub trait KeyStore: Send + Sync {
    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>>;

    fn save_key(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Returns whether the key existed
    fn delete_key(&self, name: &str) -> Result<bool>;

    /// Delete every key whose name starts with `prefix`
    fn delete_prefixed(&self, prefix: &str) -> Result<()>;
}

/// Chooses one credential when several match an assertion request
pub trait SelectionPolicy: Send + Sync {
    /// Index into `candidates`, or `None` to abort
    fn select(&self, rp_id: &str, candidates: &[PublicKeyCredentialSource]) -> Option<usize>;
}

/// Always picks the first candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCredential;

impl SelectionPolicy for FirstCredential {
    fn select(&self, _rp_id: &str, candidates: &[PublicKeyCredentialSource]) -> Option<usize> {
        if candidates.is_empty() { None } else { Some(0) }
    }
}

/// Supplies the signature counter written into authenticator data
pub trait SignCounter: Send + Sync {
    fn next_count(&self, source: &PublicKeyCredentialSource) -> Result<u32>;
}

/// Reports zero for every credential, as passkey providers usually do
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantSignCount;

impl SignCounter for ConstantSignCount {
    fn next_count(&self, _source: &PublicKeyCredentialSource) -> Result<u32> {
        Ok(0)
    }
}
