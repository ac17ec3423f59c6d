//! Client-side WebAuthn
//!
//! `dfido2` runs the WebAuthn registration and authentication ceremonies on
//! a device, against the software platform authenticator of
//! [`dfido2_core`] or any other [`Authenticator`] implementation.
//!
//! # Example
//!
//! ```no_run
//! use dfido2::{
//!     Client, Config, ConsentProvider, ConsentResult, MemoryCredentialStore, MemoryKeyStore,
//!     PublicKeyCredentialCreationOptions, Result,
//! };
//! use std::sync::Arc;
//!
//! struct AlwaysApprove;
//!
//! #[async_trait::async_trait]
//! impl ConsentProvider for AlwaysApprove {
//!     async fn request_consent(&self, _message: &str) -> Result<ConsentResult> {
//!         Ok(ConsentResult::Granted)
//!     }
//! }
//!
//! # async fn run(options_json: &str) -> Result<()> {
//! let client = Client::platform(
//!     Config::default(),
//!     Arc::new(MemoryCredentialStore::new()),
//!     Arc::new(MemoryKeyStore::new()),
//!     Arc::new(AlwaysApprove),
//! );
//!
//! let options = PublicKeyCredentialCreationOptions::from_json(options_json)?;
//! let credential = client
//!     .create_new_credential(&options, "https://example.com", "Create a passkey")
//!     .await?;
//! println!("{}", credential.to_json()?);
//! # Ok(())
//! # }
//! ```

pub mod accounts;
pub mod client;
pub mod config;
pub mod encoding;
pub mod options;
pub mod response;

pub use accounts::{Account, AccountsList};
pub use client::Client;
pub use config::Config;
pub use options::{
    AttestationConveyancePreference, AuthenticatorSelectionCriteria, CredentialDescriptor,
    CredentialMediationRequirement, PublicKeyCredentialCreationOptions,
    PublicKeyCredentialParameters, PublicKeyCredentialRequestOptions,
    PublicKeyCredentialRpEntity, PublicKeyCredentialType, PublicKeyCredentialUserEntity,
    ResidentKeyRequirement, UserVerificationRequirement,
};
pub use response::{
    AssertionCredential, AuthenticatorAssertionResponse, AuthenticatorAttestationResponse,
    PublicKeyCredential, RegistrationCredential,
};

// Re-export the authenticator API
pub use dfido2_core::{
    AssertionResult, AttestationObject, AttestedCredentialData, Authenticator,
    AuthenticatorAttachment, AuthenticatorConfig, AuthenticatorData, AuthenticatorDataFlags,
    AuthenticatorTransport, ConsentProvider, ConsentResult, ConstantSignCount, CoseAlgorithm,
    CosePublicKey, CredentialPrivateKey, CredentialStore, Error, ErrorKind, FirstCredential,
    GetAssertionRequest, KeyStore, MakeCredentialRequest, MapOrdering, MemoryCredentialStore,
    MemoryKeyStore, PlatformAuthenticator, PublicKeyCredentialDescriptor,
    PublicKeyCredentialSource, RelyingParty, Result, SelectionPolicy, SignCounter, User,
};
