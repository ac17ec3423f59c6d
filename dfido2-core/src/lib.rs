//! WebAuthn platform authenticator
//!
//! This crate holds the authenticator side of the WebAuthn model: the CBOR
//! codec and byte formats (authenticator data, attestation objects, COSE
//! keys), credential sources and their wrapping scheme, the capabilities a
//! platform supplies, and [`PlatformAuthenticator`] with its
//! `makeCredential` / `getAssertion` operations.
//!
//! Implements the authenticator model of WebAuthn Level 3:
//! <https://www.w3.org/TR/webauthn-3/#sctn-authenticator-model>

pub mod attestation;
pub mod auth_data;
pub mod authenticator;
pub mod callbacks;
pub mod cbor;
pub mod commands;
pub mod cose;
pub mod credential;
pub mod keys;
pub mod request;
pub mod status;
pub mod store;
pub mod types;
pub mod wrapping;

// Re-export commonly used types
pub use attestation::AttestationObject;
pub use auth_data::{AttestedCredentialData, AuthenticatorData, AuthenticatorDataFlags};
pub use authenticator::{Authenticator, AuthenticatorConfig, PlatformAuthenticator};
pub use callbacks::{
    ConsentProvider, ConsentResult, ConstantSignCount, CredentialStore, FirstCredential,
    KeyStore, SelectionPolicy, SignCounter,
};
pub use cbor::MapOrdering;
pub use cose::CosePublicKey;
pub use credential::PublicKeyCredentialSource;
pub use keys::CredentialPrivateKey;
pub use request::{AssertionResult, GetAssertionRequest, MakeCredentialRequest};
pub use status::{Error, ErrorKind, Result};
pub use store::{MemoryCredentialStore, MemoryKeyStore};
pub use types::{
    AuthenticatorAttachment, AuthenticatorTransport, CoseAlgorithm,
    PublicKeyCredentialDescriptor, RelyingParty, User,
};
