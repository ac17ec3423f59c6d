//! Pure Rust cryptographic primitives for the dfido2 platform authenticator
//!
//! This crate provides the cryptographic operations a WebAuthn platform
//! authenticator needs:
//!
//! - **ECDSA**: ES256 credential keys
//! - **RSA**: RS256/RS384/RS512 credential keys
//! - **Wrap**: RSA-OAEP + AES-256-GCM sealing of non-resident credential sources
//!
//! Algorithm identifiers follow the COSE registry:
//! <https://www.iana.org/assignments/cose/cose.xhtml#algorithms>

pub mod ecdsa;
pub mod error;
pub mod rsa;
pub mod wrap;

// Re-export commonly used types
pub use error::{CryptoError, Result};
pub use crate::rsa::{RsaHash, RsaKeyPair};
pub use wrap::{DEFAULT_KEY_BITS as DEFAULT_WRAPPING_KEY_BITS, WrappingKey};
