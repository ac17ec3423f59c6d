//! Error taxonomy shared by the authenticator and the ceremony orchestrator
//!
//! Kinds map onto the DOMException names a WebAuthn client reports:
//! <https://www.w3.org/TR/webauthn-3/#sctn-createCredential>

use core::fmt;

use dfido2_crypto::CryptoError;
use thiserror::Error;

/// Error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or undecodable input
    BadData,

    /// Operation invoked in a state where it cannot run
    BadOperation,

    /// An excluded credential already exists on the authenticator
    InvalidState,

    /// Authenticator cannot satisfy a hard requirement
    Constraint,

    /// Caller cancelled the ceremony
    Cancelled,

    /// Ceremony lifetime timer expired
    Timeout,

    /// User declined, or no usable credential/authenticator
    NotAllowed,

    /// Requested feature or algorithm not available
    NotSupported,

    /// Caller-supplied parameter has the wrong shape
    TypeError,

    /// Anything else (storage, key generation, poisoned locks)
    Unknown,
}

impl ErrorKind {
    /// Stable dotted name, e.g. `fido2.notAllowed`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadData => "fido2.badData",
            Self::BadOperation => "fido2.badOperation",
            Self::InvalidState => "fido2.invalidState",
            Self::Constraint => "fido2.constraint",
            Self::Cancelled => "fido2.cancelled",
            Self::Timeout => "fido2.timeout",
            Self::NotAllowed => "fido2.notAllowed",
            Self::NotSupported => "fido2.notSupported",
            Self::TypeError => "fido2.typeError",
            Self::Unknown => "fido2.unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error with an optional human-readable detail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.kind, .detail))]
pub struct Error {
    kind: ErrorKind,
    detail: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn bad_data(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::BadData, detail)
    }

    pub fn invalid_state(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::InvalidState, detail)
    }

    pub fn constraint(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Constraint, detail)
    }

    pub fn not_allowed(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::NotAllowed, detail)
    }

    pub fn not_supported(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::NotSupported, detail)
    }

    pub fn type_error(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::TypeError, detail)
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Unknown, detail)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        let kind = match err {
            CryptoError::InvalidPublicKey
            | CryptoError::InvalidPrivateKey
            | CryptoError::InvalidSignature
            | CryptoError::DecryptionFailed
            | CryptoError::InvalidKeyLength { .. }
            | CryptoError::MalformedCiphertext => ErrorKind::BadData,
            CryptoError::UnsupportedKeySize(_) => ErrorKind::NotSupported,
            CryptoError::EncryptionFailed | CryptoError::KeyGenerationFailed => ErrorKind::Unknown,
        };
        Self::with_detail(kind, err.to_string())
    }
}

fn render(kind: &ErrorKind, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => format!("{kind}: {detail}"),
        None => kind.to_string(),
    }
}

/// Result type for authenticator and client operations
pub type Result<T> = core::result::Result<T, Error>;
