//! Shared WebAuthn data types
//!
//! Plain value types passed between the orchestrator and authenticators.

use serde::{Deserialize, Serialize};

/// COSE signature algorithm identifiers supported by the platform authenticator
///
/// Registry: <https://www.iana.org/assignments/cose/cose.xhtml#algorithms>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum CoseAlgorithm {
    /// ECDSA w/ SHA-256 on P-256
    Es256,
    /// RSASSA-PKCS1-v1_5 w/ SHA-256
    Rs256,
    /// RSASSA-PKCS1-v1_5 w/ SHA-384
    Rs384,
    /// RSASSA-PKCS1-v1_5 w/ SHA-512
    Rs512,
}

impl CoseAlgorithm {
    pub const ES256: i64 = -7;
    pub const RS256: i64 = -257;
    pub const RS384: i64 = -258;
    pub const RS512: i64 = -259;

    /// Algorithms enabled on a default authenticator, in preference order
    pub const ALL: [CoseAlgorithm; 4] = [Self::Es256, Self::Rs256, Self::Rs384, Self::Rs512];

    pub fn to_i64(self) -> i64 {
        match self {
            Self::Es256 => Self::ES256,
            Self::Rs256 => Self::RS256,
            Self::Rs384 => Self::RS384,
            Self::Rs512 => Self::RS512,
        }
    }

    /// Map a COSE identifier; unknown identifiers yield `None`
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            Self::ES256 => Some(Self::Es256),
            Self::RS256 => Some(Self::Rs256),
            Self::RS384 => Some(Self::Rs384),
            Self::RS512 => Some(Self::Rs512),
            _ => None,
        }
    }

    pub fn is_rsa(self) -> bool {
        !matches!(self, Self::Es256)
    }
}

impl From<CoseAlgorithm> for i64 {
    fn from(alg: CoseAlgorithm) -> i64 {
        alg.to_i64()
    }
}

impl TryFrom<i64> for CoseAlgorithm {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::from_i64(value).ok_or_else(|| format!("unsupported COSE algorithm {value}"))
    }
}

/// Relying Party information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    /// Relying party identifier (e.g., "example.com")
    pub id: String,

    /// Human-readable name
    pub name: Option<String>,
}

impl RelyingParty {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

/// User account being registered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// User handle, an opaque identifier of 1 to 64 bytes
    pub id: Vec<u8>,

    /// Human-readable username
    pub name: Option<String>,

    /// Human-readable display name
    pub display_name: Option<String>,
}

impl User {
    pub fn new(id: Vec<u8>) -> Self {
        Self {
            id,
            name: None,
            display_name: None,
        }
    }

    pub fn with_details(id: Vec<u8>, name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
            display_name: Some(display_name.into()),
        }
    }
}

/// Identifies a credential by ID, optionally with the transports it is reachable over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyCredentialDescriptor {
    pub id: Vec<u8>,

    /// `None` means the transports are unknown, which matches every authenticator
    pub transports: Option<Vec<String>>,
}

impl PublicKeyCredentialDescriptor {
    pub fn new(id: Vec<u8>) -> Self {
        Self {
            id,
            transports: None,
        }
    }

    pub fn with_transports(id: Vec<u8>, transports: Vec<String>) -> Self {
        Self {
            id,
            transports: Some(transports),
        }
    }

    /// True when the transports are unknown or include `transport`
    pub fn reachable_over(&self, transport: AuthenticatorTransport) -> bool {
        match &self.transports {
            None => true,
            Some(list) => list.iter().any(|t| t == transport.as_str()),
        }
    }

    /// True only when the transports are known and include `transport`
    pub fn lists_transport(&self, transport: AuthenticatorTransport) -> bool {
        self.transports
            .as_ref()
            .is_some_and(|list| list.iter().any(|t| t == transport.as_str()))
    }
}

/// How an authenticator is reached
///
/// Spec: <https://www.w3.org/TR/webauthn-3/#enum-transport>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticatorTransport {
    Usb,
    Nfc,
    Ble,
    Hybrid,
    Internal,
}

impl AuthenticatorTransport {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Usb => "usb",
            Self::Nfc => "nfc",
            Self::Ble => "ble",
            Self::Hybrid => "hybrid",
            Self::Internal => "internal",
        }
    }
}

/// Authenticator attachment modality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    Platform,
    CrossPlatform,
}

impl AuthenticatorAttachment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::CrossPlatform => "cross-platform",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cose_algorithm_identifiers() {
        assert_eq!(CoseAlgorithm::Es256.to_i64(), -7);
        assert_eq!(CoseAlgorithm::Rs256.to_i64(), -257);
        assert_eq!(CoseAlgorithm::Rs384.to_i64(), -258);
        assert_eq!(CoseAlgorithm::Rs512.to_i64(), -259);

        for alg in CoseAlgorithm::ALL {
            assert_eq!(CoseAlgorithm::from_i64(alg.to_i64()), Some(alg));
        }
        assert_eq!(CoseAlgorithm::from_i64(-8), None);
    }

    #[test]
    fn test_descriptor_transport_matching() {
        let unknown = PublicKeyCredentialDescriptor::new(vec![1]);
        assert!(unknown.reachable_over(AuthenticatorTransport::Internal));
        assert!(!unknown.lists_transport(AuthenticatorTransport::Internal));

        let usb_only = PublicKeyCredentialDescriptor::with_transports(vec![1], vec!["usb".into()]);
        assert!(!usb_only.reachable_over(AuthenticatorTransport::Internal));
        assert!(usb_only.lists_transport(AuthenticatorTransport::Usb));

        let empty = PublicKeyCredentialDescriptor::with_transports(vec![1], vec![]);
        assert!(!empty.reachable_over(AuthenticatorTransport::Internal));
    }

    #[test]
    fn test_attachment_names() {
        assert_eq!(AuthenticatorAttachment::Platform.as_str(), "platform");
        assert_eq!(AuthenticatorAttachment::CrossPlatform.as_str(), "cross-platform");
    }
}
