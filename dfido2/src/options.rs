//! WebAuthn ceremony options
//!
//! The JSON shapes an RP server hands to the client, as defined by
//! WebAuthn Level 3 section 5.4. Binary members (challenge, user handle,
//! credential IDs) travel as base64url strings.
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#dictionary-makecredentialoptions>

use crate::encoding;
use crate::{
    AuthenticatorAttachment, CoseAlgorithm, Error, PublicKeyCredentialDescriptor, Result,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The only credential type WebAuthn defines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicKeyCredentialType {
    #[default]
    #[serde(rename = "public-key")]
    PublicKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationRequirement {
    Required,
    Preferred,
    Discouraged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKeyRequirement {
    Required,
    Preferred,
    Discouraged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyancePreference {
    #[default]
    None,
    Indirect,
    Direct,
    Enterprise,
}

/// Credential Management mediation requirement
///
/// Only `conditional` changes the ceremony; the rest behave as `optional`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMediationRequirement {
    Silent,
    Optional,
    Conditional,
    Required,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialRpEntity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialUserEntity {
    /// User handle, base64url
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyCredentialParameters {
    #[serde(rename = "type", default)]
    pub type_: PublicKeyCredentialType,
    /// COSE algorithm identifier; unknown values are ignored during negotiation
    pub alg: i64,
}

impl PublicKeyCredentialParameters {
    pub fn new(alg: CoseAlgorithm) -> Self {
        Self {
            type_: PublicKeyCredentialType::PublicKey,
            alg: alg.to_i64(),
        }
    }
}

/// Credential descriptor as it appears in `excludeCredentials` / `allowCredentials`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    #[serde(rename = "type", default)]
    pub type_: PublicKeyCredentialType,
    /// Credential ID, base64url
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

impl CredentialDescriptor {
    pub fn new(id: &[u8]) -> Self {
        Self {
            type_: PublicKeyCredentialType::PublicKey,
            id: encoding::encode(id),
            transports: None,
        }
    }

    pub fn with_transports(id: &[u8], transports: Vec<String>) -> Self {
        Self {
            transports: Some(transports),
            ..Self::new(id)
        }
    }

    /// Decode into the authenticator-facing descriptor
    pub fn to_descriptor(&self) -> Result<PublicKeyCredentialDescriptor> {
        let id = encoding::decode(&self.id)?;
        Ok(PublicKeyCredentialDescriptor {
            id,
            transports: self.transports.clone(),
        })
    }
}

/// Decode a descriptor list, dropping entries whose ID is not base64url
pub(crate) fn decode_descriptors(
    list: Option<&[CredentialDescriptor]>,
) -> Vec<PublicKeyCredentialDescriptor> {
    list.unwrap_or_default()
        .iter()
        .filter_map(|descriptor| match descriptor.to_descriptor() {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(error = %e, "Dropping credential descriptor with undecodable ID");
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelectionCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    /// Legacy flag, consulted when `resident_key` is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_resident_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<ResidentKeyRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerificationRequirement>,
}

/// `PublicKeyCredentialCreationOptions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialCreationOptions {
    pub rp: PublicKeyCredentialRpEntity,
    pub user: PublicKeyCredentialUserEntity,
    /// base64url, passed through to client data as is
    pub challenge: String,
    #[serde(default)]
    pub pub_key_cred_params: Vec<PublicKeyCredentialParameters>,
    /// Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_credentials: Option<Vec<CredentialDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelectionCriteria>,
    #[serde(default)]
    pub attestation: AttestationConveyancePreference,
}

impl PublicKeyCredentialCreationOptions {
    /// Parse options JSON, bare or wrapped as `{"publicKey": {...}}`
    pub fn from_json(json: &str) -> Result<Self> {
        from_json(json)
    }

    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }

    /// Algorithms in RP preference order
    ///
    /// Unknown identifiers are skipped. An empty list means ES256 then RS256.
    pub fn algorithms(&self) -> Vec<CoseAlgorithm> {
        if self.pub_key_cred_params.is_empty() {
            return vec![CoseAlgorithm::Es256, CoseAlgorithm::Rs256];
        }
        self.pub_key_cred_params
            .iter()
            .filter_map(|param| {
                let alg = CoseAlgorithm::from_i64(param.alg);
                if alg.is_none() {
                    debug!(alg = param.alg, "Skipping unsupported algorithm");
                }
                alg
            })
            .collect()
    }
}

/// `PublicKeyCredentialRequestOptions`, plus the mediation requirement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptions {
    pub challenge: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<Vec<CredentialDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerificationRequirement>,
    /// Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mediation: Option<CredentialMediationRequirement>,
}

impl PublicKeyCredentialRequestOptions {
    pub fn new(challenge: impl Into<String>) -> Self {
        Self {
            challenge: challenge.into(),
            rp_id: None,
            allow_credentials: None,
            user_verification: None,
            timeout: None,
            mediation: None,
        }
    }

    /// Parse options JSON, bare or wrapped as `{"publicKey": {...}}`
    pub fn from_json(json: &str) -> Result<Self> {
        from_json(json)
    }

    pub fn to_json(&self) -> Result<String> {
        to_json(self)
    }

    pub fn is_conditional(&self) -> bool {
        self.mediation == Some(CredentialMediationRequirement::Conditional)
    }

    /// Append an allowed credential
    pub fn allow_credential(&mut self, id: &[u8], transports: Vec<String>) {
        self.allow_credentials
            .get_or_insert_with(Vec::new)
            .push(CredentialDescriptor::with_transports(id, transports));
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Wrapped<T> {
    Wrapped {
        #[serde(rename = "publicKey")]
        public_key: T,
    },
    Bare(T),
}

fn from_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T> {
    let wrapped: Wrapped<T> = serde_json::from_str(json)
        .map_err(|e| Error::bad_data(format!("invalid options JSON: {e}")))?;
    Ok(match wrapped {
        Wrapped::Wrapped { public_key } => public_key,
        Wrapped::Bare(options) => options,
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::unknown(format!("JSON encoding failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATION: &str = r#"{
        "rp": {"id": "example.com", "name": "Example"},
        "user": {"id": "AQID", "name": "alice", "displayName": "Alice"},
        "challenge": "Y2hhbGxlbmdl",
        "pubKeyCredParams": [
            {"type": "public-key", "alg": -8},
            {"type": "public-key", "alg": -257},
            {"type": "public-key", "alg": -7}
        ],
        "timeout": 60000,
        "excludeCredentials": [{"type": "public-key", "id": "AAEC", "transports": ["internal"]}],
        "authenticatorSelection": {"residentKey": "preferred", "userVerification": "required"},
        "attestation": "direct"
    }"#;

    #[test]
    fn test_creation_options_from_json() {
        let options = PublicKeyCredentialCreationOptions::from_json(CREATION).unwrap();

        assert_eq!(options.rp.id.as_deref(), Some("example.com"));
        assert_eq!(options.user.display_name, "Alice");
        assert_eq!(options.timeout, Some(60000));
        assert_eq!(options.attestation, AttestationConveyancePreference::Direct);
        assert_eq!(
            options.algorithms(),
            vec![CoseAlgorithm::Rs256, CoseAlgorithm::Es256]
        );

        let selection = options.authenticator_selection.as_ref().unwrap();
        assert_eq!(selection.resident_key, Some(ResidentKeyRequirement::Preferred));
        assert_eq!(
            selection.user_verification,
            Some(UserVerificationRequirement::Required)
        );
        assert_eq!(selection.require_resident_key, None);

        let exclude = decode_descriptors(options.exclude_credentials.as_deref());
        assert_eq!(exclude[0].id, vec![0, 1, 2]);
        assert_eq!(exclude[0].transports, Some(vec!["internal".to_string()]));
    }

    #[test]
    fn test_wrapped_options() {
        let wrapped = format!(r#"{{"publicKey": {CREATION}}}"#);
        let options = PublicKeyCredentialCreationOptions::from_json(&wrapped).unwrap();
        assert_eq!(options.rp.name, "Example");
    }

    #[test]
    fn test_defaults() {
        let options = PublicKeyCredentialCreationOptions::from_json(
            r#"{"rp": {"name": "Example"}, "user": {"id": "AQ", "name": "a", "displayName": "A"}, "challenge": "AA"}"#,
        )
        .unwrap();
        assert_eq!(options.rp.id, None);
        assert_eq!(options.attestation, AttestationConveyancePreference::None);
        assert_eq!(
            options.algorithms(),
            vec![CoseAlgorithm::Es256, CoseAlgorithm::Rs256]
        );
    }

    #[test]
    fn test_request_options_round_trip() {
        let mut options = PublicKeyCredentialRequestOptions::new("Y2hhbGxlbmdl");
        options.rp_id = Some("example.com".into());
        options.mediation = Some(CredentialMediationRequirement::Conditional);
        options.allow_credential(&[9, 9], vec!["internal".into()]);

        let json = options.to_json().unwrap();
        assert!(json.contains(r#""rpId":"example.com""#));
        assert!(json.contains(r#""mediation":"conditional""#));
        assert!(json.contains(r#""type":"public-key""#));

        let parsed = PublicKeyCredentialRequestOptions::from_json(&json).unwrap();
        assert_eq!(parsed, options);
        assert!(parsed.is_conditional());
    }

    #[test]
    fn test_bad_descriptor_dropped() {
        let list = vec![
            CredentialDescriptor {
                type_: PublicKeyCredentialType::PublicKey,
                id: "not base64!".into(),
                transports: None,
            },
            CredentialDescriptor::new(&[1, 2]),
        ];
        let decoded = decode_descriptors(Some(&list));
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].id, vec![1, 2]);
    }

    #[test]
    fn test_invalid_json() {
        let err = PublicKeyCredentialRequestOptions::from_json("{").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::BadData);
    }
}
