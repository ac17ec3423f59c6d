//! Ceremony results
//!
//! `PublicKeyCredential` as WebAuthn serializes it to JSON, with every
//! binary member base64url encoded.
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#iface-pkcredential>

use crate::encoding;
use crate::options::PublicKeyCredentialType;
use crate::{AuthenticatorAttachment, Error, Result};

use serde::{Deserialize, Serialize};

/// Response of a registration ceremony
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub attestation_object: String,
}

impl AuthenticatorAttestationResponse {
    pub fn client_data_json_bytes(&self) -> Result<Vec<u8>> {
        encoding::decode(&self.client_data_json)
    }

    pub fn attestation_object_bytes(&self) -> Result<Vec<u8>> {
        encoding::decode(&self.attestation_object)
    }
}

/// Response of an authentication ceremony
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String,
    pub authenticator_data: String,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

impl AuthenticatorAssertionResponse {
    pub fn client_data_json_bytes(&self) -> Result<Vec<u8>> {
        encoding::decode(&self.client_data_json)
    }

    pub fn authenticator_data_bytes(&self) -> Result<Vec<u8>> {
        encoding::decode(&self.authenticator_data)
    }

    pub fn signature_bytes(&self) -> Result<Vec<u8>> {
        encoding::decode(&self.signature)
    }

    pub fn user_handle_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.user_handle.as_deref().map(encoding::decode).transpose()
    }
}

/// `PublicKeyCredential` carrying either response kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredential<R> {
    /// Credential ID, base64url
    pub id: String,
    /// Same bytes as `id`; JSON has no raw form
    pub raw_id: String,
    #[serde(rename = "type")]
    pub type_: PublicKeyCredentialType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    pub response: R,
}

impl<R> PublicKeyCredential<R> {
    pub(crate) fn new(
        credential_id: &[u8],
        attachment: AuthenticatorAttachment,
        response: R,
    ) -> Self {
        let id = encoding::encode(credential_id);
        Self {
            raw_id: id.clone(),
            id,
            type_: PublicKeyCredentialType::PublicKey,
            authenticator_attachment: Some(attachment),
            response,
        }
    }

    pub fn raw_id_bytes(&self) -> Result<Vec<u8>> {
        encoding::decode(&self.raw_id)
    }
}

impl<R: Serialize> PublicKeyCredential<R> {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::unknown(format!("JSON encoding failed: {e}")))
    }
}

/// Result of `Client::create_new_credential`
pub type RegistrationCredential = PublicKeyCredential<AuthenticatorAttestationResponse>;

/// Result of `Client::discover_from_external_source`
pub type AssertionCredential = PublicKeyCredential<AuthenticatorAssertionResponse>;
