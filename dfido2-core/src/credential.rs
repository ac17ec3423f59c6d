//! Public key credential source
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#public-key-credential-source>
//!
//! Serialized as a text-keyed CBOR map, in this order:
//! `{"id": bytes, "rpId": text, "userHandle": bytes, "privateKey": bytes, "otherUI": text}`
//! where `privateKey` is PKCS#8 DER.

use crate::cbor::{MapBuilder, MapOrdering, MapParser};
use crate::keys::CredentialPrivateKey;
use crate::status::Result;
use crate::types::CoseAlgorithm;

mod keys {
    pub const ID: &str = "id";
    pub const RP_ID: &str = "rpId";
    pub const USER_HANDLE: &str = "userHandle";
    pub const PRIVATE_KEY: &str = "privateKey";
    pub const OTHER_UI: &str = "otherUI";
}

/// One credential's private material and binding
#[derive(Debug, Clone)]
pub struct PublicKeyCredentialSource {
    /// Credential ID: random for resident credentials, ciphertext otherwise
    pub id: Vec<u8>,
    pub private_key: CredentialPrivateKey,
    pub rp_id: String,
    pub user_handle: Vec<u8>,
    /// Free-form display hints kept with the credential
    pub other_ui: String,
}

impl PublicKeyCredentialSource {
    pub fn new(
        id: Vec<u8>,
        private_key: CredentialPrivateKey,
        rp_id: impl Into<String>,
        user_handle: Vec<u8>,
    ) -> Self {
        Self {
            id,
            private_key,
            rp_id: rp_id.into(),
            user_handle,
            other_ui: String::new(),
        }
    }

    pub fn with_other_ui(mut self, other_ui: impl Into<String>) -> Self {
        self.other_ui = other_ui.into();
        self
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        self.private_key.algorithm()
    }

    /// True when `self` and `other` belong to the same account on the same RP
    pub fn same_account(&self, rp_id: &str, user_handle: &[u8]) -> bool {
        self.rp_id == rp_id && self.user_handle == user_handle
    }

    pub fn to_cbor_with(&self, ordering: MapOrdering) -> Result<Vec<u8>> {
        let private_key = self.private_key.to_pkcs8_der()?;
        MapBuilder::new()
            .insert_bytes(keys::ID, &self.id)?
            .insert(keys::RP_ID, self.rp_id.as_str())?
            .insert_bytes(keys::USER_HANDLE, &self.user_handle)?
            .insert_bytes(keys::PRIVATE_KEY, &private_key)?
            .insert(keys::OTHER_UI, self.other_ui.as_str())?
            .build_with(ordering)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        self.to_cbor_with(MapOrdering::Insertion)
    }

    /// Parse; a missing field is `badData` naming the field
    pub fn from_cbor(data: &[u8]) -> Result<Self> {
        let parser = MapParser::from_bytes(data)?.with_context("PublicKeyCredentialSource");

        let id = parser.get_bytes(keys::ID)?.to_vec();
        let private_key = CredentialPrivateKey::from_pkcs8_der(parser.get_bytes(keys::PRIVATE_KEY)?)?;
        let other_ui = parser.get_text(keys::OTHER_UI)?.to_string();
        let rp_id = parser.get_text(keys::RP_ID)?.to_string();
        let user_handle = parser.get_bytes(keys::USER_HANDLE)?.to_vec();

        Ok(Self {
            id,
            private_key,
            rp_id,
            user_handle,
            other_ui,
        })
    }
}
