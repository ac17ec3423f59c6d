//! Collected client data
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#dictionary-client-data>

use crate::{Error, Result};

use serde::Serialize;
use sha2::{Digest, Sha256};

/// The ceremony a client data object belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClientDataType {
    #[serde(rename = "webauthn.create")]
    Create,
    #[serde(rename = "webauthn.get")]
    Get,
}

#[derive(Serialize)]
struct CollectedClientData<'a> {
    #[serde(rename = "type")]
    type_: ClientDataType,
    challenge: &'a str,
    origin: &'a str,
}

/// Serialized client data and its SHA-256 hash
pub struct ClientData {
    pub json: String,
    pub hash: [u8; 32],
}

impl ClientData {
    /// Build `{"type", "challenge", "origin"}` in that member order
    pub fn new(type_: ClientDataType, challenge: &str, origin: &str) -> Result<Self> {
        let json = serde_json::to_string(&CollectedClientData {
            type_,
            challenge,
            origin,
        })
        .map_err(|e| Error::unknown(format!("client data encoding failed: {e}")))?;
        let hash = Sha256::digest(json.as_bytes()).into();
        Ok(Self { json, hash })
    }
}
