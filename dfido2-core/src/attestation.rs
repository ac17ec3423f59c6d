//! Attestation object
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#sctn-attestation>
//!
//! CBOR map `{"authData": bytes, "fmt": text, "attStmt": map}`. The platform
//! authenticator always emits the `packed` format with a self-attestation
//! statement `{"alg": int, "sig": bytes}`.

use crate::auth_data::AuthenticatorData;
use crate::cbor::{self, Map, MapExt, MapOrdering, MapParser, Value};
use crate::status::{Error, Result};

use core::ops::Range;

/// Attestation statement format produced by this authenticator
pub const FMT_PACKED: &str = "packed";

mod keys {
    pub const AUTH_DATA: &str = "authData";
    pub const FMT: &str = "fmt";
    pub const ATT_STMT: &str = "attStmt";

    pub const ALG: &str = "alg";
    pub const SIG: &str = "sig";
    pub const X5C: &str = "x5c";
    pub const ECDAA_KEY_ID: &str = "ecdaaKeyId";
}

/// Registration envelope returned by `makeCredential`
#[derive(Debug, Clone, PartialEq)]
pub struct AttestationObject {
    pub fmt: String,
    pub auth_data: AuthenticatorData,
    pub att_stmt: Map,
}

impl AttestationObject {
    /// Packed self-attestation
    pub fn packed(auth_data: AuthenticatorData, alg: i64, signature: Vec<u8>) -> Self {
        let att_stmt = vec![
            (Value::Text(keys::ALG.into()), Value::Integer(alg.into())),
            (Value::Text(keys::SIG.into()), Value::Bytes(signature)),
        ];
        Self {
            fmt: FMT_PACKED.to_string(),
            auth_data,
            att_stmt,
        }
    }

    /// True for packed self-attestation with a zero AAGUID
    pub fn is_self_attestation(&self) -> bool {
        if self.fmt != FMT_PACKED
            || self.att_stmt.contains_key(keys::X5C)
            || self.att_stmt.contains_key(keys::ECDAA_KEY_ID)
        {
            return false;
        }
        self.auth_data
            .attested_credential_data
            .as_ref()
            .is_some_and(|attested| attested.aaguid == [0u8; 16])
    }

    /// Copy with the attestation statement removed; `fmt` is kept as is
    pub fn to_none(&self) -> Self {
        Self {
            fmt: self.fmt.clone(),
            auth_data: self.auth_data.clone(),
            att_stmt: Map::new(),
        }
    }

    /// Serialized signature, if the statement carries one
    pub fn signature(&self) -> Option<&[u8]> {
        self.att_stmt.lookup_bytes(keys::SIG)
    }

    pub fn algorithm(&self) -> Option<i64> {
        self.att_stmt.lookup_int(keys::ALG)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with(MapOrdering::Insertion)
    }

    pub fn to_bytes_with(&self, ordering: MapOrdering) -> Result<Vec<u8>> {
        Ok(self.to_bytes_with_auth_data_range(ordering)?.0)
    }

    /// Serialize and report where the authData payload sits in the output
    ///
    /// The range covers the raw authenticator data bytes, after the byte
    /// string header.
    pub fn to_bytes_with_auth_data_range(
        &self,
        ordering: MapOrdering,
    ) -> Result<(Vec<u8>, Range<usize>)> {
        let auth_data = self.auth_data.to_bytes_with(ordering)?;
        let auth_data_len = auth_data.len();

        let object = Value::Map(vec![
            (Value::Text(keys::AUTH_DATA.into()), Value::Bytes(auth_data)),
            (Value::Text(keys::FMT.into()), Value::Text(self.fmt.clone())),
            (Value::Text(keys::ATT_STMT.into()), Value::Map(self.att_stmt.clone())),
        ]);
        let object = match ordering {
            MapOrdering::Insertion => object,
            MapOrdering::Canonical => cbor::canonicalize(&object)?,
        };
        let bytes = cbor::encode(&object)?;

        // The payload ends where the entries following authData begin
        let entries = cbor::as_map(&object).map(Vec::as_slice).unwrap_or_default();
        let position = entries
            .iter()
            .position(|(k, _)| matches!(k, Value::Text(t) if t == keys::AUTH_DATA))
            .ok_or_else(|| Error::bad_data("authData missing from attestation object"))?;
        let mut tail = 0;
        for (k, v) in &entries[position + 1..] {
            tail += cbor::encode(k)?.len() + cbor::encode(v)?.len();
        }
        let end = bytes.len() - tail;

        Ok((bytes, end - auth_data_len..end))
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let parser = MapParser::from_bytes(data)?.with_context("AttestationObject");

        let auth_data = AuthenticatorData::from_bytes(parser.get_bytes(keys::AUTH_DATA)?)?;
        let fmt = parser.get_text(keys::FMT)?.to_string();
        let att_stmt = parser.get_map(keys::ATT_STMT)?.clone();

        Ok(Self {
            fmt,
            auth_data,
            att_stmt,
        })
    }
}
