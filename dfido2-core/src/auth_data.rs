//! Authenticator data
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#sctn-authenticator-data>
//!
//! Layout:
//!
//! ```text
//! rpIdHash (32) || flags (1) || signCount (4, BE) || [attestedCredentialData] || [extensions]
//! attestedCredentialData = aaguid (16) || credIdLen (2, BE) || credId || credentialPublicKey (COSE)
//! ```

use crate::cbor::{self, Map, MapOrdering, Value};
use crate::cose::CosePublicKey;
use crate::status::{Error, Result};

use sha2::{Digest, Sha256};

/// Length of the fixed prefix: rpIdHash, flags and signCount
pub const AUTH_DATA_PREFIX_LEN: usize = 37;

/// Offset of the AAGUID inside authenticator data carrying attested credential data
pub const AAGUID_OFFSET: usize = AUTH_DATA_PREFIX_LEN;

pub const AAGUID_LEN: usize = 16;

/// Flag bits
pub mod flags {
    pub const UP: u8 = 0x01;
    pub const UV: u8 = 0x04;
    pub const BE: u8 = 0x08;
    pub const BS: u8 = 0x10;
    pub const AT: u8 = 0x40;
    pub const ED: u8 = 0x80;
}

/// Authenticator data flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthenticatorDataFlags {
    pub user_present: bool,
    pub user_verified: bool,
    pub backup_eligibility: bool,
    pub backup_state: bool,
    pub attested_credential_data: bool,
    pub extension_data: bool,
}

impl AuthenticatorDataFlags {
    pub fn to_byte(self) -> u8 {
        let mut byte = 0u8;
        if self.user_present {
            byte |= flags::UP;
        }
        if self.user_verified {
            byte |= flags::UV;
        }
        if self.backup_eligibility {
            byte |= flags::BE;
        }
        if self.backup_state {
            byte |= flags::BS;
        }
        if self.attested_credential_data {
            byte |= flags::AT;
        }
        if self.extension_data {
            byte |= flags::ED;
        }
        byte
    }

    /// Undefined bits (0x02, 0x20) are ignored
    pub fn from_byte(byte: u8) -> Self {
        Self {
            user_present: byte & flags::UP != 0,
            user_verified: byte & flags::UV != 0,
            backup_eligibility: byte & flags::BE != 0,
            backup_state: byte & flags::BS != 0,
            attested_credential_data: byte & flags::AT != 0,
            extension_data: byte & flags::ED != 0,
        }
    }
}

/// Description of a newly created credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; 16],
    pub credential_id: Vec<u8>,
    pub credential_public_key: CosePublicKey,
}

impl AttestedCredentialData {
    pub fn to_bytes_with(&self, ordering: MapOrdering) -> Result<Vec<u8>> {
        let id_len = u16::try_from(self.credential_id.len())
            .map_err(|_| Error::bad_data("credential ID longer than 65535 bytes"))?;

        let mut out = Vec::with_capacity(18 + self.credential_id.len() + 80);
        out.extend_from_slice(&self.aaguid);
        out.extend_from_slice(&id_len.to_be_bytes());
        out.extend_from_slice(&self.credential_id);
        out.extend_from_slice(&self.credential_public_key.to_bytes_with(ordering)?);
        Ok(out)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with(MapOrdering::Insertion)
    }

    /// Parse from the start of `data`, returning the value and bytes consumed
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < 18 {
            return Err(Error::bad_data("attested credential data too short"));
        }

        let mut aaguid = [0u8; 16];
        aaguid.copy_from_slice(&data[..16]);
        let id_len = u16::from_be_bytes([data[16], data[17]]) as usize;

        let id_end = 18 + id_len;
        if data.len() < id_end {
            return Err(Error::bad_data("credential ID truncated"));
        }
        let credential_id = data[18..id_end].to_vec();

        let (credential_public_key, key_len) = CosePublicKey::from_bytes_prefix(&data[id_end..])?;

        Ok((
            Self {
                aaguid,
                credential_id,
                credential_public_key,
            },
            id_end + key_len,
        ))
    }
}

/// Per-operation authenticator output
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: AuthenticatorDataFlags,
    pub sign_count: u32,
    pub attested_credential_data: Option<AttestedCredentialData>,
    pub extensions: Option<Map>,
}

impl AuthenticatorData {
    /// Start building data for `rp_id`; flags and attested data are filled in by the caller
    pub fn new(rp_id: &str) -> Self {
        Self {
            rp_id_hash: rp_id_hash(rp_id),
            flags: AuthenticatorDataFlags::default(),
            sign_count: 0,
            attested_credential_data: None,
            extensions: None,
        }
    }

    pub fn with_user_flags(mut self, user_present: bool, user_verified: bool) -> Self {
        self.flags.user_present = user_present;
        self.flags.user_verified = user_verified;
        self
    }

    pub fn with_sign_count(mut self, sign_count: u32) -> Self {
        self.sign_count = sign_count;
        self
    }

    /// Attach credential data and set AT
    pub fn with_attested_credential_data(mut self, data: AttestedCredentialData) -> Self {
        self.flags.attested_credential_data = true;
        self.attested_credential_data = Some(data);
        self
    }

    /// Attach extension outputs; an empty map is dropped and ED stays clear
    pub fn with_extensions(mut self, extensions: Map) -> Self {
        if extensions.is_empty() {
            self.flags.extension_data = false;
            self.extensions = None;
        } else {
            self.flags.extension_data = true;
            self.extensions = Some(extensions);
        }
        self
    }

    pub fn to_bytes_with(&self, ordering: MapOrdering) -> Result<Vec<u8>> {
        if self.flags.attested_credential_data != self.attested_credential_data.is_some() {
            return Err(Error::bad_data("AT flag does not match attested credential data"));
        }
        if self.flags.extension_data != self.extensions.is_some() {
            return Err(Error::bad_data("ED flag does not match extensions"));
        }

        let mut out = Vec::with_capacity(AUTH_DATA_PREFIX_LEN);
        out.extend_from_slice(&self.rp_id_hash);
        out.push(self.flags.to_byte());
        out.extend_from_slice(&self.sign_count.to_be_bytes());

        if let Some(attested) = &self.attested_credential_data {
            out.extend_from_slice(&attested.to_bytes_with(ordering)?);
        }
        if let Some(extensions) = &self.extensions {
            out.extend_from_slice(&cbor::encode_with(&Value::Map(extensions.clone()), ordering)?);
        }
        Ok(out)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with(MapOrdering::Insertion)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < AUTH_DATA_PREFIX_LEN {
            return Err(Error::bad_data(format!(
                "authenticator data must be at least {AUTH_DATA_PREFIX_LEN} bytes, got {}",
                data.len()
            )));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&data[..32]);
        let flags = AuthenticatorDataFlags::from_byte(data[32]);
        let sign_count = u32::from_be_bytes([data[33], data[34], data[35], data[36]]);

        let mut pos = AUTH_DATA_PREFIX_LEN;

        let attested_credential_data = if flags.attested_credential_data {
            let (attested, consumed) = AttestedCredentialData::from_bytes(&data[pos..])?;
            pos += consumed;
            Some(attested)
        } else {
            None
        };

        let extensions = if flags.extension_data {
            let (value, consumed) = cbor::decode_prefix(&data[pos..])?;
            pos += consumed;
            match value {
                Value::Map(map) if map.iter().all(|(k, _)| matches!(k, Value::Text(_))) => {
                    Some(map)
                }
                _ => return Err(Error::bad_data("extensions must be a text-keyed map")),
            }
        } else {
            None
        };

        if pos != data.len() {
            return Err(Error::bad_data(format!(
                "{} trailing bytes in authenticator data",
                data.len() - pos
            )));
        }

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
            extensions,
        })
    }
}

/// SHA-256 of the RP ID
pub fn rp_id_hash(rp_id: &str) -> [u8; 32] {
    Sha256::digest(rp_id.as_bytes()).into()
}
