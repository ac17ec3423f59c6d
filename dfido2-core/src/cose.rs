//! COSE_Key encoding of credential public keys
//!
//! Spec: <https://www.rfc-editor.org/rfc/rfc9052.html#section-7>
//!
//! - RSA: `{1: 3, 3: alg, -1: n, -2: e}`
//! - EC2/P-256: `{1: 2, 3: -7, -1: 1, -2: x, -3: y}`

use crate::cbor::{self, Map, MapBuilder, MapOrdering, MapParser, Value};
use crate::status::{Error, Result};
use crate::types::CoseAlgorithm;

use dfido2_crypto::{RsaHash, ecdsa, rsa};

/// COSE key parameter labels
mod labels {
    pub const KTY: i64 = 1;
    pub const ALG: i64 = 3;
    pub const CRV: i64 = -1;
    pub const X: i64 = -2;
    pub const Y: i64 = -3;
    pub const RSA_N: i64 = -1;
    pub const RSA_E: i64 = -2;
}

const KTY_EC2: i64 = 2;
const KTY_RSA: i64 = 3;
const CRV_P256: i64 = 1;

/// Credential public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CosePublicKey {
    Ec2 {
        alg: CoseAlgorithm,
        x: [u8; 32],
        y: [u8; 32],
    },
    Rsa {
        alg: CoseAlgorithm,
        n: Vec<u8>,
        e: Vec<u8>,
    },
}

impl CosePublicKey {
    /// Build from an uncompressed SEC1 point (0x04 || x || y)
    pub fn from_sec1(point: &[u8]) -> Result<Self> {
        if point.len() != 65 || point[0] != 0x04 {
            return Err(Error::bad_data("EC public key must be an uncompressed P-256 point"));
        }
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&point[1..33]);
        y.copy_from_slice(&point[33..65]);
        Ok(Self::Ec2 {
            alg: CoseAlgorithm::Es256,
            x,
            y,
        })
    }

    /// Build from RSA components; leading zero bytes of `n` are stripped
    pub fn from_rsa(alg: CoseAlgorithm, n: &[u8], e: &[u8]) -> Self {
        let first = n.iter().position(|b| *b != 0).unwrap_or(n.len());
        Self::Rsa {
            alg,
            n: n[first..].to_vec(),
            e: e.to_vec(),
        }
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            Self::Ec2 { alg, .. } | Self::Rsa { alg, .. } => *alg,
        }
    }

    pub fn to_map(&self) -> Result<Map> {
        let builder = match self {
            Self::Ec2 { alg, x, y } => MapBuilder::new()
                .insert(labels::KTY, KTY_EC2)?
                .insert(labels::ALG, alg.to_i64())?
                .insert(labels::CRV, CRV_P256)?
                .insert_bytes(labels::X, x)?
                .insert_bytes(labels::Y, y)?,
            Self::Rsa { alg, n, e } => MapBuilder::new()
                .insert(labels::KTY, KTY_RSA)?
                .insert(labels::ALG, alg.to_i64())?
                .insert_bytes(labels::RSA_N, n)?
                .insert_bytes(labels::RSA_E, e)?,
        };
        Ok(builder.build_value())
    }

    pub fn to_bytes_with(&self, ordering: MapOrdering) -> Result<Vec<u8>> {
        cbor::encode_with(&Value::Map(self.to_map()?), ordering)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with(MapOrdering::Insertion)
    }

    /// Parse a COSE key map and check it describes a usable key
    pub fn from_map(map: Map) -> Result<Self> {
        let parser = MapParser::from_value(Value::Map(map))?.with_context("COSE_Key");

        let alg = parser.get_int(labels::ALG)?;
        let alg = CoseAlgorithm::from_i64(alg)
            .ok_or_else(|| Error::bad_data(format!("unsupported COSE algorithm {alg}")))?;

        let key = match parser.get_int(labels::KTY)? {
            KTY_EC2 => {
                if alg != CoseAlgorithm::Es256 || parser.get_int(labels::CRV)? != CRV_P256 {
                    return Err(Error::bad_data("EC2 key must be ES256 on P-256"));
                }
                let x: [u8; 32] = parser
                    .get_bytes(labels::X)?
                    .try_into()
                    .map_err(|_| Error::bad_data("EC2 x coordinate must be 32 bytes"))?;
                let y: [u8; 32] = parser
                    .get_bytes(labels::Y)?
                    .try_into()
                    .map_err(|_| Error::bad_data("EC2 y coordinate must be 32 bytes"))?;
                Self::Ec2 { alg, x, y }
            }
            KTY_RSA => {
                if !alg.is_rsa() {
                    return Err(Error::bad_data("RSA key with non-RSA algorithm"));
                }
                let n = parser.get_bytes(labels::RSA_N)?;
                let e = parser.get_bytes(labels::RSA_E)?;
                Self::from_rsa(alg, n, e)
            }
            other => return Err(Error::bad_data(format!("unsupported COSE key type {other}"))),
        };

        key.validate()?;
        Ok(key)
    }

    /// Parse a COSE key at the start of `data`, returning the consumed length
    pub fn from_bytes_prefix(data: &[u8]) -> Result<(Self, usize)> {
        let (value, consumed) = cbor::decode_prefix(data)?;
        match value {
            Value::Map(map) => Ok((Self::from_map(map)?, consumed)),
            _ => Err(Error::bad_data("COSE key must be a map")),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Ec2 { .. } => ecdsa::validate_public_key(&self.sec1()?)?,
            Self::Rsa { n, e, .. } => {
                rsa::public_key(n, e)?;
            }
        }
        Ok(())
    }

    fn sec1(&self) -> Result<Vec<u8>> {
        match self {
            Self::Ec2 { x, y, .. } => {
                let mut point = Vec::with_capacity(65);
                point.push(0x04);
                point.extend_from_slice(x);
                point.extend_from_slice(y);
                Ok(point)
            }
            Self::Rsa { .. } => Err(Error::bad_data("not an EC key")),
        }
    }

    /// Verify a signature made by the matching private key
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            Self::Ec2 { .. } => ecdsa::verify(&self.sec1()?, data, signature)?,
            Self::Rsa { alg, n, e } => {
                let hash = match alg {
                    CoseAlgorithm::Rs384 => RsaHash::Sha384,
                    CoseAlgorithm::Rs512 => RsaHash::Sha512,
                    _ => RsaHash::Sha256,
                };
                rsa::verify(n, e, hash, data, signature)?
            }
        }
        Ok(())
    }
}
