//! Credential private keys
//!
//! A credential key is either a P-256 scalar (ES256) or an RSA key whose
//! modulus size fixes the hash (RS256/RS384/RS512). Keys are exported as
//! PKCS#8 DER, so the algorithm can always be recovered from the key itself.

use crate::cose::CosePublicKey;
use crate::status::{Error, Result};
use crate::types::CoseAlgorithm;

use dfido2_crypto::{RsaHash, RsaKeyPair, ecdsa};
use zeroize::Zeroizing;

/// Private key of one credential
#[derive(Clone)]
pub enum CredentialPrivateKey {
    Es256(Zeroizing<[u8; 32]>),
    Rsa { hash: RsaHash, key: RsaKeyPair },
}

impl core::fmt::Debug for CredentialPrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "CredentialPrivateKey({:?})", self.algorithm())
    }
}

impl CredentialPrivateKey {
    /// Generate a key for `alg`
    ///
    /// RSA generation is slow; async callers should use
    /// [`generate_blocking`](Self::generate_blocking).
    pub fn generate(alg: CoseAlgorithm) -> Result<Self> {
        match alg {
            CoseAlgorithm::Es256 => {
                let (private_key, _) = ecdsa::generate_keypair();
                Ok(Self::Es256(private_key))
            }
            CoseAlgorithm::Rs256 | CoseAlgorithm::Rs384 | CoseAlgorithm::Rs512 => {
                let hash = rsa_hash(alg);
                let key = RsaKeyPair::generate(hash.key_bits())?;
                Ok(Self::Rsa { hash, key })
            }
        }
    }

    /// Generate on the blocking thread pool
    pub async fn generate_blocking(alg: CoseAlgorithm) -> Result<Self> {
        tokio::task::spawn_blocking(move || Self::generate(alg))
            .await
            .map_err(|e| Error::unknown(format!("key generation task failed: {e}")))?
    }

    pub fn algorithm(&self) -> CoseAlgorithm {
        match self {
            Self::Es256(_) => CoseAlgorithm::Es256,
            Self::Rsa { hash, .. } => match hash {
                RsaHash::Sha256 => CoseAlgorithm::Rs256,
                RsaHash::Sha384 => CoseAlgorithm::Rs384,
                RsaHash::Sha512 => CoseAlgorithm::Rs512,
            },
        }
    }

    /// COSE encoding of the matching public key
    pub fn public_key(&self) -> Result<CosePublicKey> {
        match self {
            Self::Es256(scalar) => CosePublicKey::from_sec1(&ecdsa::public_from_private(scalar)?),
            Self::Rsa { key, .. } => Ok(CosePublicKey::from_rsa(
                self.algorithm(),
                &key.modulus(),
                &key.exponent(),
            )),
        }
    }

    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        match self {
            Self::Es256(scalar) => Ok(ecdsa::to_pkcs8_der(scalar)?),
            Self::Rsa { key, .. } => Ok(key.to_pkcs8_der()?),
        }
    }

    /// Import a PKCS#8 key; P-256 is tried first, then RSA
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        if let Ok(scalar) = ecdsa::from_pkcs8_der(der) {
            return Ok(Self::Es256(scalar));
        }
        let key = RsaKeyPair::from_pkcs8_der(der)
            .map_err(|_| Error::bad_data("private key is neither P-256 nor RSA PKCS#8"))?;
        let hash = RsaHash::from_key_bits(key.bits())?;
        Ok(Self::Rsa { hash, key })
    }

    /// Sign `data`; ES256 yields a DER signature, RSA a PKCS#1 v1.5 one
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Es256(scalar) => Ok(ecdsa::sign(scalar, data)?),
            Self::Rsa { hash, key } => Ok(key.sign(*hash, data)?),
        }
    }

    /// Sign on the blocking thread pool
    pub async fn sign_blocking(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        let key = self.clone();
        tokio::task::spawn_blocking(move || key.sign(&data))
            .await
            .map_err(|e| Error::unknown(format!("signing task failed: {e}")))?
    }
}

fn rsa_hash(alg: CoseAlgorithm) -> RsaHash {
    match alg {
        CoseAlgorithm::Rs384 => RsaHash::Sha384,
        CoseAlgorithm::Rs512 => RsaHash::Sha512,
        _ => RsaHash::Sha256,
    }
}
