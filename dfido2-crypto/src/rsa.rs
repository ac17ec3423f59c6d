//! RSASSA-PKCS1-v1_5 signatures (RS256, RS384, RS512)
//!
//! COSE algorithm identifiers: -257 (RS256), -258 (RS384), -259 (RS512)
//! Spec: <https://www.rfc-editor.org/rfc/rfc8812.html#section-2>
//!
//! Each algorithm is paired with a fixed modulus size so a stored key
//! identifies its own algorithm:
//! - RS256: 2048-bit modulus, SHA-256
//! - RS384: 3072-bit modulus, SHA-384
//! - RS512: 4096-bit modulus, SHA-512

use crate::error::{CryptoError, Result};

use rand::rngs::OsRng;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

/// Hash paired with an RSA signature scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaHash {
    Sha256,
    Sha384,
    Sha512,
}

impl RsaHash {
    /// Modulus size (bits) generated for this scheme
    pub fn key_bits(self) -> usize {
        match self {
            Self::Sha256 => 2048,
            Self::Sha384 => 3072,
            Self::Sha512 => 4096,
        }
    }

    /// Scheme implied by a modulus size
    pub fn from_key_bits(bits: usize) -> Result<Self> {
        match bits {
            2048 => Ok(Self::Sha256),
            3072 => Ok(Self::Sha384),
            4096 => Ok(Self::Sha512),
            other => Err(CryptoError::UnsupportedKeySize(other)),
        }
    }
}

/// RSA private key for credential signing
///
/// Thin wrapper so callers never touch the `rsa` crate types directly.
#[derive(Clone)]
pub struct RsaKeyPair {
    key: RsaPrivateKey,
}

impl core::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RsaKeyPair")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

impl RsaKeyPair {
    /// Generate a new key with the given modulus size
    pub fn generate(bits: usize) -> Result<Self> {
        let key =
            RsaPrivateKey::new(&mut OsRng, bits).map_err(|_| CryptoError::KeyGenerationFailed)?;
        Ok(Self { key })
    }

    /// Import from PKCS#8 DER
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_der(der).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { key })
    }

    /// Export as PKCS#8 DER
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let document = self
            .key
            .to_pkcs8_der()
            .map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.key.size() * 8
    }

    /// Big-endian modulus, exactly `size()` bytes long
    pub fn modulus(&self) -> Vec<u8> {
        let n = self.key.n().to_bytes_be();
        left_pad(&n, self.key.size())
    }

    /// Big-endian public exponent
    pub fn exponent(&self) -> Vec<u8> {
        self.key.e().to_bytes_be()
    }

    /// Sign `data` with PKCS#1 v1.5 padding over the given hash
    pub fn sign(&self, hash: RsaHash, data: &[u8]) -> Result<Vec<u8>> {
        let key = self.key.clone();
        let signature = match hash {
            RsaHash::Sha256 => SigningKey::<Sha256>::new(key).try_sign(data),
            RsaHash::Sha384 => SigningKey::<Sha384>::new(key).try_sign(data),
            RsaHash::Sha512 => SigningKey::<Sha512>::new(key).try_sign(data),
        }
        .map_err(|_| CryptoError::InvalidPrivateKey)?;

        Ok(signature.to_vec())
    }

    pub(crate) fn inner(&self) -> &RsaPrivateKey {
        &self.key
    }
}

/// Verify a PKCS#1 v1.5 signature against a raw (n, e) public key
///
/// # Arguments
///
/// * `modulus` - Big-endian modulus (leading zero bytes allowed)
/// * `exponent` - Big-endian public exponent
/// * `hash` - Hash the signature was computed over
/// * `data` - Data that was signed
/// * `signature` - Signature bytes
pub fn verify(
    modulus: &[u8],
    exponent: &[u8],
    hash: RsaHash,
    data: &[u8],
    signature: &[u8],
) -> Result<()> {
    let public = public_key(modulus, exponent)?;
    let sig = Signature::try_from(signature).map_err(|_| CryptoError::InvalidSignature)?;

    match hash {
        RsaHash::Sha256 => VerifyingKey::<Sha256>::new(public).verify(data, &sig),
        RsaHash::Sha384 => VerifyingKey::<Sha384>::new(public).verify(data, &sig),
        RsaHash::Sha512 => VerifyingKey::<Sha512>::new(public).verify(data, &sig),
    }
    .map_err(|_| CryptoError::InvalidSignature)
}

/// Rebuild a public key from its big-endian components
pub fn public_key(modulus: &[u8], exponent: &[u8]) -> Result<RsaPublicKey> {
    RsaPublicKey::new(
        BigUint::from_bytes_be(modulus),
        BigUint::from_bytes_be(exponent),
    )
    .map_err(|_| CryptoError::InvalidPublicKey)
}

fn left_pad(bytes: &[u8], len: usize) -> Vec<u8> {
    if bytes.len() >= len {
        return bytes[bytes.len() - len..].to_vec();
    }
    let mut out = vec![0u8; len - bytes.len()];
    out.extend_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_rs256() {
        let key = RsaKeyPair::generate(2048).unwrap();
        let message = b"Hello, FIDO2!";

        let signature = key.sign(RsaHash::Sha256, message).unwrap();
        assert_eq!(signature.len(), 256);

        assert!(
            verify(
                &key.modulus(),
                &key.exponent(),
                RsaHash::Sha256,
                message,
                &signature
            )
            .is_ok()
        );
        assert!(
            verify(
                &key.modulus(),
                &key.exponent(),
                RsaHash::Sha256,
                b"wrong",
                &signature
            )
            .is_err()
        );
    }

    #[test]
    fn test_hash_mismatch_fails() {
        let key = RsaKeyPair::generate(2048).unwrap();
        let signature = key.sign(RsaHash::Sha384, b"data").unwrap();

        assert!(
            verify(
                &key.modulus(),
                &key.exponent(),
                RsaHash::Sha256,
                b"data",
                &signature
            )
            .is_err()
        );
    }

    #[test]
    fn test_modulus_has_key_size() {
        let key = RsaKeyPair::generate(2048).unwrap();

        assert_eq!(key.bits(), 2048);
        assert_eq!(key.modulus().len(), 256);
        // 65537
        assert_eq!(key.exponent(), vec![0x01, 0x00, 0x01]);
    }

    #[test]
    fn test_pkcs8_round_trip() {
        let key = RsaKeyPair::generate(2048).unwrap();
        let der = key.to_pkcs8_der().unwrap();
        let restored = RsaKeyPair::from_pkcs8_der(&der).unwrap();

        assert_eq!(restored.modulus(), key.modulus());
    }

    #[test]
    fn test_key_bits_mapping() {
        assert_eq!(RsaHash::from_key_bits(2048).unwrap(), RsaHash::Sha256);
        assert_eq!(RsaHash::from_key_bits(3072).unwrap(), RsaHash::Sha384);
        assert_eq!(RsaHash::from_key_bits(4096).unwrap(), RsaHash::Sha512);
        assert!(matches!(
            RsaHash::from_key_bits(1024),
            Err(CryptoError::UnsupportedKeySize(1024))
        ));
    }

    #[test]
    fn test_left_pad() {
        assert_eq!(left_pad(&[1, 2], 4), vec![0, 0, 1, 2]);
        assert_eq!(left_pad(&[0, 1, 2], 2), vec![1, 2]);
    }
}
