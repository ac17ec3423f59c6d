//! Hybrid RSA-OAEP + AES-256-GCM key wrapping
//!
//! Used to turn a serialized credential source into an opaque, self-contained
//! credential ID. RSA alone cannot encrypt a payload larger than its modulus,
//! so a fresh AES-256 key encrypts the payload and RSA-OAEP (SHA-256) wraps
//! that key.
//!
//! Blob layout:
//!
//! ```text
//! version (1) || RSA-OAEP(aes_key) (modulus bytes) || nonce (12) || AES-GCM(ciphertext || tag)
//! ```

use crate::error::{CryptoError, Result};
use crate::rsa::RsaKeyPair;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::Oaep;
use rsa::traits::PublicKeyParts;
use sha2::Sha256;
use zeroize::Zeroizing;

/// Current blob format version
pub const WRAP_VERSION: u8 = 0x01;

/// Modulus size of a wrapping key when none is configured
pub const DEFAULT_KEY_BITS: usize = 4096;

const AES_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Long-lived asymmetric key used to seal credential sources
#[derive(Debug, Clone)]
pub struct WrappingKey {
    key: RsaKeyPair,
}

impl WrappingKey {
    /// Generate a fresh wrapping key
    pub fn generate(bits: usize) -> Result<Self> {
        Ok(Self {
            key: RsaKeyPair::generate(bits)?,
        })
    }

    /// Import from PKCS#8 DER
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            key: RsaKeyPair::from_pkcs8_der(der)?,
        })
    }

    /// Export as PKCS#8 DER for persistence
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.key.to_pkcs8_der()
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.key.bits()
    }

    /// Encrypt `plaintext` into a self-contained blob
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dfido2_crypto::wrap::WrappingKey;
    ///
    /// let key = WrappingKey::generate(2048).unwrap();
    /// let blob = key.seal(b"credential").unwrap();
    /// assert_eq!(&key.open(&blob).unwrap()[..], b"credential");
    /// ```
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut aes_key = Zeroizing::new([0u8; AES_KEY_LEN]);
        OsRng.fill_bytes(aes_key.as_mut());

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let wrapped_key = self
            .key
            .inner()
            .to_public_key()
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), aes_key.as_ref())
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let cipher = Aes256Gcm::new_from_slice(aes_key.as_ref())
            .map_err(|_| CryptoError::EncryptionFailed)?;
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        let mut blob = Vec::with_capacity(1 + wrapped_key.len() + NONCE_LEN + ciphertext.len());
        blob.push(WRAP_VERSION);
        blob.extend_from_slice(&wrapped_key);
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Decrypt a blob produced by [`seal`](Self::seal)
    ///
    /// Any structural or authentication failure is reported as
    /// [`CryptoError::DecryptionFailed`] or [`CryptoError::MalformedCiphertext`].
    pub fn open(&self, blob: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let wrapped_len = self.key.inner().size();
        if blob.len() < 1 + wrapped_len + NONCE_LEN + TAG_LEN || blob[0] != WRAP_VERSION {
            return Err(CryptoError::MalformedCiphertext);
        }

        let (wrapped_key, rest) = blob[1..].split_at(wrapped_len);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let aes_key = Zeroizing::new(
            self.key
                .inner()
                .decrypt(Oaep::new::<Sha256>(), wrapped_key)
                .map_err(|_| CryptoError::DecryptionFailed)?,
        );
        if aes_key.len() != AES_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: AES_KEY_LEN,
                actual: aes_key.len(),
            });
        }

        let cipher =
            Aes256Gcm::new_from_slice(&aes_key).map_err(|_| CryptoError::DecryptionFailed)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)?;

        Ok(Zeroizing::new(plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_open_round_trip() {
        let key = WrappingKey::generate(2048).unwrap();
        let payload = vec![0xA5u8; 600];

        let blob = key.seal(&payload).unwrap();
        assert_eq!(blob[0], WRAP_VERSION);
        assert_eq!(blob.len(), 1 + 256 + NONCE_LEN + payload.len() + TAG_LEN);

        let opened = key.open(&blob).unwrap();
        assert_eq!(&opened[..], &payload[..]);
    }

    #[test]
    fn test_seal_is_randomized() {
        let key = WrappingKey::generate(2048).unwrap();

        let a = key.seal(b"same").unwrap();
        let b = key.seal(b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_open_with_other_key_fails() {
        let key = WrappingKey::generate(2048).unwrap();
        let other = WrappingKey::generate(2048).unwrap();

        let blob = key.seal(b"secret").unwrap();
        assert!(matches!(
            other.open(&blob),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_open_tampered_fails() {
        let key = WrappingKey::generate(2048).unwrap();
        let mut blob = key.seal(b"secret").unwrap();

        let last = blob.len() - 1;
        blob[last] ^= 0x01;
        assert!(key.open(&blob).is_err());
    }

    #[test]
    fn test_open_short_blob_fails() {
        let key = WrappingKey::generate(2048).unwrap();

        assert!(matches!(
            key.open(&[WRAP_VERSION; 16]),
            Err(CryptoError::MalformedCiphertext)
        ));
        assert!(matches!(
            key.open(&[]),
            Err(CryptoError::MalformedCiphertext)
        ));
    }

    #[test]
    fn test_pkcs8_round_trip_opens_old_blobs() {
        let key = WrappingKey::generate(2048).unwrap();
        let blob = key.seal(b"persisted").unwrap();

        let restored = WrappingKey::from_pkcs8_der(&key.to_pkcs8_der().unwrap()).unwrap();
        assert_eq!(restored.bits(), 2048);
        assert_eq!(&restored.open(&blob).unwrap()[..], b"persisted");
    }
}
