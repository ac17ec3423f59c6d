//! P-256 ECDSA (ES256) signatures for attestation and assertions
//!
//! COSE algorithm identifier: -7 (ES256)
//! Spec: <https://www.rfc-editor.org/rfc/rfc8152.html#section-8.1>
//!
//! ES256 uses:
//! - Curve: P-256 (secp256r1 / prime256v1)
//! - Hash: SHA-256
//! - Signature format: DER-encoded

use crate::error::{CryptoError, Result};

use p256::SecretKey;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey, signature::Signer, signature::Verifier};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

/// Generate new random ES256 key pair
///
/// Returns (private_key, public_key) where:
/// - private_key: 32-byte scalar
/// - public_key: 65-byte uncompressed SEC1 format (0x04 || x || y)
///
/// # Examples
///
/// ```
/// use dfido2_crypto::ecdsa;
///
/// let (private_key, public_key) = ecdsa::generate_keypair();
/// assert_eq!(private_key.len(), 32);
/// assert_eq!(public_key.len(), 65);
/// assert_eq!(public_key[0], 0x04);
/// ```
pub fn generate_keypair() -> (Zeroizing<[u8; 32]>, Vec<u8>) {
    let signing_key = SigningKey::random(&mut OsRng);
    let verifying_key = signing_key.verifying_key();

    let private_key = Zeroizing::new(signing_key.to_bytes().into());

    // Public key in uncompressed SEC1 format
    let public_key = verifying_key.to_encoded_point(false).as_bytes().to_vec();

    (private_key, public_key)
}

/// Sign data with ES256 (P-256 + SHA-256)
///
/// The data is hashed with SHA-256 internally by the signing operation.
///
/// # Arguments
///
/// * `private_key` - 32-byte private scalar
/// * `data` - Data to sign
///
/// # Returns
///
/// DER-encoded ECDSA signature (typically 70-72 bytes)
///
/// # Examples
///
/// ```
/// use dfido2_crypto::ecdsa;
///
/// let (private_key, _) = ecdsa::generate_keypair();
/// let signature = ecdsa::sign(&private_key, b"Hello, FIDO2!").unwrap();
/// assert!(signature.len() >= 68 && signature.len() <= 72);
/// ```
pub fn sign(private_key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>> {
    let signing_key =
        SigningKey::from_bytes(private_key.into()).map_err(|_| CryptoError::InvalidPrivateKey)?;

    let signature: Signature = signing_key.sign(data);

    Ok(signature.to_der().to_bytes().to_vec())
}

/// Verify ES256 signature
///
/// # Arguments
///
/// * `public_key` - 65-byte uncompressed SEC1 format (0x04 || x || y)
/// * `data` - Data that was signed
/// * `signature` - DER-encoded signature
///
/// # Examples
///
/// ```
/// use dfido2_crypto::ecdsa;
///
/// let (private_key, public_key) = ecdsa::generate_keypair();
/// let signature = ecdsa::sign(&private_key, b"Hello, FIDO2!").unwrap();
/// assert!(ecdsa::verify(&public_key, b"Hello, FIDO2!", &signature).is_ok());
/// assert!(ecdsa::verify(&public_key, b"wrong", &signature).is_err());
/// ```
pub fn verify(public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<()> {
    let verifying_key =
        VerifyingKey::from_sec1_bytes(public_key).map_err(|_| CryptoError::InvalidPublicKey)?;

    let sig = Signature::from_der(signature).map_err(|_| CryptoError::InvalidSignature)?;

    verifying_key
        .verify(data, &sig)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// Get public key from private key
///
/// Returns the 65-byte uncompressed SEC1 public key (0x04 || x || y).
pub fn public_from_private(private_key: &[u8; 32]) -> Result<Vec<u8>> {
    let signing_key =
        SigningKey::from_bytes(private_key.into()).map_err(|_| CryptoError::InvalidPrivateKey)?;

    let verifying_key = signing_key.verifying_key();
    Ok(verifying_key.to_encoded_point(false).as_bytes().to_vec())
}

/// Check that a SEC1 point is on the P-256 curve
pub fn validate_public_key(public_key: &[u8]) -> Result<()> {
    VerifyingKey::from_sec1_bytes(public_key)
        .map(|_| ())
        .map_err(|_| CryptoError::InvalidPublicKey)
}

/// Export a private scalar as PKCS#8 DER
pub fn to_pkcs8_der(private_key: &[u8; 32]) -> Result<Zeroizing<Vec<u8>>> {
    let secret =
        SecretKey::from_bytes(private_key.into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
    let document = secret
        .to_pkcs8_der()
        .map_err(|_| CryptoError::InvalidPrivateKey)?;
    Ok(Zeroizing::new(document.as_bytes().to_vec()))
}

/// Import a private scalar from PKCS#8 DER
///
/// Fails with [`CryptoError::InvalidPrivateKey`] when the document does not
/// hold a P-256 key, which lets callers fall through to other key types.
pub fn from_pkcs8_der(der: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let secret = SecretKey::from_pkcs8_der(der).map_err(|_| CryptoError::InvalidPrivateKey)?;
    Ok(Zeroizing::new(secret.to_bytes().into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let (private_key, public_key) = generate_keypair();

        assert_eq!(public_key.len(), 65);
        assert_eq!(public_key[0], 0x04); // Uncompressed point marker
        assert_ne!(*private_key, [0u8; 32]);
    }

    #[test]
    fn test_sign_and_verify() {
        let (private_key, public_key) = generate_keypair();
        let message = b"Hello, FIDO2!";

        let signature = sign(&private_key, message).unwrap();

        // DER signature length varies with leading zeros of r and s
        assert!(signature.len() >= 68 && signature.len() <= 73);
        assert!(verify(&public_key, message, &signature).is_ok());
    }

    #[test]
    fn test_verify_wrong_public_key() {
        let (private_key, _) = generate_keypair();
        let (_, wrong_public_key) = generate_keypair();

        let signature = sign(&private_key, b"Hello, FIDO2!").unwrap();
        assert!(verify(&wrong_public_key, b"Hello, FIDO2!", &signature).is_err());
    }

    #[test]
    fn test_verify_invalid_signature() {
        let (_, public_key) = generate_keypair();
        let bad_signature = vec![0u8; 72];

        assert!(verify(&public_key, b"Hello, FIDO2!", &bad_signature).is_err());
    }

    #[test]
    fn test_public_from_private() {
        let (private_key, expected_public) = generate_keypair();
        let derived_public = public_from_private(&private_key).unwrap();

        assert_eq!(derived_public, expected_public);
    }

    #[test]
    fn test_invalid_private_key() {
        // All zeros is not a valid scalar
        let invalid_key = [0u8; 32];
        assert!(sign(&invalid_key, b"test").is_err());
        assert!(public_from_private(&invalid_key).is_err());
        assert!(to_pkcs8_der(&invalid_key).is_err());
    }

    #[test]
    fn test_pkcs8_round_trip() {
        let (private_key, public_key) = generate_keypair();

        let der = to_pkcs8_der(&private_key).unwrap();
        let restored = from_pkcs8_der(&der).unwrap();

        assert_eq!(*restored, *private_key);
        assert_eq!(public_from_private(&restored).unwrap(), public_key);
    }

    #[test]
    fn test_pkcs8_rejects_garbage() {
        assert!(from_pkcs8_der(&[0x30, 0x03, 0x02, 0x01, 0x00]).is_err());
    }

    #[test]
    fn test_validate_public_key() {
        let (_, public_key) = generate_keypair();
        assert!(validate_public_key(&public_key).is_ok());

        let mut off_curve = public_key.clone();
        off_curve[64] ^= 0x01;
        assert!(validate_public_key(&off_curve).is_err());
    }
}
