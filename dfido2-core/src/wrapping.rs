//! Non-resident credential wrapping
//!
//! A non-resident credential is never stored. Its source is serialized,
//! sealed with the authenticator's wrapping key and handed to the RP as the
//! credential ID. Presenting the ID back lets the authenticator recover the
//! source by decrypting it.
//!
//! The wrapping key is an RSA key generated on first use and persisted in
//! the [`KeyStore`] under [`WRAPPING_KEY_NAME`]. Losing it makes every
//! outstanding non-resident credential unusable.

use crate::callbacks::KeyStore;
use crate::cbor::MapOrdering;
use crate::credential::PublicKeyCredentialSource;
use crate::status::{Error, Result};
use crate::types::PublicKeyCredentialDescriptor;

use dfido2_crypto::WrappingKey;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Key store entry holding the wrapping key (PKCS#8 DER)
pub const WRAPPING_KEY_NAME: &str = "dfido2.wrapping_key";

/// Seals and opens credential sources with the authenticator's wrapping key
pub struct CredentialWrapper {
    key_store: Arc<dyn KeyStore>,
    key_bits: usize,
    ordering: MapOrdering,
    cached: Mutex<Option<Arc<WrappingKey>>>,
}

impl CredentialWrapper {
    pub fn new(key_store: Arc<dyn KeyStore>, key_bits: usize, ordering: MapOrdering) -> Self {
        Self {
            key_store,
            key_bits,
            ordering,
            cached: Mutex::new(None),
        }
    }

    /// Load the wrapping key, generating and persisting it on first use
    ///
    /// The cache lock is held across generation so concurrent first uses
    /// produce a single key.
    async fn key(&self) -> Result<Arc<WrappingKey>> {
        let mut cached = self.cached.lock().await;
        if let Some(key) = cached.as_ref() {
            return Ok(key.clone());
        }

        let key = match self.key_store.load_key(WRAPPING_KEY_NAME)? {
            Some(der) => WrappingKey::from_pkcs8_der(&der)?,
            None => {
                let bits = self.key_bits;
                let key = tokio::task::spawn_blocking(move || WrappingKey::generate(bits))
                    .await
                    .map_err(|e| Error::unknown(format!("wrapping key generation failed: {e}")))??;
                self.key_store
                    .save_key(WRAPPING_KEY_NAME, &key.to_pkcs8_der()?)?;
                info!(bits, "Generated credential wrapping key");
                key
            }
        };

        let key = Arc::new(key);
        *cached = Some(key.clone());
        Ok(key)
    }

    /// Load the wrapping key only if one already exists
    async fn existing_key(&self) -> Result<Option<Arc<WrappingKey>>> {
        {
            let cached = self.cached.lock().await;
            if let Some(key) = cached.as_ref() {
                return Ok(Some(key.clone()));
            }
        }
        if self.key_store.load_key(WRAPPING_KEY_NAME)?.is_none() {
            return Ok(None);
        }
        self.key().await.map(Some)
    }

    /// Seal a source into a credential ID
    ///
    /// The source's own `id` is not part of the sealed data; the ciphertext
    /// becomes the ID.
    pub async fn wrap(&self, source: &PublicKeyCredentialSource) -> Result<Vec<u8>> {
        let key = self.key().await?;
        let mut sealed = source.clone();
        sealed.id = Vec::new();
        let plaintext = zeroize::Zeroizing::new(sealed.to_cbor_with(self.ordering)?);
        Ok(key.seal(&plaintext)?)
    }

    /// Open a credential ID; any failure is `badData`
    pub async fn unwrap(&self, credential_id: &[u8]) -> Result<PublicKeyCredentialSource> {
        let Some(key) = self.existing_key().await? else {
            return Err(Error::bad_data("no wrapping key"));
        };
        unwrap_with(&key, credential_id)
    }

    /// Trial-decrypt candidates and return the first source bound to `rp_id`
    ///
    /// Candidates that fail to open, fail to parse, or belong to another RP
    /// are skipped.
    pub async fn find(
        &self,
        rp_id: &str,
        candidates: &[PublicKeyCredentialDescriptor],
    ) -> Result<Option<PublicKeyCredentialSource>> {
        let Some(key) = self.existing_key().await? else {
            debug!("No wrapping key yet, skipping non-resident lookup");
            return Ok(None);
        };

        for candidate in candidates {
            match unwrap_with(&key, &candidate.id) {
                Ok(source) if source.rp_id == rp_id => return Ok(Some(source)),
                Ok(_) => debug!(
                    id_len = candidate.id.len(),
                    "Wrapped credential belongs to another RP, trying next"
                ),
                Err(e) => debug!(
                    id_len = candidate.id.len(),
                    error = %e,
                    "Credential ID did not unwrap, trying next"
                ),
            }
        }
        Ok(None)
    }

    /// Forget the wrapping key; outstanding non-resident IDs stop resolving
    pub async fn reset(&self) -> Result<()> {
        let mut cached = self.cached.lock().await;
        *cached = None;
        self.key_store.delete_key(WRAPPING_KEY_NAME)?;
        info!("Deleted credential wrapping key");
        Ok(())
    }
}

fn unwrap_with(key: &WrappingKey, credential_id: &[u8]) -> Result<PublicKeyCredentialSource> {
    let plaintext = key
        .open(credential_id)
        .map_err(|e| Error::bad_data(format!("credential ID did not unwrap: {e}")))?;
    let mut source = PublicKeyCredentialSource::from_cbor(&plaintext)?;
    source.id = credential_id.to_vec();
    Ok(source)
}
