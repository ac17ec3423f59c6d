//! In-memory implementations of the storage capabilities
//!
//! Suitable for tests and for embedding where persistence is handled
//! elsewhere. Credentials are kept serialized, so every read goes through
//! the same CBOR path a persistent store would use.

use crate::callbacks::{CredentialStore, KeyStore};
use crate::credential::PublicKeyCredentialSource;
use crate::status::{Error, Result};

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::unknown("store lock poisoned"))
}

/// Credential store backed by a `HashMap`
///
/// Entries are scoped by RP ID and keyed by the hex credential ID. Within an
/// RP, `load_all` returns credentials in the order they were first saved.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    scopes: Mutex<HashMap<String, Vec<(String, Vec<u8>)>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored credentials across all RPs
    pub fn len(&self) -> usize {
        self.scopes
            .lock()
            .map(|scopes| scopes.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn lookup(&self, rp_id: &str, credential_id: &[u8]) -> Result<Option<PublicKeyCredentialSource>> {
        let key = hex::encode(credential_id);
        let scopes = lock(&self.scopes)?;
        scopes
            .get(rp_id)
            .and_then(|entries| entries.iter().find(|(k, _)| *k == key))
            .map(|(_, cbor)| PublicKeyCredentialSource::from_cbor(cbor))
            .transpose()
    }

    fn save(&self, source: &PublicKeyCredentialSource) -> Result<()> {
        let key = hex::encode(&source.id);
        let cbor = source.to_cbor()?;

        let mut scopes = lock(&self.scopes)?;
        let entries = scopes.entry(source.rp_id.clone()).or_default();
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = cbor,
            None => entries.push((key, cbor)),
        }
        Ok(())
    }

    fn load_all(&self, rp_id: &str) -> Result<Vec<PublicKeyCredentialSource>> {
        let scopes = lock(&self.scopes)?;
        scopes
            .get(rp_id)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(_, cbor)| PublicKeyCredentialSource::from_cbor(cbor))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    fn delete(&self, source: &PublicKeyCredentialSource) -> Result<bool> {
        let key = hex::encode(&source.id);
        let mut scopes = lock(&self.scopes)?;
        let Some(entries) = scopes.get_mut(&source.rp_id) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|(k, _)| *k != key);
        Ok(entries.len() != before)
    }

    fn delete_all(&self, rp_id: &str, user_handle: &[u8]) -> Result<()> {
        let mut scopes = lock(&self.scopes)?;
        if let Some(entries) = scopes.get_mut(rp_id) {
            let mut kept = Vec::with_capacity(entries.len());
            for (key, cbor) in entries.iter() {
                let source = PublicKeyCredentialSource::from_cbor(cbor)?;
                if !source.same_account(rp_id, user_handle) {
                    kept.push((key.clone(), cbor.clone()));
                }
            }
            *entries = kept;
        }
        Ok(())
    }

    fn remove_all(&self, keep: &[Vec<u8>], rp_id: Option<&str>) -> Result<()> {
        let keep: Vec<String> = keep.iter().map(hex::encode).collect();
        let mut scopes = lock(&self.scopes)?;
        for (scope, entries) in scopes.iter_mut() {
            if rp_id.is_some_and(|rp| rp != scope.as_str()) {
                continue;
            }
            entries.retain(|(k, _)| keep.contains(k));
        }
        scopes.retain(|_, entries| !entries.is_empty());
        Ok(())
    }
}

/// Key store backed by a `BTreeMap`
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    keys: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.keys
            .lock()
            .map(|keys| keys.contains_key(name))
            .unwrap_or(false)
    }
}

impl KeyStore for MemoryKeyStore {
    fn load_key(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(lock(&self.keys)?.get(name).cloned())
    }

    fn save_key(&self, name: &str, data: &[u8]) -> Result<()> {
        lock(&self.keys)?.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn delete_key(&self, name: &str) -> Result<bool> {
        Ok(lock(&self.keys)?.remove(name).is_some())
    }

    fn delete_prefixed(&self, prefix: &str) -> Result<()> {
        lock(&self.keys)?.retain(|name, _| !name.starts_with(prefix));
        Ok(())
    }
}
