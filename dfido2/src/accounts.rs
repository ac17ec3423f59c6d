//! Registered accounts list
//!
//! An optional record of the accounts registered through this client, kept
//! per RP as JSON in the [`KeyStore`]. Hosts use it to offer an account
//! picker before a conditional-mediation sign in.

use crate::{Error, KeyStore, Result};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Key store prefix; one entry per RP ID
pub const ACCOUNTS_KEY_PREFIX: &str = "dfido2_client_accounts";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub rpid: String,
    pub username: String,
    pub displayname: String,
    /// Credential ID, base64url
    #[serde(rename = "credIdBase64")]
    pub cred_id_base64: String,
    /// User handle, base64url; only recorded for resident credentials
    #[serde(
        rename = "userHandle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub user_handle: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Accounts {
    accounts: Vec<Account>,
}

/// Accounts list backed by a key store
#[derive(Clone)]
pub struct AccountsList {
    key_store: Arc<dyn KeyStore>,
}

impl AccountsList {
    pub fn new(key_store: Arc<dyn KeyStore>) -> Self {
        Self { key_store }
    }

    fn key_name(rp_id: &str) -> String {
        format!("{ACCOUNTS_KEY_PREFIX}.{rp_id}")
    }

    /// Accounts registered for `rp_id`, oldest first
    pub fn list(&self, rp_id: &str) -> Result<Vec<Account>> {
        let Some(data) = self.key_store.load_key(&Self::key_name(rp_id))? else {
            return Ok(Vec::new());
        };
        let accounts: Accounts = serde_json::from_slice(&data)
            .map_err(|e| Error::bad_data(format!("corrupt accounts list: {e}")))?;
        Ok(accounts.accounts)
    }

    /// Append an account to its RP's list
    ///
    /// An entry for the same credential ID is replaced. So is a resident
    /// entry for the same user handle, whose credential the authenticator
    /// has just overwritten.
    pub fn record(&self, account: Account) -> Result<()> {
        let name = Self::key_name(&account.rpid);
        let mut accounts = Accounts {
            accounts: self.list(&account.rpid)?,
        };
        accounts.accounts.retain(|existing| {
            existing.cred_id_base64 != account.cred_id_base64
                && (account.user_handle.is_none() || existing.user_handle != account.user_handle)
        });
        accounts.accounts.push(account);

        let data = serde_json::to_vec(&accounts)
            .map_err(|e| Error::unknown(format!("JSON encoding failed: {e}")))?;
        self.key_store.save_key(&name, &data)
    }

    /// Forget the accounts of one RP, or of every RP when `None`
    pub fn clear(&self, rp_id: Option<&str>) -> Result<()> {
        match rp_id {
            Some(rp_id) => self.key_store.delete_key(&Self::key_name(rp_id)).map(|_| ()),
            None => self
                .key_store
                .delete_prefixed(&format!("{ACCOUNTS_KEY_PREFIX}.")),
        }
    }
}
