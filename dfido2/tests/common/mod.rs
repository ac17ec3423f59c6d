//! Common test utilities for dfido2 integration tests
//!
//! Shared consent providers, authenticator doubles and option builders.

#![allow(dead_code)]

use dfido2::{
    AssertionResult, AttestationObject, Authenticator, AuthenticatorAttachment, AuthenticatorConfig,
    AuthenticatorTransport, Client, Config, ConsentProvider, ConsentResult, Error, ErrorKind,
    GetAssertionRequest, MakeCredentialRequest, MemoryCredentialStore, MemoryKeyStore,
    PublicKeyCredentialCreationOptions, PublicKeyCredentialRequestOptions,
    PublicKeyCredentialSource, Result,
};

use async_trait::async_trait;
use base64::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const TEST_RP_ID: &str = "example.com";
pub const TEST_ORIGIN: &str = "https://example.com";
pub const TEST_USER_ID: &[u8] = &[0x75, 0x73, 0x65, 0x72, 0x2d, 0x31];
pub const TEST_CHALLENGE: &[u8] = b"server-challenge-0123456789";

/// Route `tracing` output to the test harness; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Consent provider answering every prompt the same way
pub struct TestConsent {
    result: ConsentResult,
    delay: Duration,
    prompts: AtomicUsize,
}

impl TestConsent {
    pub fn granting() -> Arc<Self> {
        Self::answering(ConsentResult::Granted)
    }

    pub fn answering(result: ConsentResult) -> Arc<Self> {
        Self::answering_after(result, Duration::ZERO)
    }

    /// Answer only after the user has thought about it for `delay`
    pub fn answering_after(result: ConsentResult, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result,
            delay,
            prompts: AtomicUsize::new(0),
        })
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConsentProvider for TestConsent {
    async fn request_consent(&self, _message: &str) -> Result<ConsentResult> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.result)
    }
}

/// A platform client and the stores behind it
pub struct TestPlatform {
    pub client: Client,
    pub store: Arc<MemoryCredentialStore>,
    pub key_store: Arc<MemoryKeyStore>,
    pub consent: Arc<TestConsent>,
}

impl TestPlatform {
    pub fn new(config: Config) -> Self {
        Self::with_consent(config, TestConsent::granting())
    }

    pub fn with_consent(config: Config, consent: Arc<TestConsent>) -> Self {
        let store = Arc::new(MemoryCredentialStore::new());
        let key_store = Arc::new(MemoryKeyStore::new());
        let client = Client::platform(config, store.clone(), key_store.clone(), consent.clone());
        Self {
            client,
            store,
            key_store,
            consent,
        }
    }

    /// Default client config with an authenticator config applied
    pub fn with_authenticator(authenticator: AuthenticatorConfig) -> Self {
        Self::new(Config::new().with_authenticator(authenticator))
    }
}

/// Authenticator double that stalls, then fails
pub struct StallingAuthenticator {
    pub delay: Duration,
    pub attachment: AuthenticatorAttachment,
    pub calls: AtomicUsize,
}

impl StallingAuthenticator {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            attachment: AuthenticatorAttachment::CrossPlatform,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn stall(&self) -> Error {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Error::not_allowed("stalled")
    }
}

#[async_trait]
impl Authenticator for StallingAuthenticator {
    fn attachment(&self) -> AuthenticatorAttachment {
        self.attachment
    }

    fn transport(&self) -> AuthenticatorTransport {
        AuthenticatorTransport::Usb
    }

    fn can_store_resident_key(&self) -> bool {
        false
    }

    fn can_perform_user_verification(&self) -> bool {
        false
    }

    fn can_silent_credential_discovery(&self) -> bool {
        false
    }

    async fn make_credential(&self, _request: MakeCredentialRequest) -> Result<AttestationObject> {
        Err(self.stall().await)
    }

    async fn get_assertion(&self, _request: GetAssertionRequest) -> Result<AssertionResult> {
        Err(self.stall().await)
    }

    async fn lookup_credential_source(
        &self,
        _rp_id: &str,
        _credential_id: &[u8],
    ) -> Result<Option<PublicKeyCredentialSource>> {
        Ok(None)
    }

    async fn silent_credential_discovery(
        &self,
        _rp_id: &str,
    ) -> Result<Vec<PublicKeyCredentialSource>> {
        Err(Error::new(ErrorKind::NotSupported))
    }

    async fn clear_keys(&self, _rp_id: Option<&str>) -> Result<()> {
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        Ok(())
    }
}

pub fn b64(data: &[u8]) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(data)
}

/// Creation options for `TEST_RP_ID` with ES256 and no selection criteria
pub fn creation_options() -> PublicKeyCredentialCreationOptions {
    let json = format!(
        r#"{{
            "rp": {{"id": "{TEST_RP_ID}", "name": "Example"}},
            "user": {{"id": "{}", "name": "alice@example.com", "displayName": "Alice"}},
            "challenge": "{}",
            "pubKeyCredParams": [{{"type": "public-key", "alg": -7}}]
        }}"#,
        b64(TEST_USER_ID),
        b64(TEST_CHALLENGE),
    );
    PublicKeyCredentialCreationOptions::from_json(&json).unwrap()
}

pub fn request_options() -> PublicKeyCredentialRequestOptions {
    let mut options = PublicKeyCredentialRequestOptions::new(b64(TEST_CHALLENGE));
    options.rp_id = Some(TEST_RP_ID.to_string());
    options
}
