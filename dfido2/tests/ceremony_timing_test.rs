//! Ceremony lifetime tests
//!
//! Run on a paused tokio clock so waits of minutes complete instantly while
//! `Instant::elapsed` still reports the virtual time spent. None of these
//! paths generate keys, so no blocking tasks race the auto-advancing clock.

mod common;

use common::*;

use dfido2::{
    Authenticator, AuthenticatorConfig, Client, Config, ConsentResult, ErrorKind,
    MemoryCredentialStore, MemoryKeyStore, PlatformAuthenticator, UserVerificationRequirement,
};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn unknown_credential_request() -> dfido2::PublicKeyCredentialRequestOptions {
    let mut options = request_options();
    options.allow_credential(&[0xEE; 32], vec!["internal".into()]);
    options
}

#[tokio::test(start_paused = true)]
async fn test_unknown_credential_waits_out_discouraged_default() {
    let platform = TestPlatform::new(Config::new());
    let started = Instant::now();

    let err = platform
        .client
        .discover_from_external_source(&unknown_credential_request(), TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    assert!(started.elapsed() >= Duration::from_secs(300));
    assert!(started.elapsed() < Duration::from_secs(301));
}

#[tokio::test(start_paused = true)]
async fn test_wait_uses_clamped_timeout() {
    let platform = TestPlatform::new(Config::new());
    let mut options = unknown_credential_request();
    options.timeout = Some(500);
    options.user_verification = Some(UserVerificationRequirement::Preferred);
    let started = Instant::now();

    let err = platform
        .client
        .discover_from_external_source(&options, TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_declined_registration_takes_as_long_as_missing_credential() {
    let platform =
        TestPlatform::with_consent(Config::new(), TestConsent::answering(ConsentResult::Denied));
    let mut options = creation_options();
    options.timeout = Some(60_000);
    let started = Instant::now();

    let err = platform
        .client
        .create_new_credential(&options, TEST_ORIGIN, "Create a passkey")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    assert_eq!(platform.consent.prompts(), 1);
    assert!(started.elapsed() >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_slow_decline_reads_like_fast_decline() {
    let mut options = creation_options();
    options.timeout = Some(60_000);

    let fast =
        TestPlatform::with_consent(Config::new(), TestConsent::answering(ConsentResult::Denied));
    let fast_err = fast
        .client
        .create_new_credential(&options, TEST_ORIGIN, "Create a passkey")
        .await
        .unwrap_err();

    // The user answers long after the ceremony lifetime ran out
    let slow = TestPlatform::with_consent(
        Config::new(),
        TestConsent::answering_after(ConsentResult::Denied, Duration::from_secs(400)),
    );
    let started = Instant::now();
    let slow_err = slow
        .client
        .create_new_credential(&options, TEST_ORIGIN, "Create a passkey")
        .await
        .unwrap_err();

    assert_eq!(fast_err.kind(), ErrorKind::NotAllowed);
    assert_eq!(slow_err.kind(), ErrorKind::NotAllowed);
    assert_eq!(slow.consent.prompts(), 1);
    // No extra wait once the lifetime is spent
    assert!(started.elapsed() >= Duration::from_secs(400));
    assert!(started.elapsed() < Duration::from_secs(401));
}

#[tokio::test(start_paused = true)]
async fn test_no_wait_when_disabled() {
    let platform = TestPlatform::new(Config::new().with_wait_on_failure(false));
    let started = Instant::now();

    let err = platform
        .client
        .discover_from_external_source(&unknown_credential_request(), TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_conditional_mediation_never_waits() {
    let platform = TestPlatform::new(Config::new());
    let mut options = request_options();
    options.mediation = Some(dfido2::CredentialMediationRequirement::Conditional);
    let started = Instant::now();

    // Nothing registered: discovery finds no account and the ceremony fails
    let err = platform
        .client
        .discover_from_external_source(&options, TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_authenticator_reports_not_allowed() {
    let key_store = Arc::new(MemoryKeyStore::new());
    let consent = TestConsent::granting();
    let stalling = StallingAuthenticator::new(Duration::from_secs(5));
    let platform = PlatformAuthenticator::new(
        AuthenticatorConfig::new(),
        Arc::new(MemoryCredentialStore::new()),
        key_store.clone(),
        consent.clone(),
    );
    let authenticators: Vec<Arc<dyn Authenticator>> = vec![stalling.clone(), Arc::new(platform)];
    let client = Client::new(Config::new(), key_store, authenticators);

    let mut options = creation_options();
    options.timeout = Some(2_000);
    let started = Instant::now();

    let err = client
        .create_new_credential(&options, TEST_ORIGIN, "Create a passkey")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    assert_eq!(stalling.calls(), 1);
    assert_eq!(consent.prompts(), 0);
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_next_authenticator() {
    let platform = TestPlatform::with_consent(
        Config::new().with_wait_on_failure(false),
        TestConsent::answering(ConsentResult::Denied),
    );

    platform.client.cancel();
    let err = platform
        .client
        .create_new_credential(&creation_options(), TEST_ORIGIN, "Create a passkey")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(platform.consent.prompts(), 0);

    // The flag is consumed by the cancelled ceremony
    let err = platform
        .client
        .create_new_credential(&creation_options(), TEST_ORIGIN, "Create a passkey")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    assert_eq!(platform.consent.prompts(), 1);
}
