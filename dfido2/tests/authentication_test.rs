//! Authentication ceremony tests
//!
//! Register through the client, then sign in with
//! `Client::discover_from_external_source` and verify the assertion with an
//! independent P-256 implementation.

mod common;

use common::*;

use dfido2::{
    AttestationObject, AuthenticatorAttachment, AuthenticatorConfig, Config, ConsentResult,
    CosePublicKey, CredentialMediationRequirement, ErrorKind, PublicKeyCredentialSource,
    RegistrationCredential, SelectionPolicy, UserVerificationRequirement,
};

use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use serial_test::serial;
use sha2::{Digest, Sha256};
use std::sync::Arc;

async fn register(platform: &TestPlatform, user_id: &[u8]) -> RegistrationCredential {
    let mut options = creation_options();
    options.user.id = b64(user_id);
    platform
        .client
        .create_new_credential(&options, TEST_ORIGIN, "Create a passkey")
        .await
        .unwrap()
}

fn public_key(credential: &RegistrationCredential) -> CosePublicKey {
    let attestation =
        AttestationObject::from_bytes(&credential.response.attestation_object_bytes().unwrap())
            .unwrap();
    attestation
        .auth_data
        .attested_credential_data
        .unwrap()
        .credential_public_key
}

#[tokio::test]
#[serial]
async fn test_non_resident_sign_in_end_to_end() {
    init_tracing();
    let platform =
        TestPlatform::with_authenticator(AuthenticatorConfig::new().with_resident_storage(false));
    let registration = register(&platform, TEST_USER_ID).await;
    let credential_id = registration.raw_id_bytes().unwrap();

    let mut options = request_options();
    options.allow_credential(&credential_id, vec!["internal".into()]);
    let assertion = platform
        .client
        .discover_from_external_source(&options, TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap();

    assert_eq!(assertion.raw_id_bytes().unwrap(), credential_id);
    assert_eq!(
        assertion.authenticator_attachment,
        Some(AuthenticatorAttachment::Platform)
    );
    assert_eq!(
        assertion.response.user_handle_bytes().unwrap(),
        Some(TEST_USER_ID.to_vec())
    );

    let client_data_json = assertion.response.client_data_json_bytes().unwrap();
    let client_data: serde_json::Value = serde_json::from_slice(&client_data_json).unwrap();
    assert_eq!(client_data["type"], "webauthn.get");

    let auth_data = assertion.response.authenticator_data_bytes().unwrap();
    assert_eq!(auth_data.len(), 37);
    assert_eq!(&auth_data[..32], Sha256::digest(TEST_RP_ID).as_slice());

    let mut signed = auth_data.clone();
    signed.extend_from_slice(&Sha256::digest(&client_data_json));
    let signature = assertion.response.signature_bytes().unwrap();

    let CosePublicKey::Ec2 { x, y, .. } = public_key(&registration) else {
        panic!("expected an EC2 key");
    };
    let mut point = vec![0x04];
    point.extend_from_slice(&x);
    point.extend_from_slice(&y);
    let verifying_key = VerifyingKey::from_sec1_bytes(&point).unwrap();
    let signature = Signature::from_der(&signature).unwrap();
    verifying_key.verify(&signed, &signature).unwrap();
}

#[tokio::test]
async fn test_discoverable_sign_in() {
    let platform = TestPlatform::new(Config::new());
    let registration = register(&platform, TEST_USER_ID).await;

    let assertion = platform
        .client
        .discover_from_external_source(&request_options(), TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap();

    assert_eq!(assertion.id, registration.id);
    assert_eq!(
        assertion.response.user_handle_bytes().unwrap(),
        Some(TEST_USER_ID.to_vec())
    );

    let mut signed = assertion.response.authenticator_data_bytes().unwrap();
    signed.extend_from_slice(&Sha256::digest(
        assertion.response.client_data_json_bytes().unwrap(),
    ));
    public_key(&registration)
        .verify(&signed, &assertion.response.signature_bytes().unwrap())
        .unwrap();
}

#[tokio::test]
async fn test_conditional_mediation_offers_discovered_account() {
    let platform = TestPlatform::new(Config::new());
    let registration = register(&platform, TEST_USER_ID).await;

    let mut options = request_options();
    options.mediation = Some(CredentialMediationRequirement::Conditional);
    let assertion = platform
        .client
        .discover_from_external_source(&options, TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap();

    assert_eq!(assertion.id, registration.id);
}

#[tokio::test]
async fn test_conditional_mediation_selected_account() {
    let platform = TestPlatform::new(Config::new());
    register(&platform, b"user-a").await;
    let second = register(&platform, b"user-b").await;

    let mut options = request_options();
    options.mediation = Some(CredentialMediationRequirement::Conditional);
    let assertion = platform
        .client
        .discover_from_external_source(
            &options,
            TEST_ORIGIN,
            "Sign in",
            Some(&second.raw_id_bytes().unwrap()),
        )
        .await
        .unwrap();

    assert_eq!(assertion.id, second.id);
    assert_eq!(
        assertion.response.user_handle_bytes().unwrap(),
        Some(b"user-b".to_vec())
    );
}

/// Picks the most recently registered account
struct LastCredential;

impl SelectionPolicy for LastCredential {
    fn select(&self, _rp_id: &str, candidates: &[PublicKeyCredentialSource]) -> Option<usize> {
        candidates.len().checked_sub(1)
    }
}

#[tokio::test]
async fn test_conditional_mediation_selection_policy() {
    let store = Arc::new(dfido2::MemoryCredentialStore::new());
    let key_store = Arc::new(dfido2::MemoryKeyStore::new());
    let client = dfido2::Client::platform(Config::new(), store, key_store, TestConsent::granting())
        .with_selection_policy(Arc::new(LastCredential));

    let mut registrations = Vec::new();
    for user in [b"user-a", b"user-b"] {
        let mut options = creation_options();
        options.user.id = b64(user);
        registrations.push(
            client
                .create_new_credential(&options, TEST_ORIGIN, "Create a passkey")
                .await
                .unwrap(),
        );
    }

    let mut options = request_options();
    options.mediation = Some(CredentialMediationRequirement::Conditional);
    let assertion = client
        .discover_from_external_source(&options, TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap();
    assert_eq!(assertion.id, registrations[1].id);
}

#[tokio::test]
async fn test_conditional_mediation_rejects_allow_list() {
    let platform = TestPlatform::new(Config::new());
    let mut options = request_options();
    options.mediation = Some(CredentialMediationRequirement::Conditional);
    options.allow_credential(&[1, 2, 3], Vec::new());

    let err = platform
        .client
        .discover_from_external_source(&options, TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotSupported);
    assert_eq!(platform.consent.prompts(), 0);
}

#[tokio::test]
async fn test_allow_list_unreachable_over_internal() {
    let platform = TestPlatform::new(Config::new().with_wait_on_failure(false));
    let registration = register(&platform, TEST_USER_ID).await;
    let prompts = platform.consent.prompts();

    let mut options = request_options();
    options.allow_credential(&registration.raw_id_bytes().unwrap(), vec!["usb".into()]);
    let err = platform
        .client
        .discover_from_external_source(&options, TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    assert_eq!(platform.consent.prompts(), prompts);
}

#[tokio::test]
async fn test_user_verification_required_without_capability() {
    let platform = TestPlatform::new(
        Config::new()
            .with_wait_on_failure(false)
            .with_authenticator(AuthenticatorConfig::new().with_user_verification(false)),
    );
    register(&platform, TEST_USER_ID).await;

    let mut options = request_options();
    options.user_verification = Some(UserVerificationRequirement::Required);
    let err = platform
        .client
        .discover_from_external_source(&options, TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);
}

#[tokio::test]
async fn test_user_presence_only_flags() {
    let platform = TestPlatform::new(Config::new());
    register(&platform, TEST_USER_ID).await;

    let mut options = request_options();
    options.user_verification = Some(UserVerificationRequirement::Discouraged);
    let assertion = platform
        .client
        .discover_from_external_source(&options, TEST_ORIGIN, "Sign in", None)
        .await
        .unwrap();

    let auth_data = assertion.response.authenticator_data_bytes().unwrap();
    assert_eq!(auth_data[32] & 0x05, 0x01);
}

#[tokio::test]
async fn test_declined_consent() {
    let platform = TestPlatform::with_consent(
        Config::new().with_wait_on_failure(false),
        TestConsent::answering(ConsentResult::Denied),
    );

    let err = platform
        .client
        .create_new_credential(&creation_options(), TEST_ORIGIN, "Create a passkey")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAllowed);
    assert!(platform.store.is_empty());
}

#[tokio::test]
async fn test_reset_forgets_everything() {
    let platform = TestPlatform::new(Config::new().with_accounts_list(true));
    register(&platform, TEST_USER_ID).await;
    assert_eq!(platform.client.accounts(TEST_RP_ID).unwrap().len(), 1);

    platform.client.reset().await.unwrap();
    assert!(platform.store.is_empty());
    assert!(platform.client.accounts(TEST_RP_ID).unwrap().is_empty());
}
