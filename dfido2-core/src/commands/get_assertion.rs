//! authenticatorGetAssertion
//!
//! Signs a challenge with an existing credential.
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#sctn-op-get-assertion>

use crate::{
    auth_data::AuthenticatorData,
    authenticator::PlatformAuthenticator,
    commands::require_consent,
    credential::PublicKeyCredentialSource,
    request::{AssertionResult, GetAssertionRequest},
    status::{Error, Result},
    types::PublicKeyCredentialDescriptor,
};

use tracing::debug;

/// Handle authenticatorGetAssertion
pub async fn handle(
    auth: &PlatformAuthenticator,
    request: GetAssertionRequest,
) -> Result<AssertionResult> {
    let config = auth.config();
    let rp_id = request.rp_id.as_str();

    if request.require_user_verification && !config.user_verification {
        return Err(Error::constraint("user verification is not supported"));
    }

    // Step 1: Candidates
    let mut candidates = collect_candidates(auth, rp_id, &request.allow_list).await?;

    // Step 2: Nothing to sign with
    if candidates.is_empty() {
        debug!(rp_id, "No matching credential");
        return Err(Error::not_allowed("no matching credential"));
    }

    // Step 3: Consent
    require_consent(auth, &request.message).await?;

    // Step 4: Selection
    let index = auth
        .selection()
        .select(rp_id, &candidates)
        .filter(|&i| i < candidates.len())
        .ok_or_else(|| Error::not_allowed("no credential selected"))?;
    let source = candidates.swap_remove(index);

    // Step 5: Authenticator data and signature
    let sign_count = auth.sign_counter().next_count(&source)?;
    let auth_data = AuthenticatorData::new(rp_id)
        .with_user_flags(
            request.require_user_presence || request.require_user_verification,
            request.require_user_verification,
        )
        .with_sign_count(sign_count)
        .with_extensions(request.extensions)
        .to_bytes_with(config.map_ordering)?;

    let mut signed = auth_data.clone();
    signed.extend_from_slice(&request.client_data_hash);
    let signature = source.private_key.sign_blocking(signed).await?;

    // The RP already knows the ID when it named exactly one
    let credential_id = if request.allow_list.len() == 1 {
        None
    } else {
        Some(source.id)
    };

    Ok(AssertionResult {
        authenticator_data: auth_data,
        signature,
        credential_id,
        user_handle: Some(source.user_handle),
    })
}

/// Sources usable for `rp_id`
///
/// An empty allow list means every resident credential of the RP. Otherwise
/// a wrapped credential that opens for the RP wins on its own; resident
/// lookups by ID are the fallback.
async fn collect_candidates(
    auth: &PlatformAuthenticator,
    rp_id: &str,
    allow_list: &[PublicKeyCredentialDescriptor],
) -> Result<Vec<PublicKeyCredentialSource>> {
    if allow_list.is_empty() {
        return auth.store().load_all(rp_id);
    }

    if let Some(source) = auth.wrapper().find(rp_id, allow_list).await? {
        return Ok(vec![source]);
    }

    let mut candidates = Vec::new();
    for descriptor in allow_list {
        if let Some(source) = auth.store().lookup(rp_id, &descriptor.id)? {
            candidates.push(source);
        }
    }
    Ok(candidates)
}
