//! authenticatorMakeCredential
//!
//! Creates a new credential for a relying party.
//!
//! Spec: <https://www.w3.org/TR/webauthn-3/#sctn-op-make-cred>

use crate::{
    attestation::AttestationObject,
    auth_data::{AttestedCredentialData, AuthenticatorData},
    authenticator::PlatformAuthenticator,
    commands::require_consent,
    credential::PublicKeyCredentialSource,
    keys::CredentialPrivateKey,
    request::MakeCredentialRequest,
    status::{Error, Result},
    types::{CoseAlgorithm, PublicKeyCredentialDescriptor},
};

use tracing::{debug, info};
use uuid::Uuid;

/// Handle authenticatorMakeCredential
pub async fn handle(
    auth: &PlatformAuthenticator,
    request: MakeCredentialRequest,
) -> Result<AttestationObject> {
    let config = auth.config();
    let rp_id = request.rp.id.as_str();

    // Step 1: Pick the first RP-preferred algorithm we support
    let alg = negotiate_algorithm(&request.algorithms, &config.algorithms)?;
    debug!(rp_id, alg = alg.to_i64(), "Negotiated credential algorithm");

    // Step 2: Refuse to create a second credential on this authenticator
    check_exclude_list(auth, rp_id, &request.exclude_list).await?;

    // Step 3: Capabilities
    if request.require_resident_key && !config.resident_storage {
        return Err(Error::constraint("resident credentials are not supported"));
    }
    if request.require_user_verification && !config.user_verification {
        return Err(Error::constraint("user verification is not supported"));
    }

    // Step 4: Consent
    require_consent(auth, &request.message).await?;

    if request.enterprise_attestation_possible {
        debug!(rp_id, "Enterprise attestation permitted, no enterprise certificate available");
    }

    // Step 5: Key pair
    let private_key = CredentialPrivateKey::generate_blocking(alg).await?;
    let public_key = private_key.public_key()?;

    // Step 6: Store or wrap
    let mut source = PublicKeyCredentialSource::new(
        Vec::new(),
        private_key,
        rp_id,
        request.user.id.clone(),
    )
    .with_other_ui(request.user.name.clone().unwrap_or_default());

    if request.require_resident_key {
        source.id = Uuid::new_v4().as_bytes().to_vec();
        auth.store().delete_all(rp_id, &source.user_handle)?;
        auth.store().save(&source)?;
        info!(rp_id, "Stored resident credential");
    } else {
        source.id = auth.wrapper().wrap(&source).await?;
        debug!(rp_id, id_len = source.id.len(), "Wrapped non-resident credential");
    }

    // Step 7: Authenticator data
    let sign_count = auth.sign_counter().next_count(&source)?;
    let attested = AttestedCredentialData {
        aaguid: config.aaguid,
        credential_id: source.id.clone(),
        credential_public_key: public_key,
    };
    let auth_data = AuthenticatorData::new(rp_id)
        .with_user_flags(
            request.require_user_presence || request.require_user_verification,
            request.require_user_verification,
        )
        .with_sign_count(sign_count)
        .with_attested_credential_data(attested)
        .with_extensions(request.extensions);

    // Step 8: Self attestation over authData || clientDataHash
    let mut signed = auth_data.to_bytes_with(config.map_ordering)?;
    signed.extend_from_slice(&request.client_data_hash);
    let signature = source.private_key.sign_blocking(signed).await?;

    Ok(AttestationObject::packed(auth_data, alg.to_i64(), signature))
}

/// First entry of `requested` that is also in `supported`
pub fn negotiate_algorithm(
    requested: &[CoseAlgorithm],
    supported: &[CoseAlgorithm],
) -> Result<CoseAlgorithm> {
    requested
        .iter()
        .copied()
        .find(|alg| supported.contains(alg))
        .ok_or_else(|| Error::not_supported("no requested algorithm is supported"))
}

/// `invalidState` when any descriptor already names a credential for `rp_id`
async fn check_exclude_list(
    auth: &PlatformAuthenticator,
    rp_id: &str,
    exclude_list: &[PublicKeyCredentialDescriptor],
) -> Result<()> {
    if exclude_list.is_empty() {
        return Ok(());
    }

    for descriptor in exclude_list {
        if auth.store().lookup(rp_id, &descriptor.id)?.is_some() {
            info!(rp_id, "Excluded resident credential present");
            return Err(Error::invalid_state("credential already registered"));
        }
    }

    if auth.wrapper().find(rp_id, exclude_list).await?.is_some() {
        info!(rp_id, "Excluded wrapped credential present");
        return Err(Error::invalid_state("credential already registered"));
    }

    Ok(())
}
