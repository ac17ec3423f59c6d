//! Registration ceremony

use super::client_data::{ClientData, ClientDataType};
use super::timeout::{LifetimeTimer, adjust_lifetime_timer};
use super::{
    Client, creation_skip_reason, effective_resident_key, judge_user_verification, pick_rp_id,
};
use crate::accounts::Account;
use crate::encoding;
use crate::options::{
    AttestationConveyancePreference, PublicKeyCredentialCreationOptions, decode_descriptors,
};
use crate::response::{AuthenticatorAttestationResponse, RegistrationCredential};
use crate::{
    AttestationObject, AuthenticatorAttachment, Error, ErrorKind, MakeCredentialRequest,
    MapOrdering, RelyingParty, Result, User,
};

use dfido2_core::auth_data::{AAGUID_LEN, AAGUID_OFFSET};
use tracing::{debug, info, warn};

/// Longest user handle WebAuthn allows
const MAX_USER_HANDLE_LEN: usize = 64;

impl Client {
    /// Run a registration ceremony (`navigator.credentials.create()`)
    ///
    /// # Arguments
    ///
    /// * `options` - Creation options from the RP
    /// * `origin` - Origin of the calling page or app
    /// * `message` - Text shown in the consent prompt
    ///
    /// # Errors
    ///
    /// `TypeError` for a malformed user handle, `InvalidState` when an
    /// authenticator already holds an excluded credential, `Cancelled`, and
    /// `NotAllowed` when no authenticator completed, timeouts included.
    pub async fn create_new_credential(
        &self,
        options: &PublicKeyCredentialCreationOptions,
        origin: &str,
        message: &str,
    ) -> Result<RegistrationCredential> {
        let criteria = options.authenticator_selection.clone().unwrap_or_default();
        let lifetime = adjust_lifetime_timer(options.timeout, criteria.user_verification);

        let user_handle = encoding::decode(&options.user.id)
            .map_err(|_| Error::type_error("user.id is not base64url"))?;
        if user_handle.is_empty() || user_handle.len() > MAX_USER_HANDLE_LEN {
            return Err(Error::type_error(format!(
                "user.id must be 1 to {MAX_USER_HANDLE_LEN} bytes, got {}",
                user_handle.len()
            )));
        }

        let rp_id = pick_rp_id(options.rp.id.as_deref(), origin);
        let client_data = ClientData::new(ClientDataType::Create, &options.challenge, origin)?;
        let exclude_list = decode_descriptors(options.exclude_credentials.as_deref());
        let algorithms = options.algorithms();
        let enterprise = options.attestation == AttestationConveyancePreference::Enterprise
            && self.config.enterprise_rp(&rp_id);

        let timer = LifetimeTimer::start(lifetime);
        debug!(
            rp_id = %rp_id,
            timeout_secs = lifetime.as_secs(),
            authenticators = self.authenticators.len(),
            "Registration started"
        );

        for authenticator in &self.authenticators {
            if timer.is_expired() {
                break;
            }
            if self.take_cancelled() {
                info!(rp_id = %rp_id, "Registration cancelled");
                return Err(Error::new(ErrorKind::Cancelled));
            }
            if let Some(reason) = creation_skip_reason(&criteria, authenticator.as_ref()) {
                debug!(reason, "Skipping authenticator");
                continue;
            }

            let resident_key = effective_resident_key(
                options.authenticator_selection.as_ref(),
                authenticator.can_store_resident_key(),
            );
            let user_verification = judge_user_verification(
                criteria.user_verification,
                authenticator.can_perform_user_verification(),
            );

            let mut exclude = exclude_list.clone();
            if self.config.multi_transport_registration {
                exclude.retain(|descriptor| !descriptor.lists_transport(authenticator.transport()));
            }

            let request = MakeCredentialRequest::new(
                client_data.hash,
                RelyingParty::with_name(rp_id.clone(), options.rp.name.clone()),
                User::with_details(
                    user_handle.clone(),
                    options.user.name.clone(),
                    options.user.display_name.clone(),
                ),
            )
            .with_message(message)
            .with_resident_key(resident_key)
            .with_user_verification(user_verification)
            .with_algorithms(algorithms.clone())
            .with_exclude_list(exclude)
            .with_enterprise_attestation(enterprise);

            match authenticator.make_credential(request).await {
                Ok(attestation) => {
                    return self.registration_response(
                        options,
                        &rp_id,
                        &client_data,
                        attestation,
                        authenticator.attachment(),
                        resident_key,
                    );
                }
                Err(e) if e.kind() == ErrorKind::InvalidState => {
                    info!(rp_id = %rp_id, "Excluded credential present, aborting registration");
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, "Authenticator failed to create a credential");
                }
            }
        }

        Err(self.no_credential(&timer).await)
    }

    fn registration_response(
        &self,
        options: &PublicKeyCredentialCreationOptions,
        rp_id: &str,
        client_data: &ClientData,
        attestation: AttestationObject,
        attachment: AuthenticatorAttachment,
        resident_key: bool,
    ) -> Result<RegistrationCredential> {
        let credential_id = attestation
            .auth_data
            .attested_credential_data
            .as_ref()
            .map(|attested| attested.credential_id.clone())
            .ok_or_else(|| Error::unknown("attestation carries no credential"))?;

        let ordering = self.config.authenticator.map_ordering;
        let attestation_object = if options.attestation == AttestationConveyancePreference::None
            && !attestation.is_self_attestation()
        {
            redact_attestation(&attestation, ordering)?
        } else {
            attestation.to_bytes_with(ordering)?
        };

        if self.config.accounts_list {
            let account = Account {
                rpid: rp_id.to_string(),
                username: options.user.name.clone(),
                displayname: options.user.display_name.clone(),
                cred_id_base64: encoding::encode(&credential_id),
                // A resident credential replaces the account's previous one
                user_handle: resident_key.then(|| options.user.id.clone()),
            };
            if let Err(e) = self.accounts.record(account) {
                warn!(error = %e, "Failed to record account");
            }
        }

        info!(rp_id, id_len = credential_id.len(), "Registration completed");
        Ok(RegistrationCredential::new(
            &credential_id,
            attachment,
            AuthenticatorAttestationResponse {
                client_data_json: encoding::encode(client_data.json.as_bytes()),
                attestation_object: encoding::encode(&attestation_object),
            },
        ))
    }
}

/// Serialize `attestation` for `"none"` conveyance
///
/// The statement is dropped and the AAGUID bytes of the serialized
/// authenticator data are zeroed in place. `fmt` is left untouched.
fn redact_attestation(attestation: &AttestationObject, ordering: MapOrdering) -> Result<Vec<u8>> {
    let (mut bytes, auth_data) = attestation
        .to_none()
        .to_bytes_with_auth_data_range(ordering)?;

    let start = auth_data.start + AAGUID_OFFSET;
    let end = start + AAGUID_LEN;
    if end > auth_data.end {
        return Err(Error::unknown("authenticator data too short for an AAGUID"));
    }
    bytes
        .get_mut(start..end)
        .ok_or_else(|| Error::unknown("authenticator data out of range"))?
        .fill(0);

    debug!("Attestation redacted");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AttestedCredentialData, AuthenticatorData, CoseAlgorithm, CredentialPrivateKey};

    fn attestation(aaguid: [u8; 16]) -> AttestationObject {
        let key = CredentialPrivateKey::generate(CoseAlgorithm::Es256).unwrap();
        let auth_data = AuthenticatorData::new("example.com")
            .with_user_flags(true, false)
            .with_attested_credential_data(AttestedCredentialData {
                aaguid,
                credential_id: vec![0xAB; 16],
                credential_public_key: key.public_key().unwrap(),
            });
        AttestationObject::packed(auth_data, CoseAlgorithm::Es256.to_i64(), vec![0x30; 70])
    }

    #[test]
    fn test_redaction_zeroes_only_aaguid() {
        for ordering in [MapOrdering::Insertion, MapOrdering::Canonical] {
            let original = attestation([0x11; 16]);
            let redacted = redact_attestation(&original, ordering).unwrap();

            let parsed = AttestationObject::from_bytes(&redacted).unwrap();
            assert_eq!(parsed.fmt, "packed");
            assert!(parsed.att_stmt.is_empty());

            let attested = parsed.auth_data.attested_credential_data.as_ref().unwrap();
            assert_eq!(attested.aaguid, [0; 16]);
            assert_eq!(attested.credential_id, vec![0xAB; 16]);

            let mut expected = original.auth_data.to_bytes_with(ordering).unwrap();
            expected[37..53].fill(0);
            assert_eq!(parsed.auth_data.to_bytes_with(ordering).unwrap(), expected);
        }
    }

    #[test]
    fn test_redaction_rejects_missing_attested_data() {
        let bare = AttestationObject::packed(AuthenticatorData::new("example.com"), -7, vec![1]);
        let err = redact_attestation(&bare, MapOrdering::Insertion).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }
}
