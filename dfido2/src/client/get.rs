//! Authentication ceremony

use super::client_data::{ClientData, ClientDataType};
use super::timeout::{LifetimeTimer, adjust_lifetime_timer};
use super::{Client, judge_user_verification, pick_rp_id};
use crate::encoding;
use crate::options::{
    PublicKeyCredentialRequestOptions, UserVerificationRequirement, decode_descriptors,
};
use crate::response::{AssertionCredential, AuthenticatorAssertionResponse};
use crate::{
    Authenticator, AuthenticatorTransport, Error, ErrorKind, GetAssertionRequest,
    PublicKeyCredentialDescriptor, Result,
};

use tracing::{debug, info, warn};

impl Client {
    /// Run an authentication ceremony (`navigator.credentials.get()`)
    ///
    /// With conditional mediation the ceremony never times out and the
    /// platform authenticator offers a discovered account itself;
    /// `selected_credential_id` names the account the user picked, when
    /// the host showed a picker.
    ///
    /// # Errors
    ///
    /// `NotSupported` for a conditional request carrying an allow list,
    /// `Cancelled`, and `NotAllowed` when no authenticator produced an
    /// assertion, timeouts included.
    pub async fn discover_from_external_source(
        &self,
        options: &PublicKeyCredentialRequestOptions,
        origin: &str,
        message: &str,
        selected_credential_id: Option<&[u8]>,
    ) -> Result<AssertionCredential> {
        let conditional = options.is_conditional();
        let timer = if conditional {
            if options
                .allow_credentials
                .as_ref()
                .is_some_and(|list| !list.is_empty())
            {
                return Err(Error::not_supported(
                    "conditional mediation with allowCredentials",
                ));
            }
            LifetimeTimer::infinite()
        } else {
            LifetimeTimer::start(adjust_lifetime_timer(
                options.timeout,
                options.user_verification,
            ))
        };

        let rp_id = pick_rp_id(options.rp_id.as_deref(), origin);
        let client_data = ClientData::new(ClientDataType::Get, &options.challenge, origin)?;
        let allow_credentials = decode_descriptors(options.allow_credentials.as_deref());
        debug!(rp_id = %rp_id, conditional, "Authentication started");

        for authenticator in &self.authenticators {
            if timer.is_expired() {
                break;
            }
            if self.take_cancelled() {
                info!(rp_id = %rp_id, "Authentication cancelled");
                return Err(Error::new(ErrorKind::Cancelled));
            }

            let mut allow_list = allow_credentials.clone();
            if conditional && authenticator.can_silent_credential_discovery() {
                if let Some(descriptor) = self
                    .discovered_descriptor(authenticator.as_ref(), &rp_id, selected_credential_id)
                    .await
                {
                    allow_list = vec![descriptor];
                }
            }

            if options.user_verification == Some(UserVerificationRequirement::Required)
                && !authenticator.can_perform_user_verification()
            {
                debug!("Skipping authenticator: user verification required but not supported");
                continue;
            }

            let mut remembered_id = None;
            if !allow_list.is_empty() {
                allow_list.retain(|descriptor| descriptor.reachable_over(authenticator.transport()));
                if allow_list.is_empty() {
                    debug!("Skipping authenticator: no allowed credential reachable over its transport");
                    continue;
                }
                if let [only] = allow_list.as_slice() {
                    remembered_id = Some(only.id.clone());
                }
            }

            let user_verification = judge_user_verification(
                options.user_verification,
                authenticator.can_perform_user_verification(),
            );
            let request = GetAssertionRequest::new(rp_id.clone(), client_data.hash)
                .with_message(message)
                .with_allow_list(allow_list)
                .with_user_verification(user_verification);

            let result = match authenticator.get_assertion(request).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, "Authenticator failed to produce an assertion");
                    continue;
                }
            };

            let credential_id = remembered_id
                .or(result.credential_id)
                .ok_or_else(|| Error::unknown("assertion does not name its credential"))?;
            let user_handle = result.user_handle.unwrap_or_default();

            info!(rp_id = %rp_id, id_len = credential_id.len(), "Authentication completed");
            return Ok(AssertionCredential::new(
                &credential_id,
                authenticator.attachment(),
                AuthenticatorAssertionResponse {
                    client_data_json: encoding::encode(client_data.json.as_bytes()),
                    authenticator_data: encoding::encode(&result.authenticator_data),
                    signature: encoding::encode(&result.signature),
                    user_handle: Some(encoding::encode(&user_handle)),
                },
            ));
        }

        Err(self.no_credential(&timer).await)
    }

    /// Descriptor of the account conditional mediation offers, if any
    async fn discovered_descriptor(
        &self,
        authenticator: &dyn Authenticator,
        rp_id: &str,
        selected_credential_id: Option<&[u8]>,
    ) -> Option<PublicKeyCredentialDescriptor> {
        let sources = match authenticator.silent_credential_discovery(rp_id).await {
            Ok(sources) => sources,
            Err(e) => {
                warn!(error = %e, "Silent credential discovery failed");
                return None;
            }
        };
        if sources.is_empty() {
            return None;
        }

        let id = match selected_credential_id {
            Some(id) => id.to_vec(),
            None => {
                let index = self.selection.select(rp_id, &sources)?;
                sources.get(index)?.id.clone()
            }
        };
        debug!(rp_id, discovered = sources.len(), "Offering discovered account");
        Some(PublicKeyCredentialDescriptor::with_transports(
            id,
            vec![AuthenticatorTransport::Internal.as_str().to_string()],
        ))
    }
}
