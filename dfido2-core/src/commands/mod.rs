//! Authenticator operation handlers
//!
//! See WebAuthn section 6.3 for the operation definitions:
//! <https://www.w3.org/TR/webauthn-3/#sctn-authenticator-ops>

pub mod get_assertion;
pub mod make_credential;

use crate::authenticator::PlatformAuthenticator;
use crate::callbacks::ConsentResult;
use crate::status::{Error, Result};

use tracing::debug;

/// Ask for consent; anything but a grant ends the operation
///
/// A denial is `notAllowed`; a device that cannot prompt is `notSupported`.
pub(crate) async fn require_consent(auth: &PlatformAuthenticator, message: &str) -> Result<()> {
    match auth.consent().request_consent(message).await? {
        ConsentResult::Granted => Ok(()),
        ConsentResult::Denied => {
            debug!("User denied consent");
            Err(Error::not_allowed("user denied consent"))
        }
        ConsentResult::Unsupported => Err(Error::not_supported("consent prompt unavailable")),
    }
}
