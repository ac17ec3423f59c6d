//! base64url helpers for the JSON boundary

use crate::{Error, Result};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

/// Encode as unpadded base64url
pub fn encode(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode base64url; trailing `=` padding is tolerated
pub fn decode(text: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text.trim_end_matches('='))
        .map_err(|e| Error::bad_data(format!("invalid base64url: {e}")))
}
