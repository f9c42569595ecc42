//! Wire shapes: the plaintext credential payload and the encrypted envelope.
//!
//! Both are compact JSON. Field names and field order are shared with the
//! shop-floor client and must not change.

use crate::error::{CryptoError, CryptoResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Plaintext login credentials sealed inside an envelope.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CredentialPayload {
    pub email: String,
    pub password: String,
}

impl CredentialPayload {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Compact JSON bytes, e.g. `{"email":"a@b.c","password":"x"}`.
    ///
    /// Non-ASCII characters are written as raw UTF-8, not `\uXXXX` escapes.
    /// The client parses either form to the same strings.
    pub fn to_json_bytes(&self) -> CryptoResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses decrypted bytes back into a payload.
    ///
    /// Empty fields are rejected because the client refuses to log in with them.
    pub fn from_json_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| CryptoError::Payload(format!("not valid UTF-8: {e}")))?;
        let payload: Self = serde_json::from_str(text)
            .map_err(|e| CryptoError::Payload(format!("not valid payload JSON: {e}")))?;
        if payload.email.is_empty() || payload.password.is_empty() {
            return Err(CryptoError::Payload(
                "payload is missing email or password".to_string(),
            ));
        }
        Ok(payload)
    }
}

impl fmt::Debug for CredentialPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPayload")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Encrypted credentials as persisted in the fast-access table.
///
/// `iv` is 16 random bytes and `content` the AES-256-CBC ciphertext, both in
/// standard padded Base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    pub iv: String,
    pub content: String,
}

impl Envelope {
    /// Compact JSON text, `iv` first.
    pub fn to_json(&self) -> CryptoResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> CryptoResult<Self> {
        serde_json::from_str(json).map_err(|e| CryptoError::Envelope(e.to_string()))
    }
}

/// Output of sealing: the integer PIN and the envelope JSON stored next to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SealedCredentials {
    pub pin: u32,
    pub envelope: String,
}
