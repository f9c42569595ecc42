//! PIN handling and PIN-to-key mapping.
//!
//! The cipher key is the raw SHA-256 digest of the PIN's decimal string.
//! This is not a password KDF: there is no salt and no work factor. The
//! shop-floor client derives its key the same way (hex digest parsed back
//! into bytes), so any change here breaks every stored envelope.

use crate::error::{CryptoError, CryptoResult};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the derived AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Number of digits in an operator PIN.
pub const PIN_LENGTH: usize = 4;

/// A validated 4-digit operator PIN.
///
/// Keeps the original digit string, since `"0123"` and `"123"` derive
/// different keys even though both are stored as the integer 123.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Pin(String);

impl Pin {
    /// Parses a PIN, accepting exactly four ASCII digits.
    pub fn parse(raw: &str) -> CryptoResult<Self> {
        if raw.len() != PIN_LENGTH || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CryptoError::InvalidPin(format!(
                "expected exactly {PIN_LENGTH} digits"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// The digit string that feeds key derivation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The integer form persisted alongside the envelope.
    pub fn as_number(&self) -> u32 {
        // Four ASCII digits always fit.
        self.0
            .bytes()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'))
    }

    /// Derives the cipher key for this PIN.
    pub fn key(&self) -> PinKey {
        PinKey::derive(&self.0)
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

/// Parses the integer form of a digit string without imposing a length.
pub(crate) fn pin_number(pin: &str) -> CryptoResult<u32> {
    if pin.is_empty() || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CryptoError::InvalidPin("PIN must be numeric".to_string()));
    }
    pin.parse::<u32>()
        .map_err(|e| CryptoError::InvalidPin(format!("PIN out of range: {e}")))
}

/// A 256-bit AES key derived from a PIN.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PinKey([u8; KEY_SIZE]);

impl PinKey {
    /// SHA-256 over the UTF-8 bytes of the PIN string, used as the raw key.
    pub fn derive(pin: &str) -> Self {
        let digest = Sha256::digest(pin.as_bytes());
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for PinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinKey([REDACTED])")
    }
}
