//! Credential envelopes for Mould operator fast access.
//!
//! An operator logs in on the shop floor by typing a 4-digit PIN. The client
//! looks up the PIN's fast-access row, derives a key from the PIN and
//! decrypts the stored `{email, password}` payload. This crate produces and
//! opens those envelopes:
//!
//! - SHA-256 of the PIN string, used directly as an AES-256 key
//! - AES-256-CBC with PKCS#7 padding and a random 16-byte IV
//! - `{"iv":"...","content":"..."}` compact JSON, both fields standard Base64
//!
//! Every byte-level choice is shared with the browser client, so none of it
//! can be hardened without migrating that client at the same time.

mod codec;
mod error;
mod key;
mod payload;

pub use codec::{BLOCK_SIZE, IV_SIZE, decrypt, encrypt, encrypt_with_iv, open, self_test};
pub use error::{CryptoError, CryptoResult};
pub use key::{KEY_SIZE, PIN_LENGTH, Pin, PinKey};
pub use payload::{CredentialPayload, Envelope, SealedCredentials};
