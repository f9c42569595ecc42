//! AES-256-CBC sealing and opening of credential envelopes.
//!
//! The envelope format has no authentication tag. A wrong PIN or a modified
//! ciphertext is only noticed when the PKCS#7 padding or the payload JSON
//! fails to validate, which catches nearly every case but not all of them.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{PinKey, pin_number};
use crate::payload::{CredentialPayload, Envelope, SealedCredentials};
use aes::Aes256;
use base64::{Engine, engine::general_purpose::STANDARD};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::TryRngCore;
use zeroize::Zeroize;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Size of the CBC initialization vector in bytes.
pub const IV_SIZE: usize = 16;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Seals `{email, password}` under a key derived from `pin`.
///
/// Returns the envelope JSON together with the integer form of the PIN, which
/// is what gets stored in the fast-access table. A fresh random IV is drawn
/// from the operating system for every call.
pub fn encrypt(pin: &str, email: &str, password: &str) -> CryptoResult<SealedCredentials> {
    let pin_value = pin_number(pin)?;
    if email.is_empty() {
        return Err(CryptoError::EmptyField("email"));
    }
    if password.is_empty() {
        return Err(CryptoError::EmptyField("password"));
    }

    let mut iv = [0u8; IV_SIZE];
    rand::rngs::OsRng
        .try_fill_bytes(&mut iv)
        .map_err(|e| CryptoError::Encryption(format!("system randomness unavailable: {e}")))?;

    let payload = CredentialPayload::new(email, password);
    let envelope = encrypt_with_iv(pin, &payload, &iv)?;

    Ok(SealedCredentials {
        pin: pin_value,
        envelope: envelope.to_json()?,
    })
}

/// Seals a payload with a caller-chosen IV.
///
/// Only useful for reproducible vectors; production callers go through
/// [`encrypt`] so that every envelope gets its own IV.
pub fn encrypt_with_iv(
    pin: &str,
    payload: &CredentialPayload,
    iv: &[u8; IV_SIZE],
) -> CryptoResult<Envelope> {
    let mut plaintext = payload.to_json_bytes()?;
    let key = PinKey::derive(pin);

    let ciphertext = Aes256CbcEnc::new(key.as_bytes().into(), iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(&plaintext);
    plaintext.zeroize();

    Ok(Envelope {
        iv: STANDARD.encode(iv),
        content: STANDARD.encode(&ciphertext),
    })
}

/// Opens an envelope given as JSON text.
pub fn decrypt(pin: &str, envelope_json: &str) -> CryptoResult<CredentialPayload> {
    let envelope = Envelope::from_json(envelope_json)?;
    open(pin, &envelope)
}

/// Opens an already parsed envelope.
pub fn open(pin: &str, envelope: &Envelope) -> CryptoResult<CredentialPayload> {
    let iv_bytes = decode_field("iv", &envelope.iv)?;
    let iv: [u8; IV_SIZE] =
        iv_bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidIvLength {
                expected: IV_SIZE,
                actual: iv_bytes.len(),
            })?;

    let ciphertext = decode_field("content", &envelope.content)?;
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoError::CiphertextLength(ciphertext.len()));
    }

    let key = PinKey::derive(pin);
    let mut plaintext = Aes256CbcDec::new(key.as_bytes().into(), (&iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| CryptoError::Padding)?;

    let payload = CredentialPayload::from_json_bytes(&plaintext);
    plaintext.zeroize();
    payload
}

/// Seals the credentials and immediately opens them again with the same PIN.
///
/// Fails unless the recovered fields match the inputs exactly.
pub fn self_test(pin: &str, email: &str, password: &str) -> CryptoResult<SealedCredentials> {
    let sealed = encrypt(pin, email, password)?;
    let opened = decrypt(pin, &sealed.envelope)?;

    if opened.email != email {
        return Err(CryptoError::SelfTest("recovered email differs".to_string()));
    }
    if opened.password != password {
        return Err(CryptoError::SelfTest(
            "recovered password differs".to_string(),
        ));
    }
    Ok(sealed)
}

fn decode_field(field: &'static str, value: &str) -> CryptoResult<Vec<u8>> {
    STANDARD.decode(value).map_err(|e| CryptoError::Base64 {
        field,
        reason: e.to_string(),
    })
}
