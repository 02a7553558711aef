//! Base64url helpers for JSON Web Key material.
//!
//! Key parameters such as an RSA modulus travel as unpadded base64url strings
//! of the big-endian integer bytes.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use rsa::BigUint;

use crate::error::AuthError;

/// URL-safe engine that writes no padding and accepts input with or without it.
pub(crate) const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encodes `value` as unpadded base64url of its minimal big-endian bytes.
///
/// Zero is encoded as the single byte `0x00` (`"AA"`).
pub fn encode_unsigned(value: &BigUint) -> String {
    URL_SAFE_LENIENT.encode(value.to_bytes_be())
}

/// Decodes a base64url string into an unsigned integer, big-endian.
///
/// Missing padding is restored. Characters outside the URL-safe alphabet
/// fail with [`AuthError::MalformedEncoding`].
pub fn decode_to_unsigned(text: &str) -> Result<BigUint, AuthError> {
    let bytes = decode(text)?;
    Ok(BigUint::from_bytes_be(&bytes))
}

pub(crate) fn decode(text: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_LENIENT
        .decode(text)
        .map_err(|_| AuthError::MalformedEncoding)
}
