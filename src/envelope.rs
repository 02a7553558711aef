//! Encrypted claim payloads.
//!
//! Newer upstream deployments do not put the user's claims in the signed
//! assertion directly. The verified assertion instead carries an
//! `enc_claims` member that only this service can open:
//!
//! * absent: the assertion's own claims are used ([`ClaimsEnvelope::Plain`])
//! * a compact JWE, five dot-separated segments ([`ClaimsEnvelope::Compact`])
//! * any other string: base64url RSA-OAEP ciphertext ([`ClaimsEnvelope::RsaOaep`])
//!
//! Every variant yields the same [`ClaimSet`]. Any failure before a complete,
//! authenticated plaintext exists is reported as [`AuthError::Decryption`];
//! the cause goes to the log only.

use aes_gcm::aead::{self, Aead, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm};
use log::{debug, warn};
use rand::rngs::OsRng;
use rsa::sha2::Sha256;
use rsa::Oaep;
use serde::Deserialize;
use serde_json::Value;

use crate::base64url;
use crate::claims::ClaimSet;
use crate::error::AuthError;
use crate::keys::ServiceKeyPair;

/// Claim that carries an encrypted claim payload inside a verified assertion.
pub const ENCRYPTED_CLAIMS: &str = "enc_claims";

const GCM_NONCE_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;

/// How a verified assertion carries its claims.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimsEnvelope {
    /// Claims are in the clear
    Plain(ClaimSet),
    /// Base64url RSA-OAEP(SHA-256) ciphertext of the JSON claims
    RsaOaep(String),
    /// Compact JWE, RSA-OAEP-256 key wrapping with AES-GCM content encryption
    Compact(String),
}

impl ClaimsEnvelope {
    /// Classifies a verified claim set by the shape of its `enc_claims` member.
    pub fn classify(claims: ClaimSet) -> Result<Self, AuthError> {
        let envelope = match claims.get(ENCRYPTED_CLAIMS) {
            None => return Ok(ClaimsEnvelope::Plain(claims)),
            Some(Value::String(s)) if s.split('.').count() == 5 => {
                ClaimsEnvelope::Compact(s.clone())
            }
            Some(Value::String(s)) => ClaimsEnvelope::RsaOaep(s.clone()),
            Some(_) => return Err(AuthError::MalformedClaims),
        };
        Ok(envelope)
    }

    /// Recovers the claim set, decrypting with the service key when needed.
    pub fn open(self, key: &ServiceKeyPair) -> Result<ClaimSet, AuthError> {
        match self {
            ClaimsEnvelope::Plain(claims) => Ok(claims),
            ClaimsEnvelope::RsaOaep(ciphertext) => decrypt_oaep(&ciphertext, key),
            ClaimsEnvelope::Compact(token) => decrypt_compact(&token, key),
        }
    }
}

/// Decrypts a base64url RSA-OAEP ciphertext (MGF1 and hash SHA-256, empty
/// label) and parses the plaintext as JSON claims.
pub fn decrypt_oaep(ciphertext: &str, key: &ServiceKeyPair) -> Result<ClaimSet, AuthError> {
    let ciphertext = base64url::decode(ciphertext).map_err(|_| {
        warn!("encrypted claims are not base64url");
        AuthError::Decryption
    })?;
    let plaintext = unwrap_oaep(&ciphertext, key)?;
    ClaimSet::from_slice(&plaintext)
}

#[derive(Deserialize)]
struct ProtectedHeader {
    alg: String,
    enc: String,
    #[serde(default)]
    kid: Option<String>,
    #[serde(default)]
    zip: Option<String>,
}

/// Decrypts a compact JWE addressed to the service key and parses the
/// plaintext as JSON claims.
///
/// Supported: `alg` `RSA-OAEP-256`; `enc` `A128GCM` or `A256GCM`. A `kid`
/// in the header must name the service key.
pub fn decrypt_compact(token: &str, key: &ServiceKeyPair) -> Result<ClaimSet, AuthError> {
    let segments: Vec<&str> = token.split('.').collect();
    let &[protected, wrapped_key, iv, ciphertext, tag] = segments.as_slice() else {
        warn!("compact envelope has {} segments", segments.len());
        return Err(AuthError::Decryption);
    };

    let header: ProtectedHeader = base64url::decode(protected)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or_else(|| {
            warn!("compact envelope header is unreadable");
            AuthError::Decryption
        })?;

    if header.alg != "RSA-OAEP-256" || header.zip.is_some() {
        warn!(
            "unsupported envelope alg {} (zip {:?})",
            header.alg, header.zip
        );
        return Err(AuthError::Decryption);
    }
    if let Some(kid) = header.kid.as_deref() {
        if kid != key.kid() {
            warn!("envelope addressed to key {}, ours is {}", kid, key.kid());
            return Err(AuthError::Decryption);
        }
    }

    let decode = |segment: &str, what: &str| {
        base64url::decode(segment).map_err(|_| {
            warn!("envelope {} is not base64url", what);
            AuthError::Decryption
        })
    };
    let wrapped_key = decode(wrapped_key, "encrypted key")?;
    let iv = decode(iv, "iv")?;
    let mut sealed = decode(ciphertext, "ciphertext")?;
    let tag = decode(tag, "tag")?;

    if iv.len() != GCM_NONCE_LEN || tag.len() != GCM_TAG_LEN {
        warn!("envelope iv or tag has the wrong length");
        return Err(AuthError::Decryption);
    }
    sealed.extend_from_slice(&tag);

    let cek = unwrap_oaep(&wrapped_key, key)?;
    let aad = protected.as_bytes();
    let plaintext = match header.enc.as_str() {
        "A256GCM" => open_gcm::<Aes256Gcm>(&cek, &iv, &sealed, aad),
        "A128GCM" => open_gcm::<Aes128Gcm>(&cek, &iv, &sealed, aad),
        other => {
            warn!("unsupported envelope enc {}", other);
            return Err(AuthError::Decryption);
        }
    }?;

    debug!("opened {} envelope", header.enc);
    ClaimSet::from_slice(&plaintext)
}

fn unwrap_oaep(ciphertext: &[u8], key: &ServiceKeyPair) -> Result<Vec<u8>, AuthError> {
    key.private_key()
        .decrypt_blinded(&mut OsRng, Oaep::new::<Sha256>(), ciphertext)
        .map_err(|e| {
            warn!("RSA-OAEP decryption failed: {}", e);
            AuthError::Decryption
        })
}

fn open_gcm<C: KeyInit + Aead>(
    cek: &[u8],
    iv: &[u8],
    sealed: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>, AuthError> {
    let cipher = C::new_from_slice(cek).map_err(|_| {
        warn!("content key has the wrong length");
        AuthError::Decryption
    })?;
    cipher
        .decrypt(aead::Nonce::<C>::from_slice(iv), Payload { msg: sealed, aad })
        .map_err(|_| {
            warn!("envelope failed authentication");
            AuthError::Decryption
        })
}
