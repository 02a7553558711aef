//! Key material and token builders shared by the unit and integration tests.
//!
//! Only external crates are used here, so the file can be mounted as a module
//! by both the library's test build and the `tests/` crates.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken as jwt;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::sha2::Sha256;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde_json::{json, Value};

pub const SERVICE_PRIVATE_PEM: &str = include_str!("../../fixtures/keys/service_private.pem");
pub const SERVICE_PUBLIC_PEM: &str = include_str!("../../fixtures/keys/service_public.pem");
pub const OTHER_PRIVATE_PEM: &str = include_str!("../../fixtures/keys/other_private.pem");
pub const OTHER_PUBLIC_PEM: &str = include_str!("../../fixtures/keys/other_public.pem");
pub const UPSTREAM_PRIVATE_PEM: &str = include_str!("../../fixtures/keys/upstream_private.pem");

pub const UPSTREAM_ISSUER: &str = "https://idp.example";

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn upstream_private() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(UPSTREAM_PRIVATE_PEM).unwrap()
}

/// The upstream signing key as a JWKS entry.
pub fn upstream_jwk(kid: &str) -> Value {
    let public = RsaPublicKey::from(&upstream_private());
    json!({
        "kty": "RSA",
        "use": "sig",
        "alg": "RS256",
        "kid": kid,
        "n": URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
        "e": URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
    })
}

/// Signs `claims` with the upstream key, RS256, naming `kid` in the header.
pub fn sign_upstream(claims: &Value, kid: Option<&str>) -> String {
    let der = upstream_private().to_pkcs1_der().unwrap();
    let key = jwt::EncodingKey::from_rsa_der(der.as_bytes());
    let mut header = jwt::Header::new(jwt::Algorithm::RS256);
    header.kid = kid.map(String::from);
    jwt::encode(&header, claims, &key).unwrap()
}

/// RSA-OAEP(SHA-256) ciphertext of `plaintext`, base64url.
pub fn seal_oaep(to: &RsaPublicKey, plaintext: &[u8]) -> String {
    let ciphertext = to
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .unwrap();
    URL_SAFE_NO_PAD.encode(ciphertext)
}

/// Compact JWE with RSA-OAEP-256 key wrapping and A256GCM content encryption.
pub fn seal_compact(to: &RsaPublicKey, kid: Option<&str>, plaintext: &[u8]) -> String {
    let mut header = json!({"alg": "RSA-OAEP-256", "enc": "A256GCM"});
    if let Some(kid) = kid {
        header["kid"] = json!(kid);
    }
    let protected = URL_SAFE_NO_PAD.encode(header.to_string());

    let mut cek = [0u8; 32];
    OsRng.fill_bytes(&mut cek);
    let mut iv = [0u8; 12];
    OsRng.fill_bytes(&mut iv);

    let wrapped = to.encrypt(&mut OsRng, Oaep::new::<Sha256>(), &cek).unwrap();
    let sealed = Aes256Gcm::new_from_slice(&cek)
        .unwrap()
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: plaintext,
                aad: protected.as_bytes(),
            },
        )
        .unwrap();
    let (ciphertext, tag) = sealed.split_at(sealed.len() - 16);

    [
        protected,
        URL_SAFE_NO_PAD.encode(wrapped),
        URL_SAFE_NO_PAD.encode(iv),
        URL_SAFE_NO_PAD.encode(ciphertext),
        URL_SAFE_NO_PAD.encode(tag),
    ]
    .join(".")
}

/// Flips one bit in the decoded form of a base64url segment.
pub fn flip_bit(segment: &str, byte: usize) -> String {
    let mut bytes = URL_SAFE_NO_PAD.decode(segment).unwrap();
    bytes[byte] ^= 0x01;
    URL_SAFE_NO_PAD.encode(bytes)
}
