#![allow(dead_code)]

mod fixtures;

use mockito::{Mock, ServerGuard};
use serde_json::{json, Value};
use trust_bridge::{Config, ServiceKeyPair};

pub use fixtures::*;

pub const LOCAL_ORIGIN: &str = "https://rp.example";
pub const TOKEN_PATH: &str = "/oauth2/Code2Token";
pub const JWKS_PATH: &str = "/oauth2/.well-known/jwks.json";

pub fn service_key() -> ServiceKeyPair {
    ServiceKeyPair::from_pem(SERVICE_PRIVATE_PEM, SERVICE_PUBLIC_PEM).unwrap()
}

pub fn other_key() -> ServiceKeyPair {
    ServiceKeyPair::from_pem(OTHER_PRIVATE_PEM, OTHER_PUBLIC_PEM).unwrap()
}

/// Bridge configuration pointing at a mock upstream.
pub fn config(server: &ServerGuard) -> Config {
    serde_json::from_value(config_json(server)).unwrap()
}

pub fn config_json(server: &ServerGuard) -> Value {
    json!({
        "upstream_issuer": UPSTREAM_ISSUER,
        "jwks_endpoint": format!("{}{}", server.url(), JWKS_PATH),
        "token_endpoint": format!("{}{}", server.url(), TOKEN_PATH),
        "client_id": "rp-client",
        "redirect_uri": format!("{}/oauth/callback", LOCAL_ORIGIN),
        "local_origin": LOCAL_ORIGIN,
        "service_key": {
            "private_pem": "fixtures/keys/service_private.pem",
            "public_pem": "fixtures/keys/service_public.pem"
        }
    })
}

/// The upstream JWKS document, with one signing key per `kid`.
pub fn upstream_jwks(kids: &[&str]) -> String {
    let keys: Vec<Value> = kids.iter().map(|kid| upstream_jwk(kid)).collect();
    json!({ "keys": keys }).to_string()
}

/// An upstream assertion for `sub`, valid for five minutes.
pub fn assertion_claims(sub: &str) -> Value {
    json!({
        "sub": sub,
        "iat": now(),
        "exp": now() + 300,
        "iss": UPSTREAM_ISSUER,
    })
}

/// Upstream assertion wrapping `enc_claims`, with no claims in the clear.
pub fn encrypted_assertion_claims(enc_claims: String) -> Value {
    json!({
        "enc_claims": enc_claims,
        "iat": now(),
        "exp": now() + 300,
        "iss": UPSTREAM_ISSUER,
    })
}

/// Token endpoint answering with `id_token`. Call `create` on the result.
pub fn exchange_mock(server: &mut ServerGuard, id_token: &str) -> Mock {
    server
        .mock("POST", TOKEN_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "id_token": id_token, "token_type": "Bearer" }).to_string())
}

/// JWKS endpoint serving `body`. Call `create` on the result.
pub fn jwks_mock(server: &mut ServerGuard, body: &str) -> Mock {
    server
        .mock("GET", JWKS_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
}
