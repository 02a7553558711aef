use chrono::Utc;
use jsonwebkey as jwk;
use jsonwebtoken as jwt;
use log::{debug, warn};
use serde_json::Value;
use url::Url;

use crate::claims::ClaimSet;
use crate::error::AuthError;
use crate::jwks::KeyResolver;

/// Verify an RS256 assertion issued by the upstream authority.
///
/// The key is looked up by the `kid` in the token header at `jwks_endpoint`.
/// The token is accepted only if its signature verifies under that key, its
/// `exp` lies in the future, any `nbf` has been reached, and its `iss` equals
/// `expected_issuer`. Each call
/// makes exactly one verification attempt.
///
/// ```rust,no_run
/// use std::time::Duration;
/// use trust_bridge::{verify_remote, RemoteKeyResolver};
///
/// let http = reqwest::blocking::Client::builder()
///     .timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// let resolver = RemoteKeyResolver::new(http);
/// let jwks = url::Url::parse("https://idp.example/oauth2/.well-known/jwks.json").unwrap();
///
/// match verify_remote(&resolver, "eyJ...", &jwks, "https://idp.example") {
///     Ok(claims) => println!("upstream subject: {:?}", claims.subject()),
///     Err(err) => println!("assertion rejected: {}", err),
/// }
/// ```
pub fn verify_remote<R: KeyResolver + ?Sized>(
    resolver: &R,
    token: &str,
    jwks_endpoint: &Url,
    expected_issuer: &str,
) -> Result<ClaimSet, AuthError> {
    let header = jwt::decode_header(token).map_err(|e| {
        warn!("upstream assertion header is unreadable: {}", e);
        AuthError::MalformedToken
    })?;
    let kid = header.kid.ok_or(AuthError::MissingKeyId)?;
    debug!("upstream assertion signed with kid {} ({:?})", kid, header.alg);

    let key = resolver.resolve(jwks_endpoint, &kid)?;
    match (&*key.key, &key.key_use) {
        (jwk::Key::RSA { private: None, .. }, None | Some(jwk::KeyUse::Signing)) => {}
        _ => {
            warn!("key {} is not an RSA signing key", kid);
            return Err(AuthError::UnsupportedKey);
        }
    }

    let mut validation = jwt::Validation::new(jwt::Algorithm::RS256);
    validation
        .required_spec_claims
        .extend(["exp", "iss"].into_iter().map(String::from));
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;
    validation.set_issuer(&[expected_issuer]);

    let token = jwt::decode::<ClaimSet>(token, &key.key.to_decoding_key(), &validation)
        .map_err(|e| {
            warn!("upstream assertion rejected: {}", e);
            AuthError::from(e)
        })?;

    // jsonwebtoken accepts exp == now; the assertion is valid only before exp.
    let exp = token.claims.get("exp").and_then(Value::as_f64);
    if exp.map_or(true, |exp| exp <= Utc::now().timestamp() as f64) {
        warn!("upstream assertion expired at {:?}", exp);
        return Err(AuthError::Expired);
    }

    Ok(token.claims)
}
