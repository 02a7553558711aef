//! Locally issued session tokens.
//!
//! Sessions are HS256 tokens signed with a [`SessionSecret`]. The secret is
//! handed to the [`SessionIssuer`] and [`SessionVerifier`] explicitly, and
//! its lifetime follows the configured [`SecretPolicy`]: an ephemeral secret
//! dies with the process and takes every outstanding session with it.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken as jwt;
use log::{info, warn};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::claims::{DeviceAttributes, DEFAULT_ROLE};
use crate::config::SecretPolicy;
use crate::error::{AuthError, SetupError};

/// The symmetric key that signs and verifies session tokens.
#[derive(Clone)]
pub struct SessionSecret(Vec<u8>);

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSecret(<redacted>)")
    }
}

impl SessionSecret {
    /// Length of a generated secret, and the minimum accepted length.
    pub const LEN: usize = 32;

    /// A fresh random secret.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; Self::LEN];
        OsRng.fill_bytes(&mut bytes);
        SessionSecret(bytes)
    }

    /// Wraps existing key material. Shorter than [`SessionSecret::LEN`] bytes is refused.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SetupError> {
        if bytes.len() < Self::LEN {
            return Err(SetupError::Config(format!(
                "session secret must be at least {} bytes, got {}",
                Self::LEN,
                bytes.len()
            )));
        }
        Ok(SessionSecret(bytes))
    }

    /// Reads the secret at `path`, or generates one and writes it there.
    pub fn load_or_create(path: &Path) -> Result<Self, SetupError> {
        match std::fs::read(path) {
            Ok(bytes) => Self::from_bytes(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let secret = Self::generate();
                std::fs::write(path, &secret.0).map_err(|source| SetupError::Write {
                    path: path.to_owned(),
                    source,
                })?;
                info!("generated new session secret at {}", path.display());
                Ok(secret)
            }
            Err(source) => Err(SetupError::Read {
                path: path.to_owned(),
                source,
            }),
        }
    }

    /// Obtains the secret the way `policy` says.
    pub fn from_policy(policy: &SecretPolicy) -> Result<Self, SetupError> {
        match policy {
            SecretPolicy::Ephemeral => {
                info!("using an ephemeral session secret; sessions end at restart");
                Ok(Self::generate())
            }
            SecretPolicy::File(path) => Self::load_or_create(path),
        }
    }
}

/// Claims of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject, as asserted upstream
    pub sub: String,
    /// Role, `user` unless upstream said otherwise
    pub role: String,
    /// Authenticator attributes, when upstream supplied them
    #[serde(flatten)]
    pub device: DeviceAttributes,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
    /// Issuer, the local origin
    pub iss: String,
}

/// Mints session tokens.
pub struct SessionIssuer {
    key: jwt::EncodingKey,
    issuer: String,
    max_lifetime: Duration,
}

impl SessionIssuer {
    /// Creates an issuer for `issuer` (the local origin). No token outlives `max_lifetime`.
    pub fn new(secret: &SessionSecret, issuer: impl Into<String>, max_lifetime: Duration) -> Self {
        SessionIssuer {
            key: jwt::EncodingKey::from_secret(&secret.0),
            issuer: issuer.into(),
            max_lifetime,
        }
    }

    /// Mints a token for `subject`. `lifetime` is capped at the issuer's maximum.
    pub fn issue(
        &self,
        subject: &str,
        role: Option<&str>,
        device: &DeviceAttributes,
        lifetime: Duration,
    ) -> Result<String, AuthError> {
        self.issue_at(Utc::now(), subject, role, device, lifetime)
    }

    fn issue_at(
        &self,
        now: DateTime<Utc>,
        subject: &str,
        role: Option<&str>,
        device: &DeviceAttributes,
        lifetime: Duration,
    ) -> Result<String, AuthError> {
        let lifetime = lifetime.min(self.max_lifetime);
        let lifetime = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
        let iat = now.timestamp();
        let claims = SessionClaims {
            sub: subject.to_owned(),
            role: role.unwrap_or(DEFAULT_ROLE).to_owned(),
            device: device.clone(),
            iat,
            exp: iat.saturating_add(lifetime),
            iss: self.issuer.clone(),
        };

        jwt::encode(&jwt::Header::new(jwt::Algorithm::HS256), &claims, &self.key).map_err(|e| {
            warn!("signing session token failed: {}", e);
            AuthError::Signing
        })
    }
}

/// Checks session tokens presented by the browser.
pub struct SessionVerifier {
    key: jwt::DecodingKey,
    validation: jwt::Validation,
}

impl SessionVerifier {
    /// Creates a verifier accepting tokens from `issuer` signed with `secret`.
    pub fn new(secret: &SessionSecret, issuer: &str) -> Self {
        let mut validation = jwt::Validation::new(jwt::Algorithm::HS256);
        validation
            .required_spec_claims
            .extend(["exp", "iss", "sub"].into_iter().map(String::from));
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[issuer]);

        SessionVerifier {
            key: jwt::DecodingKey::from_secret(&secret.0),
            validation,
        }
    }

    /// Verifies signature, expiry and issuer, returning the session claims.
    ///
    /// A token is accepted only strictly before its `exp`.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let data = jwt::decode::<SessionClaims>(token, &self.key, &self.validation)?;
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }
        Ok(data.claims)
    }
}
