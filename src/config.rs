use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::{Host, Url};

use crate::error::SetupError;

fn default_session_lifetime_secs() -> u64 {
    3600
}

fn default_http_timeout_secs() -> u64 {
    5
}

/// Longest session lifetime a configuration may ask for, one day.
pub const MAX_SESSION_LIFETIME_SECS: u64 = 24 * 60 * 60;

/// Where the session-signing secret comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretPolicy {
    /// Random per process; every session ends when the process restarts
    #[default]
    Ephemeral,
    /// Read from this file, generating it on first start
    File(PathBuf),
}

/// Locations of the service key pair, PEM encoded.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceKeyPaths {
    /// Unencrypted PKCS#8 private key
    pub private_pem: PathBuf,
    /// X.509 SubjectPublicKeyInfo public key
    pub public_pem: PathBuf,
}

/// Everything needed to wire the bridge to its upstream authority.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Expected `iss` of upstream assertions
    pub upstream_issuer: String,
    /// Upstream JWKS document
    pub jwks_endpoint: Url,
    /// Upstream authorization-code exchange endpoint
    pub token_endpoint: Url,
    /// Client id registered with the upstream authority
    pub client_id: String,
    /// Callback URL registered with the upstream authority
    pub redirect_uri: Url,
    /// This service's origin, used as `iss` of session tokens
    pub local_origin: String,
    /// Lifetime of a session token, at most [`MAX_SESSION_LIFETIME_SECS`]
    #[serde(default = "default_session_lifetime_secs")]
    pub session_lifetime_secs: u64,
    /// Timeout of each outbound request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Keep resolved upstream keys this long; fetch on every login when unset
    #[serde(default)]
    pub jwks_cache_ttl_secs: Option<u64>,
    /// The service key pair
    pub service_key: ServiceKeyPaths,
    /// Session secret policy
    #[serde(default)]
    pub session_secret: SecretPolicy,
}

impl Config {
    /// Reads and validates a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self, SetupError> {
        let raw = std::fs::read(path).map_err(|source| SetupError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config: Config = serde_json::from_slice(&raw)
            .map_err(|e| SetupError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the bridge cannot run safely with.
    pub fn validate(&self) -> Result<(), SetupError> {
        require_https("jwks_endpoint", &self.jwks_endpoint)?;
        require_https("token_endpoint", &self.token_endpoint)?;

        if self.session_lifetime_secs == 0 {
            return Err(SetupError::Config("session_lifetime_secs must be positive".into()));
        }
        if self.session_lifetime_secs > MAX_SESSION_LIFETIME_SECS {
            return Err(SetupError::Config(format!(
                "session_lifetime_secs must not exceed {}",
                MAX_SESSION_LIFETIME_SECS
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(SetupError::Config("http_timeout_secs must be positive".into()));
        }
        if self.upstream_issuer.is_empty() || self.local_origin.is_empty() {
            return Err(SetupError::Config("issuer origins must not be empty".into()));
        }
        Ok(())
    }

    /// Session token lifetime.
    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_lifetime_secs)
    }

    /// Outbound request timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Key cache lifetime, if caching is on.
    pub fn jwks_cache_ttl(&self) -> Option<Duration> {
        self.jwks_cache_ttl_secs.map(Duration::from_secs)
    }
}

// Plain HTTP only for loopback hosts.
fn require_https(name: &str, url: &Url) -> Result<(), SetupError> {
    let loopback = match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    };
    if url.scheme() == "https" || (url.scheme() == "http" && loopback) {
        Ok(())
    } else {
        Err(SetupError::Config(format!("{} must use https: {}", name, url)))
    }
}
