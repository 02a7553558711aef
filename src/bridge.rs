use std::time::Duration;

use log::{debug, info, warn};
use reqwest::blocking::Client;
use url::Url;

use crate::config::Config;
use crate::envelope::ClaimsEnvelope;
use crate::error::{AuthError, InvalidSession, SetupError};
use crate::exchange::CodeExchange;
use crate::jwks::{CachedKeyResolver, KeyResolver, RemoteKeyResolver};
use crate::keys::{PublishedKeySet, ServiceKeyPair};
use crate::remote::verify_remote;
use crate::session::{SessionClaims, SessionIssuer, SessionSecret, SessionVerifier};

/// The whole login pipeline behind one value. Create with [TrustBridge::from_config].
///
/// A route layer needs three calls: [TrustBridge::complete_login] on the
/// OAuth callback, [TrustBridge::authenticate_session] on every request that
/// carries a session cookie, and [TrustBridge::published_jwks] for the
/// well-known key document. All of them take `&self` and hold no locks
/// beyond the optional key cache, so one bridge can be shared across threads.
pub struct TrustBridge {
    exchange: CodeExchange,
    resolver: Box<dyn KeyResolver + Send + Sync>,
    jwks_endpoint: Url,
    upstream_issuer: String,
    service_key: ServiceKeyPair,
    issuer: SessionIssuer,
    verifier: SessionVerifier,
    session_lifetime: Duration,
}

impl TrustBridge {
    /// Validates `config`, loads the service key pair and session secret it
    /// names, and wires up the HTTP clients.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        config.validate()?;
        let service_key = ServiceKeyPair::from_pem_files(
            &config.service_key.private_pem,
            &config.service_key.public_pem,
        )?;
        let secret = SessionSecret::from_policy(&config.session_secret)?;
        Self::with_parts(config, service_key, &secret)
    }

    /// Like [TrustBridge::from_config], with the key pair and secret supplied
    /// by the caller. `config.service_key` and `config.session_secret` are ignored.
    pub fn with_parts(
        config: &Config,
        service_key: ServiceKeyPair,
        secret: &SessionSecret,
    ) -> Result<Self, SetupError> {
        config.validate()?;
        let http = Client::builder().timeout(config.http_timeout()).build()?;

        let remote = RemoteKeyResolver::new(http.clone());
        let resolver: Box<dyn KeyResolver + Send + Sync> = match config.jwks_cache_ttl() {
            Some(ttl) => {
                debug!("caching upstream keys for {:?}", ttl);
                Box::new(CachedKeyResolver::new(remote, ttl))
            }
            None => Box::new(remote),
        };

        Ok(TrustBridge {
            exchange: CodeExchange::new(
                http,
                config.token_endpoint.clone(),
                config.client_id.clone(),
                config.redirect_uri.clone(),
            ),
            resolver,
            jwks_endpoint: config.jwks_endpoint.clone(),
            upstream_issuer: config.upstream_issuer.clone(),
            service_key,
            issuer: SessionIssuer::new(secret, &config.local_origin, config.session_lifetime()),
            verifier: SessionVerifier::new(secret, &config.local_origin),
            session_lifetime: config.session_lifetime(),
        })
    }

    /// Replaces the key resolver, e.g. with one that reads keys from disk.
    pub fn with_resolver<R>(mut self, resolver: R) -> Self
    where
        R: KeyResolver + Send + Sync + 'static,
    {
        self.resolver = Box::new(resolver);
        self
    }

    /// Turns the authorization code from the OAuth callback into a session token.
    ///
    /// The code is exchanged for an upstream assertion, the assertion is
    /// verified against the upstream key set, encrypted claims are opened
    /// with the service key, and a session token is minted for the subject.
    /// Nothing is minted unless every step succeeds. `signCount` is 0 in the
    /// session when upstream did not send one.
    pub fn complete_login(&self, code: Option<&str>) -> Result<String, AuthError> {
        let code = code.filter(|c| !c.is_empty()).ok_or_else(|| {
            warn!("login callback without an authorization code");
            AuthError::MissingCode
        })?;

        let assertion = self.exchange.exchange(code)?;
        let verified = verify_remote(
            self.resolver.as_ref(),
            &assertion,
            &self.jwks_endpoint,
            &self.upstream_issuer,
        )?;
        let claims = ClaimsEnvelope::classify(verified)?.open(&self.service_key)?;

        let subject = claims.subject().map_err(|e| {
            warn!("upstream claims carry no usable subject");
            e
        })?;
        let mut device = claims.device_attributes();
        device.sign_count.get_or_insert(0);
        let token = self
            .issuer
            .issue(subject, claims.role(), &device, self.session_lifetime)?;

        info!("signed in {}", subject);
        Ok(token)
    }

    /// Checks a session token presented by the browser.
    ///
    /// The cause of a rejection is logged; the caller only learns that the
    /// user has to sign in again.
    pub fn authenticate_session(&self, token: &str) -> Result<SessionClaims, InvalidSession> {
        self.verifier.verify(token).map_err(|e| {
            warn!("session rejected: {}", e);
            InvalidSession
        })
    }

    /// The service's public key set, served so the upstream can encrypt to us.
    pub fn published_jwks(&self) -> PublishedKeySet {
        self.service_key.jwks()
    }

    /// The service key pair.
    pub fn service_key(&self) -> &ServiceKeyPair {
        &self.service_key
    }
}
