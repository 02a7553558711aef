//! Remote key discovery.
//!
//! A [`KeyResolver`] turns a JWKS endpoint and a key id into the public key
//! that should verify a token. [`RemoteKeyResolver`] fetches the whole key
//! set on every call; [`CachedKeyResolver`] can be layered on top of it to
//! keep keys around for a while.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use jsonwebkey as jwk;
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::error::AuthError;

/// Finds the public key for a key id at a JWKS endpoint.
pub trait KeyResolver {
    /// Resolve the key whose `kid` equals `key_id`.
    fn resolve(&self, jwks_endpoint: &Url, key_id: &str) -> Result<jwk::JsonWebKey, AuthError>;
}

impl<R: KeyResolver + ?Sized> KeyResolver for &R {
    fn resolve(&self, jwks_endpoint: &Url, key_id: &str) -> Result<jwk::JsonWebKey, AuthError> {
        (**self).resolve(jwks_endpoint, key_id)
    }
}

/// A fetched JWKS document.
///
/// Entries stay raw JSON until selected, so one key of an unfamiliar type
/// does not make the whole set unusable.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonWebKeySet {
    keys: Vec<Value>,
}

impl JsonWebKeySet {
    /// Parses a JWKS document body.
    pub fn from_slice(body: &[u8]) -> Result<Self, AuthError> {
        serde_json::from_slice(body).map_err(|e| {
            warn!("key set body is not a JWKS document: {}", e);
            AuthError::MalformedResponse
        })
    }

    /// Number of entries, parseable or not.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Selects the first key whose `kid` equals `key_id`.
    pub fn select(&self, key_id: &str) -> Result<jwk::JsonWebKey, AuthError> {
        let entry = self
            .keys
            .iter()
            .find(|k| k.get("kid").and_then(Value::as_str) == Some(key_id))
            .ok_or_else(|| AuthError::KeyNotFound(key_id.to_owned()))?;

        serde_json::from_value(entry.clone()).map_err(|e| {
            warn!("key {} in the remote key set cannot be parsed: {}", key_id, e);
            AuthError::MalformedResponse
        })
    }
}

/// Fetches the key set from the network on every call.
#[derive(Debug, Clone)]
pub struct RemoteKeyResolver {
    http: Client,
}

impl RemoteKeyResolver {
    /// Creates a resolver over an HTTP client. The client's timeout bounds each fetch.
    pub fn new(http: Client) -> Self {
        RemoteKeyResolver { http }
    }

    /// GETs and parses the key set at `jwks_endpoint`.
    pub fn fetch(&self, jwks_endpoint: &Url) -> Result<JsonWebKeySet, AuthError> {
        let response = self
            .http
            .get(jwks_endpoint.clone())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!("fetching key set from {} failed: {}", jwks_endpoint, e);
                AuthError::Network
            })?;

        let body = response.bytes().map_err(|e| {
            warn!("reading key set from {} failed: {}", jwks_endpoint, e);
            AuthError::Network
        })?;

        let set = JsonWebKeySet::from_slice(&body)?;
        info!("fetched {} keys from {}", set.len(), jwks_endpoint);
        Ok(set)
    }
}

impl KeyResolver for RemoteKeyResolver {
    fn resolve(&self, jwks_endpoint: &Url, key_id: &str) -> Result<jwk::JsonWebKey, AuthError> {
        self.fetch(jwks_endpoint)?.select(key_id)
    }
}

struct CachedKey {
    key: jwk::JsonWebKey,
    fetched_at: Instant,
}

/// Keeps resolved keys for `ttl`, keyed by endpoint and key id.
///
/// A key id that is not cached, or whose entry is older than `ttl`, goes to
/// the inner resolver. A rotated upstream key therefore shows up on the
/// first token that names it.
pub struct CachedKeyResolver<R> {
    inner: R,
    ttl: Duration,
    entries: Mutex<HashMap<(String, String), CachedKey>>,
}

impl<R: KeyResolver> CachedKeyResolver<R> {
    /// Wraps `inner` with a cache of the given lifetime.
    pub fn new(inner: R, ttl: Duration) -> Self {
        CachedKeyResolver {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Drops every cached key.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl<R: KeyResolver> KeyResolver for CachedKeyResolver<R> {
    fn resolve(&self, jwks_endpoint: &Url, key_id: &str) -> Result<jwk::JsonWebKey, AuthError> {
        let cache_key = (jwks_endpoint.as_str().to_owned(), key_id.to_owned());

        {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = entries.get(&cache_key) {
                if cached.fetched_at.elapsed() < self.ttl {
                    debug!("using cached key {} for {}", key_id, jwks_endpoint);
                    return Ok(cached.key.clone());
                }
            }
        }

        let key = self.inner.resolve(jwks_endpoint, key_id)?;
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                cache_key,
                CachedKey {
                    key: key.clone(),
                    fetched_at: Instant::now(),
                },
            );
        Ok(key)
    }
}
