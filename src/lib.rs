#![warn(missing_docs)]
//!
//! This crate is the relying-party half of a two-service sign-in. An upstream authority authenticates the user and hands back a signed (and optionally encrypted) identity assertion; this crate verifies that assertion against the upstream's published keys, opens any encrypted claims with the service's own RSA key, and mints a short-lived HS256 session token scoped to the local origin.
//!
//! The HTTP routes, cookies and page rendering are left to the host application. It calls into [TrustBridge] with strings it has already pulled out of the request (an authorization code, a cookie value) and renders the typed result.
//!
//! ## Usage
//!
//! Add `trust-bridge` to the dependencies in your project's Cargo.toml.
//!
//! ```toml
//! [dependencies]
//! trust-bridge = "0.1"
//! ```
//!
//! Build one bridge at startup and share it between request handlers:
//!
//! ```rust,no_run
//! use std::path::Path;
//! use trust_bridge::{Config, TrustBridge};
//!
//! let config = Config::from_file(Path::new("bridge.json")).expect("invalid configuration");
//! let bridge = TrustBridge::from_config(&config).expect("cannot start the bridge");
//!
//! // OAuth callback: `code` is the query parameter of the same name.
//! match bridge.complete_login(Some("abc123")) {
//!     Ok(session_token) => println!("set the session cookie to {}", session_token),
//!     Err(err) => println!("{} ({})", err.user_message(), err),
//! }
//!
//! // Any later request carrying the session cookie.
//! match bridge.authenticate_session("eyJ...") {
//!     Ok(session) => println!("hello {} ({})", session.sub, session.role),
//!     Err(err) => println!("{}", err),
//! }
//! ```
//!
//! Logging goes through the [log](https://docs.rs/log) facade; install whichever logger the host uses.

mod base64url;
mod bridge;
mod claims;
mod config;
mod envelope;
mod error;
mod exchange;
mod jwks;
mod keys;
mod remote;
mod session;

#[cfg(test)]
mod testing;

pub use base64url::{decode_to_unsigned, encode_unsigned};
pub use bridge::TrustBridge;
pub use claims::{ClaimSet, DeviceAttributes, DEFAULT_ROLE};
pub use config::{Config, SecretPolicy, ServiceKeyPaths, MAX_SESSION_LIFETIME_SECS};
pub use envelope::{decrypt_compact, decrypt_oaep, ClaimsEnvelope, ENCRYPTED_CLAIMS};
pub use error::{AuthError, InvalidSession, SetupError};
pub use exchange::CodeExchange;
pub use jwks::{CachedKeyResolver, JsonWebKeySet, KeyResolver, RemoteKeyResolver};
pub use keys::{thumbprint, PublishedJwk, PublishedKeySet, ServiceKeyPair};
pub use remote::verify_remote;
pub use session::{SessionClaims, SessionIssuer, SessionSecret, SessionVerifier};

/// Re-exported so callers can name the big integer type of the base64url helpers.
pub use rsa::BigUint;

/// Re-exported so [KeyResolver] implementations can name the key type.
pub use jsonwebkey::JsonWebKey;
