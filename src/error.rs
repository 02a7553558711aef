use std::path::PathBuf;

use thiserror::Error;

/// The error type for a rejected login or a rejected remote assertion.
///
/// Every variant is recoverable: the route layer turns any of them into
/// [`AuthError::user_message`] and asks the user to sign in again. The
/// variants exist so that logs and tests can tell the failures apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The callback did not carry an authorization code
    #[error("authorization code is missing")]
    MissingCode,

    /// A remote endpoint was unreachable, timed out, or answered with a failure status
    #[error("network error while talking to the upstream authority")]
    Network,

    /// The token endpoint answered the code exchange with a non-200 status
    #[error("upstream rejected the code exchange with HTTP {0}")]
    ExchangeRejected(u16),

    /// A remote response body was not valid JSON or lacked the expected shape
    #[error("malformed response from the upstream authority")]
    MalformedResponse,

    /// A base64url value contained invalid characters
    #[error("malformed base64url encoding")]
    MalformedEncoding,

    /// Claims were missing required members or did not parse as a JSON object
    #[error("malformed claim set")]
    MalformedClaims,

    /// The token string could not be parsed as a signed token
    #[error("malformed token")]
    MalformedToken,

    /// No key in the fetched key set carries the requested key id
    #[error("no key with kid {0:?} in the remote key set")]
    KeyNotFound(String),

    /// The token header has no `kid`, so no key can be selected
    #[error("token header carries no kid")]
    MissingKeyId,

    /// The selected key is not an RSA key
    #[error("selected key is not an RSA public key")]
    UnsupportedKey,

    /// The signature does not verify, or the token uses an unexpected algorithm
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token `exp` has passed
    #[error("token has expired")]
    Expired,

    /// The token `nbf` lies in the future
    #[error("token is not valid yet")]
    NotYetValid,

    /// The token `iss` is missing or does not match the expected issuer
    #[error("unexpected token issuer")]
    InvalidIssuer,

    /// An encrypted claim payload could not be decrypted
    #[error("could not decrypt claims")]
    Decryption,

    /// A session token could not be signed with the local secret
    #[error("could not sign the session token")]
    Signing,
}

impl AuthError {
    /// The only message a browser should ever see for a failed login.
    pub fn user_message(&self) -> &'static str {
        "authentication failed, please sign in again"
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            ErrorKind::ImmatureSignature => AuthError::NotYetValid,
            ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            ErrorKind::MissingRequiredClaim(claim) if claim == "iss" => AuthError::InvalidIssuer,
            ErrorKind::MissingRequiredClaim(_) => AuthError::MalformedClaims,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                AuthError::InvalidSignature
            }
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => AuthError::UnsupportedKey,
            _ => AuthError::MalformedToken,
        }
    }
}

/// Session verification failed. Every cause leads to the same re-authentication,
/// so no detail is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid session, please sign in again")]
pub struct InvalidSession;

/// Errors raised while building the bridge at process start. These are fatal.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A key or secret file could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        /// The file that failed
        path: PathBuf,
        /// The underlying I/O failure
        source: std::io::Error,
    },

    /// A session secret file could not be written
    #[error("cannot write {path}: {source}")]
    Write {
        /// The file that failed
        path: PathBuf,
        /// The underlying I/O failure
        source: std::io::Error,
    },

    /// A PEM document did not hold the expected key type
    #[error("invalid key material: {0}")]
    KeyParse(String),

    /// The configured public key does not belong to the configured private key
    #[error("public key does not match the private key")]
    KeyMismatch,

    /// The configuration is inconsistent or unsafe
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The outbound HTTP client could not be built
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
