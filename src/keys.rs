//! The service's own RSA key pair.
//!
//! The upstream authority encrypts claims to the public half, which this
//! service publishes as a one-key JWKS. The `kid` is the RFC 7638 thumbprint
//! of the public key, so it stays stable for the life of a key and changes
//! whenever the key is rotated.

use std::fmt;
use std::path::Path;

use base64::Engine;
use log::info;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::sha2::{Digest, Sha256};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::base64url::{decode_to_unsigned, encode_unsigned, URL_SAFE_LENIENT};
use crate::error::{AuthError, SetupError};

/// The service's decryption key pair. Immutable once loaded.
pub struct ServiceKeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
    kid: String,
}

impl fmt::Debug for ServiceKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceKeyPair")
            .field("kid", &self.kid)
            .field("private", &"<RsaPrivateKey>")
            .finish()
    }
}

impl ServiceKeyPair {
    /// Builds the key pair from an unencrypted PKCS#8 private key and an
    /// X.509 SubjectPublicKeyInfo public key, both PEM.
    pub fn from_pem(private_pem: &str, public_pem: &str) -> Result<Self, SetupError> {
        let private = RsaPrivateKey::from_pkcs8_pem(private_pem)
            .map_err(|e| SetupError::KeyParse(format!("private key: {}", e)))?;
        private
            .validate()
            .map_err(|e| SetupError::KeyParse(format!("private key: {}", e)))?;
        let public = RsaPublicKey::from_public_key_pem(public_pem)
            .map_err(|e| SetupError::KeyParse(format!("public key: {}", e)))?;

        if RsaPublicKey::from(&private) != public {
            return Err(SetupError::KeyMismatch);
        }

        let kid = thumbprint(&public);
        Ok(ServiceKeyPair { private, public, kid })
    }

    /// Reads both PEM files from durable storage.
    pub fn from_pem_files(private_path: &Path, public_path: &Path) -> Result<Self, SetupError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|source| SetupError::Read {
                path: path.to_owned(),
                source,
            })
        };
        let pair = Self::from_pem(&read(private_path)?, &read(public_path)?)?;
        info!(
            "loaded service key {} from {}",
            pair.kid,
            private_path.display()
        );
        Ok(pair)
    }

    /// The key id published alongside the public key.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The public half.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    /// The public half as a JWK.
    pub fn public_jwk(&self) -> PublishedJwk {
        PublishedJwk {
            kty: "RSA".to_owned(),
            key_use: "enc".to_owned(),
            alg: "RS256".to_owned(),
            kid: self.kid.clone(),
            n: encode_unsigned(self.public.n()),
            e: encode_unsigned(self.public.e()),
        }
    }

    /// The document served at the well-known JWKS path.
    pub fn jwks(&self) -> PublishedKeySet {
        PublishedKeySet {
            keys: vec![self.public_jwk()],
        }
    }
}

/// RFC 7638 SHA-256 thumbprint of an RSA public key, base64url.
pub fn thumbprint(public: &RsaPublicKey) -> String {
    // Members in lexicographic order, no whitespace.
    let canonical = format!(
        r#"{{"e":"{}","kty":"RSA","n":"{}"}}"#,
        encode_unsigned(public.e()),
        encode_unsigned(public.n())
    );
    URL_SAFE_LENIENT.encode(Sha256::digest(canonical.as_bytes()))
}

/// An RSA public key in JWK form, as this service publishes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedJwk {
    /// Key type, always `RSA`
    pub kty: String,
    /// Intended use, `enc`
    #[serde(rename = "use")]
    pub key_use: String,
    /// Algorithm label
    pub alg: String,
    /// Key id
    pub kid: String,
    /// Modulus, base64url
    pub n: String,
    /// Public exponent, base64url
    pub e: String,
}

impl PublishedJwk {
    /// Rebuilds the RSA public key, the way a peer reading our JWKS would.
    pub fn to_public_key(&self) -> Result<RsaPublicKey, AuthError> {
        if self.kty != "RSA" {
            return Err(AuthError::UnsupportedKey);
        }
        let n = decode_to_unsigned(&self.n)?;
        let e = decode_to_unsigned(&self.e)?;
        RsaPublicKey::new(n, e).map_err(|_| AuthError::UnsupportedKey)
    }
}

/// A JWKS document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedKeySet {
    /// The published keys
    pub keys: Vec<PublishedJwk>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    #[test]
    fn loads_matching_pair() {
        let pair = service_key();
        assert_eq!(pair.kid(), thumbprint(pair.public_key()));
        assert_eq!(pair.kid().len(), 43);
    }

    #[test]
    fn kid_is_stable_per_key() {
        assert_eq!(service_key().kid(), service_key().kid());
        assert_ne!(service_key().kid(), other_key().kid());
    }

    #[test]
    fn rejects_mismatched_halves() {
        match ServiceKeyPair::from_pem(SERVICE_PRIVATE_PEM, OTHER_PUBLIC_PEM) {
            Err(SetupError::KeyMismatch) => {}
            other => panic!("mismatched key pair was accepted: {:?}", other),
        }
    }

    #[test]
    fn rejects_garbage_pem() {
        match ServiceKeyPair::from_pem("not a key", SERVICE_PUBLIC_PEM) {
            Err(SetupError::KeyParse(_)) => {}
            other => panic!("garbage private key was accepted: {:?}", other),
        }
        match ServiceKeyPair::from_pem(SERVICE_PRIVATE_PEM, SERVICE_PRIVATE_PEM) {
            Err(SetupError::KeyParse(_)) => {}
            other => panic!("private PEM was accepted as public: {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_fatal() {
        let missing = Path::new("fixtures/keys/does_not_exist.pem");
        match ServiceKeyPair::from_pem_files(missing, missing) {
            Err(SetupError::Read { path, .. }) => assert_eq!(path, missing),
            other => panic!("missing key file was accepted: {:?}", other),
        }
    }

    #[test]
    fn published_jwks_shape() {
        let pair = service_key();
        let doc = serde_json::to_value(pair.jwks()).unwrap();
        let key = &doc["keys"][0];

        assert_eq!(key["kty"], "RSA");
        assert_eq!(key["use"], "enc");
        assert_eq!(key["alg"], "RS256");
        assert_eq!(key["kid"], pair.kid());
        assert_eq!(key["e"], "AQAB");
    }

    #[test]
    fn published_jwk_round_trips_to_the_public_key() {
        let pair = service_key();
        assert_eq!(pair.public_jwk().to_public_key().unwrap(), *pair.public_key());
    }

    #[test]
    fn debug_hides_private_key() {
        let rendered = format!("{:?}", service_key());
        assert!(rendered.contains("<RsaPrivateKey>"));
    }
}
