use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AuthError;

/// Role granted when the upstream assertion does not name one.
pub const DEFAULT_ROLE: &str = "user";

/// A verified or decrypted claim set, kept as the JSON object it arrived as.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    /// Parses decrypted bytes as a UTF-8 JSON object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AuthError> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(ClaimSet(map)),
            _ => Err(AuthError::MalformedClaims),
        }
    }

    /// The raw claim value named `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// The `sub` claim. Missing or non-string subjects are malformed.
    pub fn subject(&self) -> Result<&str, AuthError> {
        self.get("sub")
            .and_then(Value::as_str)
            .ok_or(AuthError::MalformedClaims)
    }

    /// The `role` claim, if the upstream set one.
    pub fn role(&self) -> Option<&str> {
        self.get("role").and_then(Value::as_str)
    }

    /// Authenticator attributes carried next to the subject.
    pub fn device_attributes(&self) -> DeviceAttributes {
        DeviceAttributes {
            aaguid: self.get("aaguid").and_then(Value::as_str).map(String::from),
            sign_count: self.get("signCount").and_then(Value::as_u64),
        }
    }

    /// Unwraps the underlying JSON object.
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(map: Map<String, Value>) -> Self {
        ClaimSet(map)
    }
}

/// Attributes of the authenticator the user signed in with upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAttributes {
    /// Authenticator model identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aaguid: Option<String>,

    /// Signature counter reported by the authenticator
    #[serde(
        rename = "signCount",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sign_count: Option<u64>,
}

impl DeviceAttributes {
    /// True when no attribute is present.
    pub fn is_empty(&self) -> bool {
        self.aaguid.is_none() && self.sign_count.is_none()
    }
}
