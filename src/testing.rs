//! Fixtures shared by the unit tests.

use crate::keys::ServiceKeyPair;

#[path = "../tests/common/fixtures.rs"]
mod fixtures;

pub use fixtures::*;

pub fn service_key() -> ServiceKeyPair {
    ServiceKeyPair::from_pem(SERVICE_PRIVATE_PEM, SERVICE_PUBLIC_PEM).unwrap()
}

pub fn other_key() -> ServiceKeyPair {
    ServiceKeyPair::from_pem(OTHER_PRIVATE_PEM, OTHER_PUBLIC_PEM).unwrap()
}
