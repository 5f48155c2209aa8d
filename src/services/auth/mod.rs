pub mod access_jwt;
pub mod claims;
pub mod discovery;
pub mod factory;
pub mod key_store;

pub use access_jwt::{TokenVerifier, VerificationError, VerifierPolicy};
pub use claims::{ScopeRequirement, TokenClaims};
pub use key_store::{KeyFetchError, KeyStore};
