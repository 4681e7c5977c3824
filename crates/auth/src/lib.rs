//! `bazaar-auth`: authentication boundary.
//!
//! Turns a bearer token into a caller [`Identity`]. Token issuance, password
//! storage and sessions live outside this workspace; this crate only
//! verifies what it is handed.

pub mod claims;
pub mod identity;
pub mod jwt;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use identity::Identity;
pub use jwt::{AuthError, Hs256JwtValidator, JwtValidator};
