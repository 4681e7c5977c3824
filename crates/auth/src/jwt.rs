//! HS256 bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::{Identity, JwtClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed or unsigned token: {0}")]
    Malformed(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Verifies a raw bearer token and yields the caller identity.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError>;
}

/// Shared-secret (HS256) token validator.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry lives in `expires_at` and is checked by `validate_claims`.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl core::fmt::Debug for Hs256JwtValidator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256JwtValidator").finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Identity, AuthError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::Malformed(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        tracing::debug!(user_id = %data.claims.sub, "token accepted");

        Ok(Identity::from(data.claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::UserId;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    fn mint(secret: &str, claims: &JwtClaims) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims() -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            sub: UserId::new(),
            username: "buyer01".to_string(),
            name: "Buyer One".to_string(),
            issued_at: now,
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn valid_token_yields_identity() {
        let claims = claims();
        let token = mint("secret", &claims);
        let validator = Hs256JwtValidator::new("secret");

        let identity = validator.validate(&token, Utc::now()).unwrap();
        assert_eq!(identity.user_id, claims.sub);
        assert_eq!(identity.username, "buyer01");
        assert_eq!(identity.display_name, "Buyer One");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = mint("secret", &claims());
        let validator = Hs256JwtValidator::new("other");

        assert!(matches!(validator.validate(&token, Utc::now()), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = claims();
        let token = mint("secret", &claims);
        let validator = Hs256JwtValidator::new("secret");

        let later = claims.expires_at + Duration::seconds(1);
        assert_eq!(
            validator.validate(&token, later),
            Err(AuthError::Claims(TokenValidationError::Expired))
        );
    }
}
