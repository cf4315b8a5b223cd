/// Access token issuing and verification
use crate::{
    config::JwtConfig,
    error::{ApiError, ApiResult},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub exp: i64,
    pub iat: i64,
}

/// Map the configured method name onto a jsonwebtoken algorithm
pub fn algorithm(signing_method: &str) -> ApiResult<Algorithm> {
    match signing_method {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(ApiError::Internal(format!(
            "Unsupported JWT signing method: {}",
            other
        ))),
    }
}

/// Sign an access token for `user_id` valid for `access_ttl` seconds from `now`
pub fn issue(user_id: &str, now: DateTime<Utc>, config: &JwtConfig) -> ApiResult<String> {
    let claims = Claims {
        user_id: user_id.to_string(),
        iat: now.timestamp(),
        exp: now.timestamp() + config.access_ttl,
    };

    encode(
        &Header::new(algorithm(&config.signing_method)?),
        &claims,
        &EncodingKey::from_secret(config.sign_key.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to sign access token: {}", e)))
}

/// Verify signature and expiry against `now`
///
/// Expiry is checked here rather than by jsonwebtoken so the service clock
/// decides what "now" is.
pub fn verify(token: &str, now: DateTime<Utc>, config: &JwtConfig) -> ApiResult<Claims> {
    let mut validation = Validation::new(algorithm(&config.signing_method)?);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.sign_key.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("Access token rejected: {}", e);
        ApiError::UserUnauthenticated
    })?;

    if data.claims.exp <= now.timestamp() || data.claims.user_id.is_empty() {
        return Err(ApiError::UserUnauthenticated);
    }

    Ok(data.claims)
}

/// Opaque refresh token: 32 random bytes, base64url without padding
pub fn new_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use chrono::Duration;

    fn jwt_config() -> JwtConfig {
        ServerConfig::for_testing("postgres://localhost/tasklane_test").jwt
    }

    #[test]
    fn test_issue_then_verify() {
        let config = jwt_config();
        let now = Utc::now();

        let token = issue("user-1", now, &config).unwrap();
        let claims = verify(&token, now, &config).unwrap();

        assert_eq!(claims.user_id, "user-1");
        assert_eq!(claims.exp - claims.iat, config.access_ttl);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let config = jwt_config();
        let issued = Utc::now();
        let token = issue("user-1", issued, &config).unwrap();

        let later = issued + Duration::seconds(config.access_ttl + 1);
        assert!(matches!(
            verify(&token, later, &config),
            Err(ApiError::UserUnauthenticated)
        ));
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let config = jwt_config();
        let now = Utc::now();
        let token = issue("user-1", now, &config).unwrap();

        let mut other = config.clone();
        other.sign_key = "another-signing-key-that-is-long-enough".to_string();
        assert!(verify(&token, now, &other).is_err());
    }

    #[test]
    fn test_unknown_signing_method() {
        assert!(algorithm("RS256").is_err());
        assert_eq!(algorithm("HS512").unwrap(), Algorithm::HS512);
    }

    #[test]
    fn test_refresh_tokens_are_unique() {
        let a = new_refresh_token();
        let b = new_refresh_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }
}
