use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use sha2::Sha256;
use tracing::debug;

use shared_models::auth::{JwtClaims, JwtHeader, User};

type HmacSha256 = Hmac<Sha256>;

fn decode_segment<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T, String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| format!("Invalid token {} encoding", what))?;

    serde_json::from_slice(&bytes).map_err(|e| {
        debug!("Failed to parse token {}: {}", what, e);
        format!("Invalid token {}", what)
    })
}

fn verify_signature(signed_part: &str, signature_b64: &str, secret: &str) -> Result<(), String> {
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| "Invalid signature encoding".to_string())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signed_part.as_bytes());

    mac.verify_slice(&signature).map_err(|_| {
        debug!("Token signature verification failed");
        "Invalid token signature".to_string()
    })
}

/// Checks an HS256 access token from the hosted auth provider and returns
/// the staff member it was issued to.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let (header_b64, claims_b64, signature_b64) = match token.split('.').collect::<Vec<_>>()[..] {
        [header, claims, signature] => (header, claims, signature),
        _ => return Err("Invalid token format".to_string()),
    };

    let header: JwtHeader = decode_segment(header_b64, "header")?;
    if header.alg != "HS256" {
        debug!("Rejecting token signed with {}", header.alg);
        return Err("Unsupported token algorithm".to_string());
    }

    verify_signature(&format!("{}.{}", header_b64, claims_b64), signature_b64, jwt_secret)?;

    let claims: JwtClaims = decode_segment(claims_b64, "claims")?;
    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp().max(0) as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err("Token expired".to_string());
        }
    }

    let role = claims.effective_role();
    let user = User {
        id: claims.sub,
        email: claims.email,
        role,
        metadata: claims.user_metadata,
        created_at: claims.iat.and_then(|iat| Utc.timestamp_opt(iat as i64, 0).single()),
    };

    debug!("Token validated for user {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn test_valid_token_round_trips_role() {
        let user = TestUser::admin("front-desk@example.com");
        let token = JwtTestUtils::create_test_token(&user, SECRET, Some(1));

        let validated = validate_token(&token, SECRET).unwrap();
        assert_eq!(validated.id, user.id);
        assert!(validated.is_admin());
    }

    #[test]
    fn test_rejections() {
        let user = TestUser::default();
        assert_eq!(
            validate_token(&JwtTestUtils::create_expired_token(&user, SECRET), SECRET).unwrap_err(),
            "Token expired"
        );
        assert_eq!(
            validate_token(&JwtTestUtils::create_invalid_signature_token(&user), SECRET).unwrap_err(),
            "Invalid token signature"
        );
        assert!(validate_token(&JwtTestUtils::create_malformed_token(), SECRET).is_err());
        assert_eq!(validate_token("a.b", SECRET).unwrap_err(), "Invalid token format");
        assert_eq!(validate_token("a.b.c", "").unwrap_err(), "JWT secret is not set");
    }
}
