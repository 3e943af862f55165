// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token verification and the Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers behind `require_jwt`:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};

use super::{claims::Auth0Claims, AuthError, AuthenticatedUser};
use crate::state::{AppState, AuthConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// The only signing algorithm accepted for access tokens.
const ACCEPTED_ALGORITHM: Algorithm = Algorithm::RS256;

/// Extractor for authenticated users.
///
/// Reads the user inserted by `require_jwt`; on routes without the
/// middleware it verifies the bearer token itself.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let token = bearer_token(&parts.headers)?;
        let user = verify_jwt(token, &state.auth_config).await?;

        Ok(Auth(user))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidAuthHeader)?;

    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

/// Verify a JWT and extract user information.
///
/// With a JWKS configured, verifies the RS256 signature, issuer, audience
/// and expiry. Without one, only test builds and the `dev` feature fall back
/// to structural decoding.
pub async fn verify_jwt(token: &str, auth_config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    match &auth_config.jwks {
        Some(jwks) => verify_jwt_production(token, jwks, auth_config).await,
        None => verify_jwt_without_jwks(token, auth_config),
    }
}

/// Production JWT verification with JWKS.
async fn verify_jwt_production(
    token: &str,
    jwks: &super::JwksManager,
    auth_config: &AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

    // Checked before any key lookup.
    if header.alg != ACCEPTED_ALGORITHM {
        return Err(AuthError::InvalidAlgorithm);
    }

    let (decoding_key, _) = match &header.kid {
        Some(kid) => jwks.get_decoding_key(kid).await?,
        None => jwks.get_any_decoding_key().await?,
    };

    let mut validation = Validation::new(ACCEPTED_ALGORITHM);
    validation.leeway = CLOCK_SKEW_LEEWAY;

    if let Some(ref issuer) = auth_config.issuer {
        validation.set_issuer(&[issuer]);
    }

    if let Some(ref audience) = auth_config.audience {
        validation.set_audience(&[audience]);
    } else {
        validation.validate_aud = false;
    }

    let token_data = decode::<Auth0Claims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            jsonwebtoken::errors::ErrorKind::InvalidIssuer => AuthError::InvalidIssuer,
            jsonwebtoken::errors::ErrorKind::InvalidAudience => AuthError::InvalidAudience,
            jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => AuthError::InvalidAlgorithm,
            _ => AuthError::MalformedToken,
        }
    })?;

    Ok(AuthenticatedUser::from_claims(
        token_data.claims,
        &auth_config.roles_claim,
    ))
}

#[cfg(not(any(test, feature = "dev")))]
fn verify_jwt_without_jwks(
    _token: &str,
    _auth_config: &AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    Err(AuthError::InternalError("JWKS is not configured".to_string()))
}

/// Development JWT verification (no signature check).
///
/// WARNING: This should only be used in development environments.
#[cfg(any(test, feature = "dev"))]
fn verify_jwt_without_jwks(
    token: &str,
    auth_config: &AuthConfig,
) -> Result<AuthenticatedUser, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<Auth0Claims>(token)
        .map_err(|_e| AuthError::MalformedToken)?;

    let claims = token_data.claims;

    let now = chrono::Utc::now().timestamp();
    if claims.exp > 0 && claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::TokenExpired);
    }

    if let Some(ref issuer) = auth_config.issuer {
        if &claims.iss != issuer {
            return Err(AuthError::InvalidIssuer);
        }
    }

    Ok(AuthenticatedUser::from_claims(claims, &auth_config.roles_claim))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::Roles;
    use crate::scope::ScopeSet;
    use axum::http::Request;

    /// State in development mode, issuer pinned to `test`.
    pub(crate) fn create_test_state() -> AppState {
        AppState::new(AuthConfig {
            jwks: None,
            issuer: Some("test".to_string()),
            audience: None,
            ..AuthConfig::default()
        })
    }

    /// Build an unsigned test JWT from a claims object.
    pub(crate) fn create_test_jwt(claims: serde_json::Value) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let header = r#"{"alg":"RS256","typ":"JWT","kid":"test-key"}"#;
        let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());
        let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());

        // Signature is never checked in development mode
        format!("{}.{}.fake_signature", header_b64, claims_b64)
    }

    pub(crate) fn user_jwt(sub: &str, scope: &str, roles: &[&str]) -> String {
        create_test_jwt(serde_json::json!({
            "sub": sub,
            "iat": 1609459200,
            "exp": 9999999999i64,
            "iss": "test",
            "scope": scope,
            "http://localhost:3000/roles": roles,
        }))
    }

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/test");
        if let Some(value) = value {
            builder = builder.header("Authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn auth_extractor_requires_auth_header() {
        let state = create_test_state();
        let mut parts = parts_with_header(None);

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::MissingAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_non_bearer_scheme() {
        let state = create_test_state();
        let mut parts = parts_with_header(Some("Basic dXNlcjpwYXNz"));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidAuthHeader)));
    }

    #[tokio::test]
    async fn auth_extractor_succeeds_with_jwt() {
        let state = create_test_state();
        let token = user_jwt("auth0|user_123", "openid read:courses", &["admin"]);
        let mut parts = parts_with_header(Some(&format!("Bearer {}", token)));

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, "auth0|user_123");
        assert!(user.has_scopes(&["read:courses"]));
        assert!(user.has_role("admin"));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_expired_token() {
        let state = create_test_state();
        let token = create_test_jwt(serde_json::json!({
            "sub": "auth0|user_123",
            "exp": 1609459200,
            "iss": "test",
        }));
        let mut parts = parts_with_header(Some(&format!("Bearer {}", token)));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn auth_extractor_rejects_wrong_issuer() {
        let state = create_test_state();
        let token = create_test_jwt(serde_json::json!({
            "sub": "auth0|user_123",
            "exp": 9999999999i64,
            "iss": "https://evil.example.com/",
        }));
        let mut parts = parts_with_header(Some(&format!("Bearer {}", token)));

        let result = Auth::from_request_parts(&mut parts, &state).await;
        assert!(matches!(result, Err(AuthError::InvalidIssuer)));
    }

    #[tokio::test]
    async fn auth_extractor_prefers_extensions() {
        let state = create_test_state();
        let mut parts = parts_with_header(None);

        let user = AuthenticatedUser {
            user_id: "user_from_middleware".to_string(),
            scopes: ScopeSet::default(),
            roles: Roles::default(),
            client_id: None,
            issuer: "middleware".to_string(),
            expires_at: 0,
        };
        parts.extensions.insert(user);

        let Auth(user) = Auth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(user.user_id, "user_from_middleware");
    }

    #[tokio::test]
    async fn production_mode_rejects_hs256_before_key_lookup() {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

        let config = AuthConfig {
            jwks: Some(crate::auth::JwksManager::new(
                "http://127.0.0.1:9/.well-known/jwks.json",
            )),
            ..AuthConfig::default()
        };
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#);
        let token = format!("{header}.{claims}.sig");

        let result = verify_jwt(&token, &config).await;
        assert!(matches!(result, Err(AuthError::InvalidAlgorithm)));
    }
}
