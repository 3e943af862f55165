// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Implicit-flow redirect callback parsing.
//!
//! The provider redirects back to the callback URL with the outcome in the
//! URL fragment:
//!
//! ```text
//! /callback#access_token=...&id_token=...&expires_in=7200&token_type=Bearer&scope=openid%20profile&state=...
//! /callback#error=access_denied&error_description=User%20cancelled&state=...
//! ```

use serde::Deserialize;
use url::Url;

/// Lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: u64 = 7200;

/// Failures while turning a callback into credentials.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    /// The provider answered with an explicit error.
    #[error("Error: {error}{}", .description.as_ref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Authorization {
        error: String,
        description: Option<String>,
    },
    /// Neither an error nor both tokens were present.
    #[error("callback did not contain both an access token and an ID token")]
    MissingTokens,
    #[error("invalid expires_in value: {0}")]
    InvalidExpiresIn(String),
    /// The ID token answers a different authorization request.
    #[error("ID token nonce does not match the authorization request")]
    NonceMismatch,
}

/// Raw fields of a callback fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthResponse {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl AuthResponse {
    /// Parse a fragment, with or without the leading `#`.
    pub fn from_fragment(fragment: &str) -> Result<Self, CallbackError> {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let mut response = AuthResponse::default();

        for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let value = value.into_owned();
            match key.as_ref() {
                "access_token" => response.access_token = Some(value),
                "id_token" => response.id_token = Some(value),
                "token_type" => response.token_type = Some(value),
                "expires_in" => {
                    let secs = value
                        .parse::<u64>()
                        .map_err(|_| CallbackError::InvalidExpiresIn(value.clone()))?;
                    response.expires_in = Some(secs);
                }
                "scope" => response.scope = Some(value),
                "state" => response.state = Some(value),
                "error" => response.error = Some(value),
                "error_description" => response.error_description = Some(value),
                _ => {}
            }
        }

        Ok(response)
    }

    /// Parse the fragment of a full redirect URL.
    pub fn from_redirect_url(url: &Url) -> Result<Self, CallbackError> {
        Self::from_fragment(url.fragment().unwrap_or_default())
    }

    /// Turn the raw fields into credentials.
    ///
    /// An explicit error wins over any tokens that came with it.
    pub fn into_result(self) -> Result<AuthResult, CallbackError> {
        if let Some(error) = self.error {
            return Err(CallbackError::Authorization {
                error,
                description: self.error_description,
            });
        }

        match (self.access_token, self.id_token) {
            (Some(access_token), Some(id_token)) => Ok(AuthResult {
                access_token,
                id_token,
                expires_in: self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
                scope: self.scope,
                state: self.state,
            }),
            _ => Err(CallbackError::MissingTokens),
        }
    }
}

/// Credentials from a successful login or silent renewal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub access_token: String,
    pub id_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    /// Granted scopes, when the provider reports them.
    pub scope: Option<String>,
    pub state: Option<String>,
}

impl AuthResult {
    /// Decode the ID token payload without verifying it.
    ///
    /// The claims are informational only; nothing is authorized from them.
    pub fn id_token_claims(&self) -> Option<IdTokenClaims> {
        jsonwebtoken::dangerous::insecure_decode::<IdTokenClaims>(&self.id_token)
            .map(|data| data.claims)
            .ok()
    }

    /// Check the ID token was issued for the request carrying `expected`.
    ///
    /// Opaque ID tokens carry no claims and are not checked.
    pub fn check_nonce(&self, expected: &str) -> Result<(), CallbackError> {
        match self.id_token_claims() {
            Some(claims) if claims.nonce.as_deref() != Some(expected) => {
                Err(CallbackError::NonceMismatch)
            }
            _ => Ok(()),
        }
    }
}

/// Identity claims carried by the ID token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}
