// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::roles::Roles;
use crate::scope::ScopeSet;

/// Claims carried by an Auth0 access token.
///
/// Standard registered claims plus the Auth0 `scope` string, the optional
/// RBAC `permissions` array, and any namespaced custom claims.
#[derive(Debug, Clone, Deserialize)]
pub struct Auth0Claims {
    /// Subject (user ID), e.g. `auth0|5c1a...`
    pub sub: String,

    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,

    /// Expiration timestamp
    #[serde(default)]
    pub exp: i64,

    /// Issuer (`https://{domain}/`)
    #[serde(default)]
    pub iss: String,

    /// Audience; Auth0 sends an array when the userinfo audience is included.
    /// Validated by jsonwebtoken, not read directly.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,

    /// Authorized party (the SPA client ID)
    #[serde(default)]
    pub azp: Option<String>,

    /// Space-delimited granted scopes
    #[serde(default)]
    pub scope: Option<String>,

    /// RBAC permissions (when "Add Permissions in the Access Token" is on)
    #[serde(default)]
    pub permissions: Option<Vec<String>>,

    /// Namespaced custom claims, roles among them
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Authenticated user information extracted from a verified JWT.
///
/// Inserted into request extensions by `require_jwt` and read by the
/// authorization middleware and the `Auth` extractor.
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedUser {
    /// Canonical user ID (`sub` claim)
    pub user_id: String,

    /// Granted scopes (`scope` claim merged with `permissions`)
    pub scopes: ScopeSet,

    /// Roles from the configured custom claim
    pub roles: Roles,

    /// Authorized party (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Original issuer
    #[serde(skip)]
    pub issuer: String,

    /// Token expiration (Unix timestamp)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Create from Auth0 claims, reading roles from `roles_claim`.
    pub fn from_claims(claims: Auth0Claims, roles_claim: &str) -> Self {
        let mut scopes = claims
            .scope
            .as_deref()
            .map(ScopeSet::parse)
            .unwrap_or_default();
        if let Some(permissions) = claims.permissions {
            scopes.extend(permissions);
        }

        let roles = Roles::from_claims(&claims.extra, roles_claim);

        Self {
            user_id: claims.sub,
            scopes,
            roles,
            client_id: claims.azp,
            issuer: claims.iss,
            expires_at: claims.exp,
        }
    }

    /// True iff every requested scope was granted.
    pub fn has_scopes<S: AsRef<str>>(&self, requested: &[S]) -> bool {
        self.scopes.contains_all(requested)
    }

    /// True iff the user holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.has(role)
    }
}
