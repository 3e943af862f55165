// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::auth::JwksManager;
use crate::config::{ServerConfig, DEFAULT_ROLES_CLAIM};

/// Token verification settings shared by every protected route.
#[derive(Clone)]
pub struct AuthConfig {
    /// JWKS manager; `None` selects development mode (signature not checked),
    /// which is only available in tests or with the `dev` feature.
    pub jwks: Option<JwksManager>,
    /// Expected issuer (`https://{domain}/`)
    pub issuer: Option<String>,
    /// Expected audience (API identifier)
    pub audience: Option<String>,
    /// Custom claim carrying the user's roles
    pub roles_claim: String,
}

impl AuthConfig {
    pub fn from_server_config(config: &ServerConfig) -> Self {
        Self {
            jwks: Some(JwksManager::new(config.jwks_url())),
            issuer: Some(config.issuer()),
            audience: Some(config.audience.clone()),
            roles_claim: config.roles_claim.clone(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwks: None,
            issuer: None,
            audience: None,
            roles_claim: DEFAULT_ROLES_CLAIM.to_string(),
        }
    }
}

#[derive(Clone, Default)]
pub struct AppState {
    pub auth_config: AuthConfig,
}

impl AppState {
    pub fn new(auth_config: AuthConfig) -> Self {
        Self { auth_config }
    }
}
