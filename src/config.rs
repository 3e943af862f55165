// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH0_DOMAIN` | Auth0 tenant domain (e.g. `example.eu.auth0.com`) | Required |
//! | `AUTH0_AUDIENCE` | API identifier expected in the `aud` claim | Required |
//! | `AUTH0_ROLES_CLAIM` | Namespaced claim carrying the user's roles | `http://localhost:3000/roles` |
//! | `AUTH0_CLIENT_ID` | SPA client ID (session client only) | Required for the client |
//! | `AUTH0_CALLBACK_URL` | Implicit-flow redirect URI (session client only) | Required for the client |
//! | `AUTH0_SCOPES` | Scopes requested at login | `openid profile email read:courses` |
//! | `AUTH0_LOGOUT_RETURN_TO` | Where the provider sends the browser after logout | `http://localhost:3000` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3001` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;

use url::Url;

pub const AUTH0_DOMAIN_ENV: &str = "AUTH0_DOMAIN";
pub const AUTH0_AUDIENCE_ENV: &str = "AUTH0_AUDIENCE";
pub const AUTH0_ROLES_CLAIM_ENV: &str = "AUTH0_ROLES_CLAIM";
pub const AUTH0_CLIENT_ID_ENV: &str = "AUTH0_CLIENT_ID";
pub const AUTH0_CALLBACK_URL_ENV: &str = "AUTH0_CALLBACK_URL";
pub const AUTH0_SCOPES_ENV: &str = "AUTH0_SCOPES";
pub const AUTH0_LOGOUT_RETURN_TO_ENV: &str = "AUTH0_LOGOUT_RETURN_TO";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Roles are attached to tokens by an Auth0 rule under a namespaced claim.
pub const DEFAULT_ROLES_CLAIM: &str = "http://localhost:3000/roles";
pub const DEFAULT_SCOPES: &str = "openid profile email read:courses";
pub const DEFAULT_LOGOUT_RETURN_TO: &str = "http://localhost:3000";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} is required")]
    Missing(&'static str),
    #[error("environment variable {name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Logging output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub domain: String,
    pub audience: String,
    pub roles_claim: String,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load server configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load server configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let domain = required(&lookup, AUTH0_DOMAIN_ENV)?;
        let audience = required(&lookup, AUTH0_AUDIENCE_ENV)?;
        let roles_claim =
            lookup(AUTH0_ROLES_CLAIM_ENV).unwrap_or_else(|| DEFAULT_ROLES_CLAIM.to_string());

        let host = lookup(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup(PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr =
            format!("{host}:{port}")
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: HOST_ENV,
                    reason: e.to_string(),
                })?;

        let log_format = lookup(LOG_FORMAT_ENV)
            .map(|raw| LogFormat::parse(&raw))
            .unwrap_or_default();

        Ok(Self {
            domain,
            audience,
            roles_claim,
            bind_addr,
            log_format,
        })
    }

    /// Token issuer for this tenant (note the trailing slash Auth0 uses).
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.domain)
    }

    pub fn jwks_url(&self) -> String {
        format!("https://{}/.well-known/jwks.json", self.domain)
    }
}

/// Implicit-flow client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub domain: String,
    pub client_id: String,
    pub callback_url: Url,
    pub audience: String,
    pub scopes: String,
    pub logout_return_to: String,
}

impl ClientConfig {
    /// Load client configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let domain = required(&lookup, AUTH0_DOMAIN_ENV)?;
        let client_id = required(&lookup, AUTH0_CLIENT_ID_ENV)?;
        let callback_url = required(&lookup, AUTH0_CALLBACK_URL_ENV)?;
        let callback_url = Url::parse(&callback_url).map_err(|e| ConfigError::Invalid {
            name: AUTH0_CALLBACK_URL_ENV,
            reason: e.to_string(),
        })?;
        let audience = required(&lookup, AUTH0_AUDIENCE_ENV)?;

        Ok(Self {
            domain,
            client_id,
            callback_url,
            audience,
            scopes: lookup(AUTH0_SCOPES_ENV).unwrap_or_else(|| DEFAULT_SCOPES.to_string()),
            logout_return_to: lookup(AUTH0_LOGOUT_RETURN_TO_ENV)
                .unwrap_or_else(|| DEFAULT_LOGOUT_RETURN_TO.to_string()),
        })
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}
