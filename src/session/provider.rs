// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity provider seam and the Auth0 implementation.
//!
//! The session manager only talks to the provider through
//! [`IdentityProvider`]: building the hosted login and logout URLs, silent
//! re-authentication, and the `/userinfo` lookup.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::LOCATION, redirect, StatusCode};
use tracing::debug;
use url::Url;

use super::callback::{AuthResponse, AuthResult, CallbackError};
use super::profile::UserProfile;
use crate::config::ClientConfig;

/// Implicit-flow response type: access token plus ID token.
const RESPONSE_TYPE: &str = "token id_token";

/// Parameters of one authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeRequest {
    pub state: String,
    pub nonce: String,
    pub scope: String,
    /// Ask the provider not to show any UI (silent renewal).
    pub prompt_none: bool,
}

impl AuthorizeRequest {
    /// A request with fresh random `state` and `nonce`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            state: uuid::Uuid::new_v4().simple().to_string(),
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            scope: scope.into(),
            prompt_none: false,
        }
    }

    pub fn silent(mut self) -> Self {
        self.prompt_none = true;
        self
    }
}

/// Provider interaction failures.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("invalid provider domain: {0}")]
    InvalidDomain(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned HTTP {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Callback(#[from] CallbackError),
    #[error("silent authentication did not redirect back")]
    NoRedirect,
    #[error("invalid redirect location: {0}")]
    InvalidRedirect(String),
    #[error("state returned by the provider does not match the request")]
    StateMismatch,
}

/// Operations the session manager needs from an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Hosted login page URL for `request`.
    fn authorize_url(&self, request: &AuthorizeRequest) -> Url;

    /// Re-authenticate without user interaction.
    async fn renew(&self, request: &AuthorizeRequest) -> Result<AuthResult, ProviderError>;

    /// Fetch the profile of the user owning `access_token`.
    async fn user_info(&self, access_token: &str) -> Result<UserProfile, ProviderError>;

    /// Provider logout URL that returns the browser to the app afterwards.
    fn logout_url(&self) -> Url;
}

/// Auth0 tenant endpoints.
pub struct Auth0Provider {
    base_url: Url,
    client_id: String,
    redirect_uri: Url,
    audience: String,
    logout_return_to: String,
    http: reqwest::Client,
}

impl Auth0Provider {
    /// Create a provider for `https://{domain}`.
    pub fn new(config: &ClientConfig) -> Result<Self, ProviderError> {
        let base_url = Url::parse(&format!("https://{}/", config.domain))
            .map_err(|e| ProviderError::InvalidDomain(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            base_url,
            client_id: config.client_id.clone(),
            redirect_uri: config.callback_url.clone(),
            audience: config.audience.clone(),
            logout_return_to: config.logout_return_to.clone(),
            http,
        })
    }

    /// Point at a different origin (e.g. a custom domain or a test server).
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

#[async_trait]
impl IdentityProvider for Auth0Provider {
    fn authorize_url(&self, request: &AuthorizeRequest) -> Url {
        let mut url = self.endpoint("/authorize");
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.client_id)
                .append_pair("response_type", RESPONSE_TYPE)
                .append_pair("redirect_uri", self.redirect_uri.as_str())
                .append_pair("audience", &self.audience)
                .append_pair("scope", &request.scope)
                .append_pair("state", &request.state)
                .append_pair("nonce", &request.nonce);
            if request.prompt_none {
                query.append_pair("prompt", "none");
            }
        }
        url
    }

    async fn renew(&self, request: &AuthorizeRequest) -> Result<AuthResult, ProviderError> {
        let authorize = self.authorize_url(request);
        let response = self.http.get(authorize.clone()).send().await?;

        if !response.status().is_redirection() {
            return Err(ProviderError::Status(response.status()));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .ok_or(ProviderError::NoRedirect)?
            .to_str()
            .map_err(|e| ProviderError::InvalidRedirect(e.to_string()))?;
        let redirect = authorize
            .join(location)
            .map_err(|e| ProviderError::InvalidRedirect(e.to_string()))?;
        debug!(path = %redirect.path(), "Silent authentication redirected back");

        let callback = AuthResponse::from_redirect_url(&redirect)?;
        if callback.error.is_none() && callback.state.as_deref() != Some(request.state.as_str()) {
            return Err(ProviderError::StateMismatch);
        }

        let result = callback.into_result()?;
        result.check_nonce(&request.nonce)?;
        Ok(result)
    }

    async fn user_info(&self, access_token: &str) -> Result<UserProfile, ProviderError> {
        let response = self
            .http
            .get(self.endpoint("/userinfo"))
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        Ok(response.json::<UserProfile>().await?)
    }

    fn logout_url(&self) -> Url {
        let mut url = self.endpoint("/v2/logout");
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("returnTo", &self.logout_return_to);
        url
    }
}
