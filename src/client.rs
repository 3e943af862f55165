// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed client for the courses API.
//!
//! Protected calls take the bearer token from the [`SessionManager`], so a
//! signed-out or expired session fails before any request is sent.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::models::{Course, CoursesResponse, MessageResponse};
use crate::session::{SessionError, SessionManager};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Network response was not ok")]
    NotOk(StatusCode),
}

pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { base_url, http })
    }

    pub async fn public_message(&self) -> Result<MessageResponse, ClientError> {
        self.get("/public", None).await
    }

    pub async fn private_message(
        &self,
        session: &SessionManager,
    ) -> Result<MessageResponse, ClientError> {
        let token = session.get_access_token().await?;
        self.get("/private", Some(&token)).await
    }

    /// Requires the `read:courses` scope.
    pub async fn courses(&self, session: &SessionManager) -> Result<Vec<Course>, ClientError> {
        let token = session.get_access_token().await?;
        let response: CoursesResponse = self.get("/course", Some(&token)).await?;
        Ok(response.courses)
    }

    /// Requires the `admin` role.
    pub async fn admin_message(
        &self,
        session: &SessionManager,
    ) -> Result<MessageResponse, ClientError> {
        let token = session.get_access_token().await?;
        self.get("/admin", Some(&token)).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        bearer: Option<&str>,
    ) -> Result<T, ClientError> {
        let mut request = self.http.get(self.base_url.join(path)?);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            debug!(path, status = status.as_u16(), "API call rejected");
            return Err(ClientError::NotOk(status));
        }

        Ok(response.json::<T>().await?)
    }
}
