// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization middleware for Axum.
//!
//! Two layers are stacked on protected routes:
//!
//! 1. `require_jwt` verifies the bearer token and inserts the
//!    `AuthenticatedUser` into request extensions.
//! 2. `authorize` checks a per-route `Requirement` (scopes or a role)
//!    against that user.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route(
//!         "/course",
//!         get(list_courses).route_layer(middleware::from_fn_with_state(
//!             Requirement::scopes(["read:courses"]),
//!             authorize,
//!         )),
//!     )
//!     .route_layer(middleware::from_fn_with_state(state.clone(), require_jwt));
//! ```

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::extractor::{bearer_token, verify_jwt};
use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;

/// Authorization requirement attached to a single route.
#[derive(Debug, Clone)]
pub enum Requirement {
    /// Every listed scope must be granted.
    Scopes(Vec<String>),
    /// The user must hold this role.
    Role(String),
}

impl Requirement {
    pub fn scopes<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Requirement::Scopes(scopes.into_iter().map(Into::into).collect())
    }

    pub fn role(role: impl Into<String>) -> Self {
        Requirement::Role(role.into())
    }

    /// Check the requirement against an authenticated user.
    pub fn check(&self, user: &AuthenticatedUser) -> Result<(), AuthError> {
        match self {
            Requirement::Scopes(required) => {
                let missing = user.scopes.missing(required);
                if missing.is_empty() {
                    Ok(())
                } else {
                    Err(AuthError::InsufficientScope(missing))
                }
            }
            Requirement::Role(role) => {
                if user.has_role(role) {
                    Ok(())
                } else {
                    Err(AuthError::InsufficientRole(role.clone()))
                }
            }
        }
    }
}

/// Verify the bearer token and stash the user for downstream layers.
pub async fn require_jwt(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?;

    let user = verify_jwt(token, &state.auth_config).await.map_err(|e| {
        warn!(
            path = %request.uri().path(),
            error_code = e.error_code(),
            "Rejected bearer token"
        );
        e
    })?;

    debug!(user_id = %user.user_id, "Bearer token verified");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Enforce a `Requirement` for a user already verified by `require_jwt`.
pub async fn authorize(
    State(requirement): State<Requirement>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or(AuthError::MissingAuthHeader)?;

    if let Err(e) = requirement.check(user) {
        warn!(
            user_id = %user.user_id,
            path = %request.uri().path(),
            error_code = e.error_code(),
            "Authorization denied"
        );
        return Err(e);
    }

    Ok(next.run(request).await)
}
