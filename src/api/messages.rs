// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Greeting endpoints: one public, one per protection level.

use axum::Json;
use tracing::debug;

use crate::auth::Auth;
use crate::models::MessageResponse;

pub const PUBLIC_MESSAGE: &str = "Hello from a public API";
pub const PRIVATE_MESSAGE: &str = "Hello from a private API";
pub const ADMIN_MESSAGE: &str = "Hello from an admin API";

/// Public greeting, no authentication.
#[utoipa::path(
    get,
    path = "/public",
    tag = "Messages",
    responses(
        (status = 200, description = "Public greeting", body = MessageResponse),
    )
)]
pub async fn public() -> Json<MessageResponse> {
    Json(MessageResponse::new(PUBLIC_MESSAGE))
}

/// Private greeting, any valid access token.
#[utoipa::path(
    get,
    path = "/private",
    tag = "Messages",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Private greeting", body = MessageResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn private(Auth(user): Auth) -> Json<MessageResponse> {
    debug!(user_id = %user.user_id, "Serving private message");
    Json(MessageResponse::new(PRIVATE_MESSAGE))
}

/// Admin greeting, requires the `admin` role.
#[utoipa::path(
    get,
    path = "/admin",
    tag = "Messages",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Admin greeting", body = MessageResponse),
        (status = 401, description = "Unauthorized - invalid token or missing admin role"),
    )
)]
pub async fn admin(Auth(user): Auth) -> Json<MessageResponse> {
    debug!(user_id = %user.user_id, "Serving admin message");
    Json(MessageResponse::new(ADMIN_MESSAGE))
}
