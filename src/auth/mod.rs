// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Auth0 access-token authentication and authorization for the courses API.
//!
//! ## Auth Flow
//!
//! 1. The SPA logs the user in with Auth0 (implicit flow, see `session`)
//! 2. The SPA sends `Authorization: Bearer <access token>`
//! 3. The server:
//!    - Fetches the tenant JWKS via HTTPS (cached, 5 lookups/minute)
//!    - Verifies the RS256 signature, expiry, issuer, audience
//!    - Extracts:
//!      - `sub` → `user_id`
//!      - `scope` / `permissions` → granted scopes
//!      - the namespaced roles claim → roles
//! 4. Per-route requirements check scopes (403) or roles (401)
//!
//! ## Security
//!
//! - Only RS256 tokens are accepted
//! - Clock skew tolerance is 60 seconds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod jwks;
pub mod middleware;
pub mod roles;

pub use claims::AuthenticatedUser;
pub use error::AuthError;
pub use extractor::Auth;
pub use jwks::JwksManager;
pub use middleware::{authorize, require_jwt, Requirement};
pub use roles::{Roles, ADMIN_ROLE};
