// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Courses Auth - Auth0-protected courses API and its session client
//!
//! The server half verifies Auth0 access tokens and gates routes on scopes
//! and roles. The client half runs the implicit-flow login, holds the
//! session in memory and calls the API with the bearer token.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - JWT verification and scope/role authorization
//! - `session` - Login flow, token lifecycle and route guard
//! - `client` - Typed client for the API routes

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod scope;
pub mod session;
pub mod state;
