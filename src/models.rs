// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Response bodies of the REST API. All types derive `Serialize`,
//! `Deserialize`, and `ToSchema` so the same definitions serve the server
//! handlers, the OpenAPI document, and the typed `ApiClient`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Fixed greeting returned by the message endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MessageResponse {
    #[schema(example = "Hello from a public API")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A course visible to users holding `read:courses`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Course {
    pub id: u32,
    #[schema(example = "Building Apps with React and Redux")]
    pub title: String,
}

/// Response for `GET /course`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CoursesResponse {
    pub courses: Vec<Course>,
}
