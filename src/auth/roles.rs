// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.
//!
//! Auth0 has no built-in role claim in access tokens; a rule copies the
//! user's roles into a namespaced custom claim (e.g.
//! `http://localhost:3000/roles`). Roles are free-form strings.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Role names the API gates on.
pub const ADMIN_ROLE: &str = "admin";

/// Roles assigned to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct Roles(Vec<String>);

impl Roles {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(roles.into_iter().map(Into::into).collect())
    }

    /// Read roles from the custom claims of a token.
    ///
    /// Accepts either an array of strings or a single string; anything else
    /// yields no roles.
    pub fn from_claims(extra: &HashMap<String, Value>, claim: &str) -> Self {
        match extra.get(claim) {
            Some(Value::Array(values)) => Self(
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect(),
            ),
            Some(Value::String(role)) => Self(vec![role.clone()]),
            _ => Self::default(),
        }
    }

    /// True iff `requested` is one of the assigned roles.
    pub fn has(&self, requested: &str) -> bool {
        self.0.iter().any(|r| r == requested)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}
