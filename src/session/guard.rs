// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route protection decisions.

use url::Url;

use crate::scope::ScopeSet;

/// What the guard needs to know about the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub scopes: ScopeSet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Start a login, then come back.
    Login,
    /// Signed in, but not allowed to see the page.
    Unauthorized {
        missing: Vec<String>,
        message: String,
    },
    Allow,
}

/// Outcome of [`SessionManager::guard`](super::SessionManager::guard).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Render,
    Redirect(Url),
    Denied(String),
}

/// Decide whether a page requiring `required` scopes may be shown.
///
/// An empty `required` list only asks for a login.
pub fn decide<S: AsRef<str>>(session: &SessionSnapshot, required: &[S]) -> GuardDecision {
    if !session.authenticated {
        return GuardDecision::Login;
    }

    let missing = session.scopes.missing(required);
    if missing.is_empty() {
        return GuardDecision::Allow;
    }

    let wanted = required
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(",");
    GuardDecision::Unauthorized {
        missing,
        message: format!(
            "Unauthorized - You need the following scope(s) to view this page: {wanted}."
        ),
    }
}
