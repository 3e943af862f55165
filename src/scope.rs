// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Space-delimited OAuth scope sets.
//!
//! Used on both sides of the wire: the server reads the `scope` claim of a
//! verified access token, the session manager stores the scopes granted at
//! login.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A set of granted scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ScopeSet(BTreeSet<String>);

impl ScopeSet {
    /// Parse a space-delimited scope string. Repeated whitespace is ignored.
    pub fn parse(raw: &str) -> Self {
        Self(raw.split_whitespace().map(str::to_owned).collect())
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    /// True iff every requested scope has been granted.
    ///
    /// An empty request is trivially satisfied.
    pub fn contains_all<S: AsRef<str>>(&self, requested: &[S]) -> bool {
        requested.iter().all(|s| self.contains(s.as_ref()))
    }

    /// Requested scopes that have not been granted, in request order.
    pub fn missing<S: AsRef<str>>(&self, requested: &[S]) -> Vec<String> {
        requested
            .iter()
            .map(AsRef::as_ref)
            .filter(|s| !self.contains(s))
            .map(str::to_owned)
            .collect()
    }

    /// Merge additional scopes (e.g. an Auth0 `permissions` array) into the set.
    pub fn extend<I, S>(&mut self, scopes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(scopes.into_iter().map(Into::into));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(" "))
    }
}

impl From<String> for ScopeSet {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<ScopeSet> for String {
    fn from(scopes: ScopeSet) -> Self {
        scopes.to_string()
    }
}
