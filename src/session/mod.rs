// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client side of the implicit flow.
//!
//! [`SessionManager`] drives the login redirect, parses the callback
//! fragment, keeps the tokens in memory and renews them silently at expiry.
//! [`decide`] is the route guard applied before showing protected pages.

pub mod callback;
pub mod clock;
pub mod guard;
pub mod manager;
pub mod profile;
pub mod provider;

pub use callback::{AuthResponse, AuthResult, CallbackError, IdTokenClaims};
pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{decide, GuardDecision, Navigation, SessionSnapshot};
pub use manager::{SessionError, SessionManager, SessionStatus};
pub use profile::UserProfile;
pub use provider::{Auth0Provider, AuthorizeRequest, IdentityProvider, ProviderError};
