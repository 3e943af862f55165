// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-side session state machine.
//!
//! ```text
//! Anonymous --login--> Authenticating --callback--> Authenticated
//!     ^                      |                        |      ^
//!     |      error / mismatch|             expiry     |      | silent renewal
//!     +----------------------+         Expired <------+------+
//!     +------------------------ logout -------------------------+
//! ```
//!
//! Credentials live in memory only. Each successful login or renewal
//! schedules exactly one renewal task, tied to a [`CancellationToken`] that
//! is cancelled when the credentials are replaced, on logout, and when the
//! manager is dropped.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, Weak,
};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::callback::{AuthResponse, AuthResult, CallbackError, IdTokenClaims};
use super::clock::{Clock, SystemClock};
use super::guard::{decide, GuardDecision, Navigation, SessionSnapshot};
use super::profile::UserProfile;
use super::provider::{Auth0Provider, AuthorizeRequest, IdentityProvider, ProviderError};
use crate::config::ClientConfig;
use crate::scope::ScopeSet;

/// Return location used when a callback arrives without a recorded one.
const DEFAULT_RETURN_TO: &str = "/";

/// Session failures surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The provider answered the login with an explicit error.
    #[error("Error: {error}{}", .description.as_ref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Authorization {
        error: String,
        description: Option<String>,
    },
    #[error("login callback did not contain both an access token and an ID token")]
    MissingTokens,
    #[error("invalid login callback: {0}")]
    InvalidCallback(String),
    /// The callback does not answer the login this manager started.
    #[error("login callback state does not match the pending login")]
    StateMismatch,
    /// The ID token was issued for a different login.
    #[error("ID token nonce does not match the pending login")]
    NonceMismatch,
    #[error("No access token found")]
    NoAccessToken,
    #[error("Access token has expired")]
    TokenExpired,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<CallbackError> for SessionError {
    fn from(err: CallbackError) -> Self {
        match err {
            CallbackError::Authorization { error, description } => {
                SessionError::Authorization { error, description }
            }
            CallbackError::MissingTokens => SessionError::MissingTokens,
            CallbackError::NonceMismatch => SessionError::NonceMismatch,
            err @ CallbackError::InvalidExpiresIn(_) => {
                SessionError::InvalidCallback(err.to_string())
            }
        }
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticating,
    Authenticated,
    /// Credentials are held but past their expiry.
    Expired,
}

struct Credentials {
    access_token: String,
    id_token: String,
    id_token_claims: Option<IdTokenClaims>,
    scopes: ScopeSet,
    expires_at: DateTime<Utc>,
}

struct PendingLogin {
    request: AuthorizeRequest,
    return_to: String,
}

#[derive(Default)]
struct SessionState {
    pending: Option<PendingLogin>,
    credentials: Option<Credentials>,
    profile: Option<UserProfile>,
}

struct Renewal {
    generation: u64,
    cancel: CancellationToken,
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    requested_scopes: String,
    state: RwLock<SessionState>,
    renewal: Mutex<Option<Renewal>>,
    renewals_scheduled: AtomicU64,
}

/// Owns the login session of one user agent.
///
/// Methods that install credentials spawn the renewal task, so they must run
/// inside a tokio runtime.
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>, requested_scopes: impl Into<String>) -> Self {
        Self::with_clock(provider, requested_scopes, Arc::new(SystemClock))
    }

    pub fn with_clock(
        provider: Arc<dyn IdentityProvider>,
        requested_scopes: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                provider,
                clock,
                requested_scopes: requested_scopes.into(),
                state: RwLock::new(SessionState::default()),
                renewal: Mutex::new(None),
                renewals_scheduled: AtomicU64::new(0),
            }),
        }
    }

    /// Session manager talking to the configured Auth0 tenant.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ProviderError> {
        let provider = Auth0Provider::new(config)?;
        Ok(Self::new(Arc::new(provider), config.scopes.clone()))
    }

    /// Start a login and return the hosted login page URL.
    ///
    /// `return_to` is handed back by [`handle_authentication`](Self::handle_authentication)
    /// once the login completes.
    pub async fn login(&self, return_to: impl Into<String>) -> Url {
        let request = AuthorizeRequest::new(self.inner.requested_scopes.clone());
        let url = self.inner.provider.authorize_url(&request);
        let return_to = return_to.into();

        info!(return_to = %return_to, "Starting login");
        self.inner.state.write().await.pending = Some(PendingLogin { request, return_to });
        url
    }

    /// Complete a login from the callback URL fragment.
    ///
    /// Returns the location recorded by [`login`](Self::login). Any failure
    /// leaves the manager without a pending login.
    pub async fn handle_authentication(&self, fragment: &str) -> Result<String, SessionError> {
        let pending = self.inner.state.write().await.pending.take();

        let outcome = AuthResponse::from_fragment(fragment)
            .and_then(AuthResponse::into_result)
            .map_err(SessionError::from)
            .and_then(|result| match &pending {
                Some(login) if result.state.as_deref() == Some(login.request.state.as_str()) => {
                    result.check_nonce(&login.request.nonce)?;
                    Ok(result)
                }
                _ => Err(SessionError::StateMismatch),
            });

        match outcome {
            Ok(result) => {
                self.inner.install(result, None).await;
                Ok(pending
                    .map(|login| login.return_to)
                    .unwrap_or_else(|| DEFAULT_RETURN_TO.to_string()))
            }
            Err(e) => {
                warn!(error = %e, "Login callback rejected");
                Err(e)
            }
        }
    }

    /// Store credentials and schedule their renewal.
    pub async fn set_session(&self, result: AuthResult) -> DateTime<Utc> {
        self.inner
            .install(result, None)
            .await
            .unwrap_or_else(|| self.inner.clock.now())
    }

    /// Drop the session and return the provider logout URL.
    pub async fn logout(&self) -> Url {
        let mut state = self.inner.state.write().await;
        self.inner.cancel_renewal();
        *state = SessionState::default();
        drop(state);
        info!("Session cleared");
        self.inner.provider.logout_url()
    }

    pub async fn is_authenticated(&self) -> bool {
        let now = self.inner.clock.now();
        self.inner
            .state
            .read()
            .await
            .credentials
            .as_ref()
            .is_some_and(|c| now < c.expires_at)
    }

    pub async fn status(&self) -> SessionStatus {
        let now = self.inner.clock.now();
        let state = self.inner.state.read().await;
        match (&state.credentials, &state.pending) {
            (Some(c), _) if now < c.expires_at => SessionStatus::Authenticated,
            (_, Some(_)) => SessionStatus::Authenticating,
            (Some(_), None) => SessionStatus::Expired,
            (None, None) => SessionStatus::Anonymous,
        }
    }

    /// True iff every scope in `scopes` was granted.
    pub async fn user_has_scopes<S: AsRef<str>>(&self, scopes: &[S]) -> bool {
        self.inner
            .state
            .read()
            .await
            .credentials
            .as_ref()
            .is_some_and(|c| c.scopes.contains_all(scopes))
    }

    /// The current access token, if it has not expired.
    pub async fn get_access_token(&self) -> Result<String, SessionError> {
        let now = self.inner.clock.now();
        let state = self.inner.state.read().await;
        let credentials = state
            .credentials
            .as_ref()
            .ok_or(SessionError::NoAccessToken)?;
        if now >= credentials.expires_at {
            return Err(SessionError::TokenExpired);
        }
        Ok(credentials.access_token.clone())
    }

    pub async fn id_token(&self) -> Option<String> {
        let state = self.inner.state.read().await;
        state.credentials.as_ref().map(|c| c.id_token.clone())
    }

    /// Unverified claims of the current ID token.
    pub async fn id_token_claims(&self) -> Option<IdTokenClaims> {
        let state = self.inner.state.read().await;
        state
            .credentials
            .as_ref()
            .and_then(|c| c.id_token_claims.clone())
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        let state = self.inner.state.read().await;
        state.credentials.as_ref().map(|c| c.expires_at)
    }

    pub async fn granted_scopes(&self) -> ScopeSet {
        let state = self.inner.state.read().await;
        state
            .credentials
            .as_ref()
            .map(|c| c.scopes.clone())
            .unwrap_or_default()
    }

    /// The user's profile, fetched once per session.
    pub async fn get_profile(&self) -> Result<UserProfile, SessionError> {
        if let Some(profile) = self.inner.state.read().await.profile.clone() {
            return Ok(profile);
        }

        let access_token = self.get_access_token().await?;
        let profile = self.inner.provider.user_info(&access_token).await?;

        let mut state = self.inner.state.write().await;
        // A logout or renewal may have happened while the request was out.
        if state
            .credentials
            .as_ref()
            .is_some_and(|c| c.access_token == access_token)
        {
            state.profile = Some(profile.clone());
        }
        Ok(profile)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let now = self.inner.clock.now();
        let state = self.inner.state.read().await;
        match &state.credentials {
            Some(c) if now < c.expires_at => SessionSnapshot {
                authenticated: true,
                scopes: c.scopes.clone(),
            },
            _ => SessionSnapshot::default(),
        }
    }

    /// Decide whether `target` may be shown, starting a login when needed.
    pub async fn guard<S: AsRef<str>>(&self, target: &str, required: &[S]) -> Navigation {
        match decide(&self.snapshot().await, required) {
            GuardDecision::Allow => Navigation::Render,
            GuardDecision::Unauthorized { message, .. } => Navigation::Denied(message),
            GuardDecision::Login => Navigation::Redirect(self.login(target).await),
        }
    }

    /// Number of renewal tasks scheduled over the manager's lifetime.
    pub fn renewals_scheduled(&self) -> u64 {
        self.inner.renewals_scheduled.load(Ordering::SeqCst)
    }

    /// Whether a renewal task is currently waiting or running.
    pub fn renewal_pending(&self) -> bool {
        self.inner.renewal_slot().is_some()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.inner.cancel_renewal();
    }
}

impl Inner {
    fn renewal_slot(&self) -> std::sync::MutexGuard<'_, Option<Renewal>> {
        self.renewal.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancel_renewal(&self) {
        if let Some(renewal) = self.renewal_slot().take() {
            renewal.cancel.cancel();
        }
    }

    /// Store `result` and schedule its renewal.
    ///
    /// `renewal` is the token of the renewal task delivering `result`; once it
    /// is cancelled the result is stale and nothing is written.
    async fn install(
        self: &Arc<Self>,
        result: AuthResult,
        renewal: Option<&CancellationToken>,
    ) -> Option<DateTime<Utc>> {
        let now = self.clock.now();
        let lifetime = i64::try_from(result.expires_in)
            .ok()
            .and_then(|secs| secs.checked_mul(1000))
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX);
        let expires_at = now
            .checked_add_signed(lifetime)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let scopes = ScopeSet::parse(
            result
                .scope
                .as_deref()
                .unwrap_or(self.requested_scopes.as_str()),
        );
        let id_token_claims = result.id_token_claims();

        let mut state = self.state.write().await;
        if renewal.is_some_and(CancellationToken::is_cancelled) {
            debug!("Discarding renewal result for a replaced session");
            return None;
        }

        info!(expires_at = %expires_at, scopes = %scopes, "Session established");
        state.credentials = Some(Credentials {
            access_token: result.access_token,
            id_token: result.id_token,
            id_token_claims,
            scopes,
            expires_at,
        });
        // Under the lock: logout cancels whatever task is registered here.
        self.schedule_renewal(expires_at - now);
        Some(expires_at)
    }

    fn schedule_renewal(self: &Arc<Self>, delay: TimeDelta) {
        let generation = self.renewals_scheduled.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();

        if let Some(previous) = self.renewal_slot().replace(Renewal {
            generation,
            cancel: cancel.clone(),
        }) {
            previous.cancel.cancel();
        }

        let delay = delay.to_std().unwrap_or_default();
        debug!(generation, delay_ms = delay.as_millis() as u64, "Renewal scheduled");

        let inner = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            Inner::renew(inner, generation, cancel).await;
        });
    }

    async fn renew(inner: Weak<Self>, generation: u64, cancel: CancellationToken) {
        let Some(inner) = inner.upgrade() else {
            return;
        };

        let request = AuthorizeRequest::new(inner.requested_scopes.clone()).silent();
        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(generation, "Renewal cancelled");
                return;
            }
            outcome = inner.provider.renew(&request) => outcome,
        };

        match outcome {
            Ok(result) => {
                if inner.install(result, Some(&cancel)).await.is_some() {
                    info!(generation, "Silent renewal succeeded");
                }
            }
            Err(e) => {
                let mut slot = inner.renewal_slot();
                if slot.as_ref().is_some_and(|r| r.generation == generation) {
                    *slot = None;
                }
                drop(slot);
                warn!(generation, error = %e, "Silent renewal failed, session will expire");
            }
        }
    }
}
