// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! ## Behaviour
//!
//! - Keys are cached with a configurable TTL (10 minutes by default)
//! - Network lookups are rate limited (5 per minute by default)
//! - An unknown `kid` triggers a refetch, so rotated keys are picked up
//! - A stale cached key is served when a refetch fails or is rate limited
//!
//! ## Usage
//!
//! Build one `JwksManager` from `https://{AUTH0_DOMAIN}/.well-known/jwks.json`
//! in main.rs and store it in `AppState`. The `require_jwt` middleware uses it
//! for every protected request.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::error::AuthError;

/// Default JWKS cache TTL (10 minutes).
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Default budget of network lookups per minute.
const DEFAULT_REQUESTS_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(5) {
    Some(n) => n,
    None => unreachable!(),
};

/// Lookups per minute available to health checks.
const HEALTH_REQUESTS_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(1) {
    Some(n) => n,
    None => unreachable!(),
};

/// JWKS cache entry.
struct CacheEntry {
    jwks: JwkSet,
    fetched_at: Instant,
}

/// JWKS manager with caching and rate limiting.
///
/// Cheap to clone; clones share the cache and the rate limiter.
#[derive(Clone)]
pub struct JwksManager {
    /// JWKS URL (tenant endpoint)
    jwks_url: String,
    /// Cache TTL
    cache_ttl: Duration,
    /// Cached JWKS
    cache: Arc<RwLock<Option<CacheEntry>>>,
    /// Limits how often token verification hits the endpoint
    limiter: Arc<DefaultDirectRateLimiter>,
    /// Separate budget for health checks
    health_limiter: Arc<DefaultDirectRateLimiter>,
    /// HTTP client
    client: reqwest::Client,
}

impl JwksManager {
    /// Create a new JWKS manager.
    ///
    /// # Arguments
    /// - `jwks_url`: The JWKS endpoint URL (e.g., `https://tenant.auth0.com/.well-known/jwks.json`)
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            jwks_url: jwks_url.into(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(
                DEFAULT_REQUESTS_PER_MINUTE,
            ))),
            health_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(
                HEALTH_REQUESTS_PER_MINUTE,
            ))),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create with custom cache TTL.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Create with a custom lookup budget.
    pub fn with_requests_per_minute(mut self, per_minute: NonZeroU32) -> Self {
        self.limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));
        self
    }

    /// Get the JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Fetch JWKS from the endpoint.
    async fn fetch_jwks(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::JwksFetchError(format!(
                "HTTP {} from JWKS endpoint",
                response.status()
            )));
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::JwksFetchError(e.to_string()))?;

        Ok(jwks)
    }

    /// Look up a key in the cache. With `fresh_only`, an expired entry is a miss.
    async fn cached_key(&self, kid: &str, fresh_only: bool) -> Option<Jwk> {
        let cache = self.cache.read().await;
        let entry = cache.as_ref()?;
        if fresh_only && entry.fetched_at.elapsed() >= self.cache_ttl {
            return None;
        }
        entry.jwks.find(kid).cloned()
    }

    /// Get a decoding key for the given key ID.
    pub async fn get_decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
        if let Some(jwk) = self.cached_key(kid, true).await {
            return jwk_to_decoding_key(&jwk);
        }

        debug!(kid, "Signing key not cached, refreshing JWKS");
        if let Err(e) = self.refresh().await {
            if let Some(jwk) = self.cached_key(kid, false).await {
                warn!(kid, error = %e, "JWKS refresh failed, serving stale signing key");
                return jwk_to_decoding_key(&jwk);
            }
            return Err(e);
        }

        let jwk = self
            .cached_key(kid, false)
            .await
            .ok_or(AuthError::NoMatchingKey)?;
        jwk_to_decoding_key(&jwk)
    }

    /// Get the decoding key for a token without `kid`.
    ///
    /// Only unambiguous when the set holds exactly one signing key.
    pub async fn get_any_decoding_key(&self) -> Result<(DecodingKey, Algorithm), AuthError> {
        if !self.is_cached().await {
            self.refresh().await?;
        }

        let cache = self.cache.read().await;
        let entry = cache.as_ref().ok_or(AuthError::NoMatchingKey)?;
        let mut signing = entry.jwks.keys.iter().filter(|k| is_signing_key(k));
        match (signing.next(), signing.next()) {
            (Some(jwk), None) => jwk_to_decoding_key(jwk),
            _ => Err(AuthError::NoMatchingKey),
        }
    }

    /// Force refresh the JWKS cache, subject to the rate limit.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        self.refresh_within(&self.limiter).await
    }

    /// Refresh on behalf of a health check.
    ///
    /// Draws on its own budget, separate from the lookups token
    /// verification needs for key rotation.
    pub async fn warm(&self) -> Result<(), AuthError> {
        self.refresh_within(&self.health_limiter).await
    }

    async fn refresh_within(&self, limiter: &DefaultDirectRateLimiter) -> Result<(), AuthError> {
        if limiter.check().is_err() {
            warn!(url = %self.jwks_url, "JWKS lookup rate limit reached");
            return Err(AuthError::JwksRateLimited);
        }

        let jwks = self.fetch_jwks().await?;
        debug!(keys = jwks.keys.len(), "JWKS refreshed");
        let mut cache = self.cache.write().await;
        *cache = Some(CacheEntry {
            jwks,
            fetched_at: Instant::now(),
        });
        Ok(())
    }

    /// Whether any key set has been fetched, fresh or not.
    pub async fn has_keys(&self) -> bool {
        self.cache.read().await.is_some()
    }

    /// Check if JWKS is currently cached and valid.
    pub async fn is_cached(&self) -> bool {
        let cache = self.cache.read().await;
        if let Some(entry) = &*cache {
            entry.fetched_at.elapsed() < self.cache_ttl
        } else {
            false
        }
    }
}

fn is_signing_key(jwk: &Jwk) -> bool {
    !matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption))
}

/// Convert a JWK to a DecodingKey.
fn jwk_to_decoding_key(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    if !is_signing_key(jwk) {
        return Err(AuthError::NoMatchingKey);
    }

    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => {
            let key = DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| AuthError::InternalError(format!("Failed to create RSA key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::RS384) => Algorithm::RS384,
                Some(KeyAlgorithm::RS512) => Algorithm::RS512,
                _ => Algorithm::RS256,
            };

            Ok((key, alg))
        }
        AlgorithmParameters::EllipticCurve(ec) => {
            let key = DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| AuthError::InternalError(format!("Failed to create EC key: {e}")))?;

            let alg = match jwk.common.key_algorithm {
                Some(KeyAlgorithm::ES384) => Algorithm::ES384,
                _ => Algorithm::ES256,
            };

            Ok((key, alg))
        }
        _ => Err(AuthError::InternalError(
            "Unsupported key type in JWKS".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MODULUS: &str = "m8x_PEm5-l76UL_SiW-iyeRk_7UhUocSAqq43aciZCvxVac3rKSSm1uj2GRnzxOP_amxemN6VdfbjqK0yG-tmMtOYOdAFbF-hGUfhI9Twl7-K_mqQ4pURThprogg4Dgxt5FciJCL0fy9qSFEm1lRtsDoo6FA1HnfCmwsl8Wi3aqd_03piRYapfY-tfuuRa4Bl9b01d0y9NHPbftxezfFxyhpP2Lb5ZyvPomkOAqaOrIN0-7KMIdKlQg-Yc7W3E_eZKlVVVk0hOUaSEXoio2fFYBZ7vN--7hgP6Ak7jundn8uTW5Aft2hmfBTEwIUY6BFKXOzXe8EvRqp1vbdIYEKFQ";

    fn rsa_jwk(kid: &str, key_use: &str) -> Jwk {
        serde_json::from_value(serde_json::json!({
            "kty": "RSA",
            "use": key_use,
            "kid": kid,
            "alg": "RS256",
            "n": TEST_MODULUS,
            "e": "AQAB"
        }))
        .unwrap()
    }

    #[test]
    fn jwks_manager_creation() {
        let manager = JwksManager::new("https://tenant.auth0.com/.well-known/jwks.json");
        assert_eq!(
            manager.jwks_url(),
            "https://tenant.auth0.com/.well-known/jwks.json"
        );
        assert_eq!(manager.cache_ttl, DEFAULT_CACHE_TTL);
    }

    #[test]
    fn custom_cache_ttl() {
        let manager = JwksManager::new("https://example.com/.well-known/jwks.json")
            .with_cache_ttl(Duration::from_secs(60));
        assert_eq!(manager.cache_ttl, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn cache_initially_empty() {
        let manager = JwksManager::new("https://example.com/.well-known/jwks.json");
        assert!(!manager.is_cached().await);
    }

    #[test]
    fn rsa_signing_key_converts_to_rs256() {
        let (_, alg) = jwk_to_decoding_key(&rsa_jwk("k1", "sig")).unwrap();
        assert_eq!(alg, Algorithm::RS256);
    }

    #[test]
    fn encryption_keys_are_rejected() {
        let result = jwk_to_decoding_key(&rsa_jwk("k1", "enc"));
        assert!(matches!(result, Err(AuthError::NoMatchingKey)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_fetch_error() {
        let manager = JwksManager::new("http://127.0.0.1:9/.well-known/jwks.json");
        let result = manager.get_decoding_key("k1").await;
        assert!(matches!(result, Err(AuthError::JwksFetchError(_))));
    }

    #[tokio::test]
    async fn exhausted_budget_reports_rate_limited() {
        let manager = JwksManager::new("http://127.0.0.1:9/.well-known/jwks.json")
            .with_requests_per_minute(NonZeroU32::new(1).unwrap());

        let first = manager.refresh().await;
        assert!(matches!(first, Err(AuthError::JwksFetchError(_))));

        let second = manager.refresh().await;
        assert!(matches!(second, Err(AuthError::JwksRateLimited)));
    }
}
