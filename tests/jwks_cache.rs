// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWKS cache behaviour against a mock tenant endpoint.

use std::num::NonZeroU32;
use std::time::Duration;

use courses_auth::auth::{AuthError, JwksManager};
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JWKS_PATH: &str = "/.well-known/jwks.json";

const MODULUS: &str = "m8x_PEm5-l76UL_SiW-iyeRk_7UhUocSAqq43aciZCvxVac3rKSSm1uj2GRnzxOP_amxemN6VdfbjqK0yG-tmMtOYOdAFbF-hGUfhI9Twl7-K_mqQ4pURThprogg4Dgxt5FciJCL0fy9qSFEm1lRtsDoo6FA1HnfCmwsl8Wi3aqd_03piRYapfY-tfuuRa4Bl9b01d0y9NHPbftxezfFxyhpP2Lb5ZyvPomkOAqaOrIN0-7KMIdKlQg-Yc7W3E_eZKlVVVk0hOUaSEXoio2fFYBZ7vN--7hgP6Ak7jundn8uTW5Aft2hmfBTEwIUY6BFKXOzXe8EvRqp1vbdIYEKFQ";

fn key(kid: &str) -> Value {
    json!({"kty": "RSA", "use": "sig", "alg": "RS256", "kid": kid, "n": MODULUS, "e": "AQAB"})
}

fn key_set(kids: &[&str]) -> ResponseTemplate {
    let keys: Vec<Value> = kids.iter().map(|kid| key(kid)).collect();
    ResponseTemplate::new(200).set_body_json(json!({ "keys": keys }))
}

fn manager(server: &MockServer) -> JwksManager {
    JwksManager::new(format!("{}{JWKS_PATH}", server.uri()))
}

#[tokio::test]
async fn fetches_once_and_serves_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(key_set(&["k1"]))
        .expect(1)
        .mount(&server)
        .await;

    let jwks = manager(&server);
    assert!(!jwks.is_cached().await);

    let (_, alg) = jwks.get_decoding_key("k1").await.unwrap();
    assert_eq!(alg, Algorithm::RS256);
    assert!(jwks.is_cached().await);

    jwks.get_decoding_key("k1").await.unwrap();
    jwks.get_decoding_key("k1").await.unwrap();
}

#[tokio::test]
async fn unknown_kid_refetches_for_rotated_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(key_set(&["k1"]))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(key_set(&["k1", "k2"]))
        .expect(1)
        .mount(&server)
        .await;

    let jwks = manager(&server);
    jwks.get_decoding_key("k1").await.unwrap();
    jwks.get_decoding_key("k2").await.unwrap();
}

#[tokio::test]
async fn lookups_are_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(key_set(&["k1"]))
        .expect(2)
        .mount(&server)
        .await;

    let jwks = manager(&server).with_requests_per_minute(NonZeroU32::new(2).unwrap());

    jwks.get_decoding_key("k1").await.unwrap();
    assert!(matches!(
        jwks.get_decoding_key("unknown").await,
        Err(AuthError::NoMatchingKey)
    ));
    assert!(matches!(
        jwks.get_decoding_key("unknown").await,
        Err(AuthError::JwksRateLimited)
    ));

    // Known keys keep working while the budget is exhausted.
    jwks.get_decoding_key("k1").await.unwrap();
}

#[tokio::test]
async fn stale_key_is_served_when_refresh_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(key_set(&["k1"]))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let jwks = manager(&server).with_cache_ttl(Duration::ZERO);

    jwks.get_decoding_key("k1").await.unwrap();
    assert!(!jwks.is_cached().await);
    jwks.get_decoding_key("k1").await.unwrap();

    assert!(matches!(
        jwks.get_decoding_key("k2").await,
        Err(AuthError::JwksFetchError(_))
    ));
}

#[tokio::test]
async fn fetch_failure_without_cache_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(matches!(
        manager(&server).get_decoding_key("k1").await,
        Err(AuthError::JwksFetchError(_))
    ));
}

#[tokio::test]
async fn token_without_kid_needs_a_single_signing_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [
                key("k1"),
                {"kty": "RSA", "use": "enc", "kid": "k-enc", "n": MODULUS, "e": "AQAB"}
            ]
        })))
        .mount(&server)
        .await;

    let jwks = manager(&server);
    jwks.get_any_decoding_key().await.unwrap();
    assert!(matches!(
        jwks.get_decoding_key("k-enc").await,
        Err(AuthError::NoMatchingKey)
    ));
}

#[tokio::test]
async fn token_without_kid_is_ambiguous_with_several_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(key_set(&["k1", "k2"]))
        .mount(&server)
        .await;

    assert!(matches!(
        manager(&server).get_any_decoding_key().await,
        Err(AuthError::NoMatchingKey)
    ));
}

#[tokio::test]
async fn health_refreshes_use_a_separate_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(key_set(&["k1"]))
        .expect(2)
        .mount(&server)
        .await;

    let jwks = manager(&server).with_requests_per_minute(NonZeroU32::new(1).unwrap());

    jwks.warm().await.unwrap();
    assert!(jwks.has_keys().await);
    assert!(matches!(jwks.warm().await, Err(AuthError::JwksRateLimited)));

    // Verification still has its own lookup for the rotated key.
    assert!(matches!(
        jwks.get_decoding_key("rotated").await,
        Err(AuthError::NoMatchingKey)
    ));
    assert!(matches!(
        jwks.get_decoding_key("rotated").await,
        Err(AuthError::JwksRateLimited)
    ));
}
