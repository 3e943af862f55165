// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{authorize, require_jwt, Requirement, ADMIN_ROLE},
    error::ApiError,
    models::{Course, CoursesResponse, MessageResponse},
    state::AppState,
};

pub mod courses;
pub mod health;
pub mod messages;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/private", get(messages::private))
        .route(
            "/course",
            get(courses::list_courses).route_layer(middleware::from_fn_with_state(
                Requirement::scopes([courses::READ_COURSES_SCOPE]),
                authorize,
            )),
        )
        .route(
            "/admin",
            get(messages::admin).route_layer(middleware::from_fn_with_state(
                Requirement::role(ADMIN_ROLE),
                authorize,
            )),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_jwt));

    let api_routes = Router::new()
        .route("/public", get(messages::public))
        .route("/health", get(health::health))
        .merge(protected)
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

async fn not_found() -> ApiError {
    ApiError::not_found("No route matches this path")
}

#[derive(OpenApi)]
#[openapi(
    paths(
        messages::public,
        messages::private,
        messages::admin,
        courses::list_courses,
        health::health
    ),
    components(
        schemas(
            MessageResponse,
            Course,
            CoursesResponse,
            health::ReadyResponse,
            health::HealthChecks
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Messages", description = "Greetings at each protection level"),
        (name = "Courses", description = "Scope-protected course catalogue"),
        (name = "Health", description = "Service health")
    )
)]
struct ApiDoc;

/// Registers the `bearer` JWT security scheme referenced by protected paths.
struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::extractor::tests::{create_test_jwt, create_test_state, user_jwt};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    async fn get(path: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(path);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        router(create_test_state())
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(AppState::default());
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn public_needs_no_token() {
        let response = get("/public", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({"message": "Hello from a public API"})
        );
    }

    #[tokio::test]
    async fn responses_carry_request_id() {
        let response = get("/public", None).await;
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn private_rejects_missing_token() {
        let response = get("/private", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "missing_auth_header");
    }

    #[tokio::test]
    async fn private_rejects_malformed_token() {
        let response = get("/private", Some("not-a-jwt")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "malformed_token");
    }

    #[tokio::test]
    async fn private_accepts_valid_token() {
        let token = user_jwt("auth0|user_123", "openid", &[]);
        let response = get("/private", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "Hello from a private API");
    }

    #[tokio::test]
    async fn course_requires_read_courses_scope() {
        let token = user_jwt("auth0|user_123", "openid profile", &[]);
        let response = get("/course", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["error_code"], "insufficient_scope");
    }

    #[tokio::test]
    async fn course_lists_catalogue_with_scope() {
        let token = user_jwt("auth0|user_123", "openid read:courses", &[]);
        let response = get("/course", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let courses = body["courses"].as_array().unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0]["id"], 1);
        assert_eq!(courses[0]["title"], "Building Apps with React and Redux");
    }

    #[tokio::test]
    async fn course_rejects_token_before_scope_check() {
        let response = get("/course", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_requires_admin_role() {
        let token = user_jwt("auth0|user_123", "openid read:courses", &["editor"]);
        let response = get("/admin", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error_code"], "insufficient_role");
    }

    #[tokio::test]
    async fn admin_allows_admin_role() {
        let token = user_jwt("auth0|admin_1", "openid", &["admin"]);
        let response = get("/admin", Some(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["message"], "Hello from an admin API");
    }

    #[tokio::test]
    async fn expired_token_is_rejected_on_every_protected_route() {
        let token = create_test_jwt(serde_json::json!({
            "sub": "auth0|user_123",
            "exp": 1609459200,
            "iss": "test",
            "scope": "read:courses",
            "http://localhost:3000/roles": ["admin"],
        }));
        for path in ["/private", "/course", "/admin"] {
            let response = get(path, Some(&token)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{path}");
            assert_eq!(json_body(response).await["error_code"], "token_expired");
        }
    }

    #[tokio::test]
    async fn unknown_path_returns_json_404() {
        let response = get("/courses", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "No route matches this path");
    }

    #[tokio::test]
    async fn health_is_ok_without_jwks() {
        let response = get("/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["checks"].get("jwks").is_none());
    }

    #[test]
    fn openapi_documents_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(doc.paths.paths.contains_key("/course"));
    }
}
