// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Course catalogue endpoint.

use axum::Json;

use crate::models::{Course, CoursesResponse};

/// Scope required to list courses.
pub const READ_COURSES_SCOPE: &str = "read:courses";

fn catalogue() -> Vec<Course> {
    vec![
        Course {
            id: 1,
            title: "Building Apps with React and Redux".to_string(),
        },
        Course {
            id: 2,
            title: "Creating Reusable React Components".to_string(),
        },
    ]
}

/// List courses. Requires the `read:courses` scope.
#[utoipa::path(
    get,
    path = "/course",
    tag = "Courses",
    security(("bearer" = ["read:courses"])),
    responses(
        (status = 200, description = "Course list", body = CoursesResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - missing read:courses scope"),
    )
)]
pub async fn list_courses() -> Json<CoursesResponse> {
    Json(CoursesResponse {
        courses: catalogue(),
    })
}
