use hyper::StatusCode;

use super::common::{bare, ApacheDefault};
use super::{BrandAttributes, Persona};

/// REST backend behind a stock Apache front page
pub fn persona() -> Persona {
    Persona::new(
        "api",
        BrandAttributes::named("Backend API").with_stack(&["Apache/2.4.41", "Spring Boot"]),
    )
    .extend(ApacheDefault::default().endpoints())
    .endpoint(
        "/api/v1/users",
        bare(
            StatusCode::OK,
            "application/json",
            r#"{"users": [{"id": 1, "name": "admin"}]}"#,
        ),
    )
    .endpoint(
        "/api/auth",
        bare(
            StatusCode::UNAUTHORIZED,
            "application/json",
            r#"{"error": "Invalid API key"}"#,
        ),
    )
    .endpoint(
        "/actuator/health",
        bare(StatusCode::OK, "application/json", r#"{"status":"UP"}"#),
    )
    .endpoint(
        "/swagger-ui.html",
        bare(
            StatusCode::OK,
            "text/html",
            "<html><body><h1>Swagger UI</h1><p>API Documentation</p></body></html>",
        ),
    )
}
