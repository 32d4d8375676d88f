use hyper::StatusCode;

use super::common::bare;
use super::{BrandAttributes, Persona};

/// Leaked deployment configuration
pub fn persona() -> Persona {
    Persona::new(
        "devops",
        BrandAttributes::named("CI host").with_stack(&["Docker", "MySQL"]),
    )
    .endpoint(
        "/.env",
        bare(
            StatusCode::OK,
            "text/plain",
            "DB_HOST=localhost\nDB_USER=root\nDB_PASS=secret123",
        ),
    )
    .endpoint(
        "/docker-compose.yml",
        bare(
            StatusCode::OK,
            "text/yaml",
            "version: \"3\"\nservices:\n  db:\n    image: mysql",
        ),
    )
}
