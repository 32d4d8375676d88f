use hyper::StatusCode;

use super::common::bare;
use super::{BrandAttributes, Persona};

pub fn persona() -> Persona {
    Persona::new(
        "database",
        BrandAttributes::named("Database admin").with_stack(&["phpMyAdmin", "pgAdmin"]),
    )
    .endpoint(
        "/phpmyadmin",
        bare(
            StatusCode::OK,
            "text/html",
            "<html><body><h1>phpMyAdmin</h1><p>Welcome to phpMyAdmin</p></body></html>",
        ),
    )
    .endpoint(
        "/pgadmin",
        bare(
            StatusCode::OK,
            "text/html",
            "<html><body><h1>pgAdmin</h1><p>PostgreSQL Administration</p></body></html>",
        ),
    )
}
