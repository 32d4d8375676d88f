use hyper::StatusCode;

use super::common::{bare, ApacheDefault};
use super::{BrandAttributes, Persona};

/// Unconfigured Apache box with a couple of admin pages
pub fn persona() -> Persona {
    Persona::new(
        "generic",
        BrandAttributes::named("Apache2 Ubuntu").with_stack(&["Apache/2.4.41", "Ubuntu 20.04 LTS"]),
    )
    .extend(ApacheDefault::default().endpoints())
    .endpoint(
        "/admin",
        bare(
            StatusCode::OK,
            "text/html",
            r#"<html><body><h1>Admin Login</h1><form><input name="user"><input type="password" name="pass"></form></body></html>"#,
        ),
    )
    .endpoint(
        "/login",
        bare(
            StatusCode::OK,
            "text/html",
            r#"<html><body><h1>Login</h1><form action="/auth" method="POST"><input name="username"><input type="password" name="password"></form></body></html>"#,
        ),
    )
    .endpoint(
        "/auth",
        bare(
            StatusCode::OK,
            "text/html",
            r#"<html><body><h1>Login Failed</h1><p>Invalid credentials. Please try again.</p><a href="/login">Back</a></body></html>"#,
        ),
    )
}
