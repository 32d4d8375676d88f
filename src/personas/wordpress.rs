use hyper::StatusCode;

use super::common::{bare, Corporate};
use super::{BrandAttributes, Persona};

const TECH_STACK: &[&str] = &["Apache/2.4.41", "PHP/7.4", "MySQL/8.0", "WordPress/6.4"];

/// Corporate WordPress site
pub fn persona() -> Persona {
    let site = Corporate {
        brand_name: "TechSolutions Inc.".to_string(),
        domain: "techsolutions.local".to_string(),
        tagline: "Innovation in Technology".to_string(),
        tech_stack: TECH_STACK.iter().map(|s| s.to_string()).collect(),
    };

    Persona::new(
        "wordpress",
        BrandAttributes::named(&site.brand_name).with_stack(TECH_STACK),
    )
    .extend(site.endpoints())
    .endpoint(
        "/wp-admin",
        bare(
            StatusCode::OK,
            "text/html",
            "<html><body><h1>WordPress Admin</h1><!-- Fake WP Login --></body></html>",
        ),
    )
    .endpoint(
        "/wp-login.php",
        bare(
            StatusCode::OK,
            "text/html",
            r#"<html><body><h1>WordPress Login</h1><form name="loginform" action="wp-login.php" method="post"></form></body></html>"#,
        ),
    )
    .endpoint(
        "/xmlrpc.php",
        bare(
            StatusCode::METHOD_NOT_ALLOWED,
            "text/plain",
            "XML-RPC server accepts POST requests only.",
        ),
    )
}
