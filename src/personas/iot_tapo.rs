//! Tapo C200 camera: the embedded web server answers everything with a JSON
//! error code.

use hyper::StatusCode;

use super::{fixed, BrandAttributes, Persona};
use crate::artifact::Artifact;

fn tapo_error(status: StatusCode, error_code: i32) -> Artifact {
    let body = format!("{{\"error_code\": {}}}", error_code);
    Artifact::new(status)
        .header("Connection", "close")
        .header("Cache-Control", "no-cache")
        .header("Content-Type", "application/json;charset=UTF-8")
        .body(body)
        .with_content_length()
}

pub fn persona() -> Persona {
    let brand = BrandAttributes {
        name: "TP-Link".to_string(),
        tech_stack: Vec::new(),
        model: Some("Tapo C200".to_string()),
        firmware: None,
    };
    let not_found = tapo_error(StatusCode::NOT_FOUND, -40405);

    Persona::new("iot_tapo", brand)
        .endpoint("/", fixed(tapo_error(StatusCode::METHOD_NOT_ALLOWED, -40401)))
        .endpoint("/admin", fixed(not_found.clone()))
        .endpoint("/login", fixed(not_found.clone()))
        .endpoint("/config", fixed(not_found.clone()))
        .endpoint("/favicon.ico", fixed(not_found))
}
