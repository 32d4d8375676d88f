//! Loopback-only management API for browsing captured events.

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::router::Router;

pub struct ManagementApi {
    router: Arc<Router>,
    log_root: PathBuf,
}

impl ManagementApi {
    pub fn new(router: Arc<Router>, log_root: impl Into<PathBuf>) -> Self {
        Self {
            router,
            log_root: log_root.into(),
        }
    }

    pub async fn serve(self: Arc<Self>, addr: SocketAddr) -> anyhow::Result<()> {
        let make_svc = make_service_fn(move |_conn| {
            let api = Arc::clone(&self);
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let api = Arc::clone(&api);
                    async move { api.handle_request(req).await }
                }))
            }
        });

        let server = Server::try_bind(&addr)?.serve(make_svc);
        info!("Management API listening on http://{}", addr);
        server.await?;
        Ok(())
    }

    pub async fn handle_request(&self, req: Request<Body>) -> Result<Response<Body>, Infallible> {
        if req.method() != Method::GET {
            return Ok(error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"));
        }

        let query: HashMap<String, String> = req
            .uri()
            .query()
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        let response = match req.uri().path() {
            "/api/status" => json_response(
                StatusCode::OK,
                &json!({"status": "active", "module": "ManagementAPI"}),
            ),
            "/api/endpoints" => json_response(
                StatusCode::OK,
                &json!({
                    "profile": self.router.filter().active(),
                    "endpoints": self.router.visible_paths(),
                }),
            ),
            "/logs/list" => self.list_logs().await,
            "/logs/view" => {
                self.view_log(
                    query.get("date").map(String::as_str),
                    query.get("file").map(String::as_str),
                )
                .await
            }
            _ => error_response(StatusCode::NOT_FOUND, "Not Found"),
        };
        Ok(response)
    }

    async fn list_logs(&self) -> Response<Body> {
        let mut structure: BTreeMap<String, Vec<String>> = BTreeMap::new();

        let Ok(mut dates) = tokio::fs::read_dir(&self.log_root).await else {
            return json_response(StatusCode::OK, &json!(structure));
        };
        while let Ok(Some(date)) = dates.next_entry().await {
            if !date.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let mut files = Vec::new();
            if let Ok(mut entries) = tokio::fs::read_dir(date.path()).await {
                while let Ok(Some(entry)) = entries.next_entry().await {
                    files.push(entry.file_name().to_string_lossy().into_owned());
                }
            }
            files.sort();
            structure.insert(date.file_name().to_string_lossy().into_owned(), files);
        }

        json_response(StatusCode::OK, &json!(structure))
    }

    async fn view_log(&self, date: Option<&str>, file: Option<&str>) -> Response<Body> {
        let (Some(date), Some(file)) = (date.filter(|d| !d.is_empty()), file.filter(|f| !f.is_empty())) else {
            return error_response(StatusCode::BAD_REQUEST, "Missing 'date' or 'file' params");
        };

        if !stays_inside(date) || !stays_inside(file) {
            warn!("Management API rejected log path {}/{}", date, file);
            return error_response(StatusCode::FORBIDDEN, "Access Denied");
        }

        let path = self.log_root.join(date).join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => json_response(
                StatusCode::OK,
                &json!({
                    "date": date,
                    "file": file,
                    "content": String::from_utf8_lossy(&bytes),
                }),
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error_response(StatusCode::NOT_FOUND, "Log file not found")
            }
            Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
        }
    }
}

/// Relative path made only of plain components
fn stays_inside(segment: &str) -> bool {
    Path::new(segment)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

fn json_response(status: StatusCode, value: &serde_json::Value) -> Response<Body> {
    let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    json_response(status, &json!({"error": message, "code": status.as_u16()}))
}
