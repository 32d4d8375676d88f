// Library interface for the honeypot node
// Services, personas and detection are exposed for integration tests and benches

pub mod artifact;
pub mod config;
pub mod detection;
pub mod error;
pub mod events;
pub mod freshness;
pub mod geolocation;
pub mod http_service;
pub mod iot_auth;
pub mod listener;
pub mod lock_utils;
pub mod management;
pub mod personas;
pub mod profile_filter;
pub mod router;
pub mod rtsp;
pub mod scanner;
pub mod ssh;
