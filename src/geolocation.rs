//! Source IP geolocation for event enrichment.
//!
//! Lookups go through a bounded LRU cache owned by the locator. Every answer,
//! including the "Unknown" fallback after a failed lookup, is cached, so a
//! given address costs at most one outbound request while it stays resident.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GeoConfig;
use crate::lock_utils::lock_or_recover;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub country: String,
    pub city: String,
    pub isp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl GeoInfo {
    pub fn local() -> Self {
        Self {
            country: "Local Network".to_string(),
            city: "N/A".to_string(),
            isp: "Private Network".to_string(),
            lat: None,
            lon: None,
        }
    }

    pub fn unknown() -> Self {
        Self {
            country: "Unknown".to_string(),
            city: "Unknown".to_string(),
            isp: "Unknown".to_string(),
            lat: None,
            lon: None,
        }
    }
}

/// Subset of the ip-api.com response
#[derive(Debug, Deserialize)]
struct LookupResponse {
    country: Option<String>,
    city: Option<String>,
    isp: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

impl From<LookupResponse> for GeoInfo {
    fn from(r: LookupResponse) -> Self {
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| "Unknown".to_string());
        Self {
            country: or_unknown(r.country),
            city: or_unknown(r.city),
            isp: or_unknown(r.isp),
            lat: r.lat,
            lon: r.lon,
        }
    }
}

/// Addresses that are never looked up remotely
pub fn is_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

pub struct GeoLocator {
    enabled: bool,
    endpoint: String,
    client: reqwest::Client,
    cache: Mutex<LruCache<IpAddr, GeoInfo>>,
}

impl GeoLocator {
    pub fn new(config: &GeoConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client for geolocation: {}", e);
                reqwest::Client::new()
            });

        Self {
            enabled: config.enabled,
            endpoint: config.endpoint.clone(),
            client,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Locator that never touches the network
    pub fn disabled() -> Self {
        Self::new(&GeoConfig {
            enabled: false,
            ..GeoConfig::default()
        })
    }

    pub async fn locate(&self, ip: IpAddr) -> GeoInfo {
        if !self.enabled {
            return GeoInfo::unknown();
        }

        let cached = lock_or_recover(&self.cache, "geolocation cache")
            .get(&ip)
            .cloned();
        if let Some(hit) = cached {
            return hit;
        }

        let info = if is_local(&ip) {
            GeoInfo::local()
        } else {
            self.lookup(ip).await
        };

        lock_or_recover(&self.cache, "geolocation cache").put(ip, info.clone());
        info
    }

    pub fn cached(&self) -> usize {
        lock_or_recover(&self.cache, "geolocation cache").len()
    }

    async fn lookup(&self, ip: IpAddr) -> GeoInfo {
        let url = format!("{}{}", self.endpoint, ip);
        let response = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!("Geolocation lookup for {} returned {}", ip, r.status());
                return GeoInfo::unknown();
            }
            Err(e) => {
                warn!("Geolocation error for {}: {}", ip, e);
                return GeoInfo::unknown();
            }
        };

        match response.json::<LookupResponse>().await {
            Ok(body) => body.into(),
            Err(e) => {
                warn!("Malformed geolocation response for {}: {}", ip, e);
                GeoInfo::unknown()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ranges() {
        for ip in ["127.0.0.1", "10.1.2.3", "192.168.0.1", "172.16.5.5", "169.254.1.1", "::1", "fd00::1", "fe80::1"] {
            assert!(is_local(&ip.parse().unwrap()), "{} should be local", ip);
        }
        for ip in ["8.8.8.8", "172.32.0.1", "2001:4860::8888"] {
            assert!(!is_local(&ip.parse().unwrap()), "{} should be public", ip);
        }
    }

    #[tokio::test]
    async fn test_private_address_resolves_locally() {
        let locator = GeoLocator::new(&GeoConfig::default());
        let info = locator.locate("192.168.1.10".parse().unwrap()).await;
        assert_eq!(info, GeoInfo::local());
        assert_eq!(locator.cached(), 1);
    }

    #[tokio::test]
    async fn test_disabled_locator_returns_unknown() {
        let locator = GeoLocator::disabled();
        let info = locator.locate("8.8.8.8".parse().unwrap()).await;
        assert_eq!(info, GeoInfo::unknown());
        assert_eq!(locator.cached(), 0);
    }

    #[tokio::test]
    async fn test_failed_lookup_is_cached_as_unknown() {
        // Nothing listens on port 9 of the loopback; the lookup fails fast
        let locator = GeoLocator::new(&GeoConfig {
            endpoint: "http://127.0.0.1:9/json/".to_string(),
            timeout_secs: 1,
            ..GeoConfig::default()
        });
        let ip: IpAddr = "203.0.113.7".parse().unwrap();
        assert_eq!(locator.locate(ip).await, GeoInfo::unknown());
        assert_eq!(locator.cached(), 1);
    }

    #[tokio::test]
    async fn test_cache_is_bounded() {
        let locator = GeoLocator::new(&GeoConfig {
            cache_capacity: 2,
            ..GeoConfig::default()
        });
        for last in 1..=5u8 {
            locator.locate(IpAddr::from([10, 0, 0, last])).await;
        }
        assert_eq!(locator.cached(), 2);
    }

    #[test]
    fn test_geo_info_serialization_skips_missing_coordinates() {
        let json = serde_json::to_value(GeoInfo::local()).unwrap();
        assert_eq!(json["country"], "Local Network");
        assert!(json.get("lat").is_none());
    }
}
