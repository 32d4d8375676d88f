//! Endpoint router.
//!
//! Resolution order for every request:
//! 1. persona visibility (invisible paths get the generic 404),
//! 2. scanner fingerprint short-circuit,
//! 3. optional Basic-auth gate for router configuration pages,
//! 4. exact match on the normalised path,
//! 5. longest registered prefix followed by `/`,
//! 6. generic 404.
//!
//! Producers run under `catch_unwind`; a panicking producer yields the
//! generic 500 artifact instead of tearing down the connection task.

use chrono::Utc;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::RwLock;
use tracing::{debug, error};

use crate::artifact::{self, Artifact};
use crate::config::Config;
use crate::freshness::{RenderContext, UptimeClock};
use crate::http_service::HttpRequest;
use crate::iot_auth;
use crate::lock_utils::{read_lock_or_recover, write_lock_or_recover};
use crate::personas::{all_personas, Persona, Producer};
use crate::profile_filter::ProfileFilter;
use crate::scanner;

/// Insertion-ordered path -> producer map
#[derive(Clone, Default)]
pub struct EndpointTable {
    entries: Vec<(String, Producer)>,
    index: HashMap<String, usize>,
}

impl EndpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced key keeps its original position
    pub fn insert(&mut self, path: impl Into<String>, producer: Producer) {
        let path = path.into();
        match self.index.get(&path) {
            Some(&i) => self.entries[i].1 = producer,
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, producer));
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&Producer> {
        self.index.get(path).map(|&i| &self.entries[i].1)
    }

    /// Producer of the longest key `k` such that `path` starts with `k + "/"`
    pub fn longest_prefix(&self, path: &str) -> Option<&Producer> {
        self.entries
            .iter()
            .filter(|(key, _)| {
                path.strip_prefix(key.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(key, _)| key.len())
            .map(|(_, producer)| producer)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for EndpointTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.paths()).finish()
    }
}

/// Merge persona fragments in order; later personas win on colliding paths
pub fn build_endpoint_table(personas: Vec<Persona>) -> EndpointTable {
    let mut table = EndpointTable::new();
    for persona in personas {
        debug!(
            "Merging persona '{}' ({} endpoints)",
            persona.name,
            persona.endpoints.len()
        );
        for (path, producer) in persona.endpoints {
            table.insert(path, producer);
        }
    }
    table
}

/// Drop the query string and fragment
pub fn normalize_path(path: &str) -> &str {
    let path = path.split('?').next().unwrap_or(path);
    path.split('#').next().unwrap_or(path)
}

pub struct Router {
    table: RwLock<EndpointTable>,
    filter: ProfileFilter,
    uptime: UptimeClock,
    iot_basic_auth: bool,
}

impl Router {
    pub fn new(table: EndpointTable, filter: ProfileFilter, uptime: UptimeClock) -> Self {
        Self {
            table: RwLock::new(table),
            filter,
            uptime,
            iot_basic_auth: false,
        }
    }

    pub fn with_iot_basic_auth(mut self, enabled: bool) -> Self {
        self.iot_basic_auth = enabled;
        self
    }

    /// All built-in personas, filtered per `config.profile`
    pub fn from_config(config: &Config) -> Self {
        let table = build_endpoint_table(all_personas());
        let uptime = UptimeClock::new(Utc::now(), &mut rand::thread_rng());
        Self::new(table, ProfileFilter::from_config(&config.profile), uptime)
            .with_iot_basic_auth(config.http.iot_basic_auth)
    }

    pub fn filter(&self) -> &ProfileFilter {
        &self.filter
    }

    pub fn uptime(&self) -> UptimeClock {
        self.uptime
    }

    /// Live render context (wall clock, fresh entropy)
    pub fn render_context(&self) -> RenderContext {
        RenderContext::new(self.uptime)
    }

    pub fn resolve(&self, path: &str, user_agent: Option<&str>) -> Artifact {
        let mut ctx = self.render_context();
        self.resolve_with(path, user_agent, &mut ctx)
    }

    pub fn resolve_with(
        &self,
        path: &str,
        user_agent: Option<&str>,
        ctx: &mut RenderContext,
    ) -> Artifact {
        if let Some(early) = self.gate(path, user_agent) {
            return early;
        }
        self.lookup(normalize_path(path), ctx)
    }

    /// Resolve a parsed HTTP request, applying the Basic-auth gate when enabled
    pub fn respond(&self, request: &HttpRequest) -> Artifact {
        let mut ctx = self.render_context();
        self.respond_with(request, &mut ctx)
    }

    pub fn respond_with(&self, request: &HttpRequest, ctx: &mut RenderContext) -> Artifact {
        if let Some(early) = self.gate(&request.path, request.header("User-Agent")) {
            return early;
        }

        let path = normalize_path(&request.path);
        if self.iot_basic_auth
            && iot_auth::requires_auth(path)
            && !iot_auth::check(request.header("Authorization"))
        {
            debug!("Basic auth challenge for {}", path);
            return iot_auth::unauthorized_response();
        }

        self.lookup(path, ctx)
    }

    /// Runtime registration; takes the single writer lock
    pub fn add_endpoint(&self, path: &str, producer: Producer) {
        write_lock_or_recover(&self.table, "endpoint table").insert(path, producer);
    }

    /// Registered paths visible under the active persona, in table order
    pub fn visible_paths(&self) -> Vec<String> {
        read_lock_or_recover(&self.table, "endpoint table")
            .paths()
            .filter(|path| self.filter.is_allowed(path))
            .map(str::to_string)
            .collect()
    }

    /// Visibility check and scanner short-circuit, both ahead of lookup
    fn gate(&self, path: &str, user_agent: Option<&str>) -> Option<Artifact> {
        if !self.filter.is_allowed(normalize_path(path)) {
            return Some(artifact::not_found());
        }
        scanner::detect(user_agent)
    }

    fn lookup(&self, path: &str, ctx: &mut RenderContext) -> Artifact {
        // Clone the Arc so the read lock is not held while the producer runs
        let producer = {
            let table = read_lock_or_recover(&self.table, "endpoint table");
            table
                .get(path)
                .or_else(|| table.longest_prefix(path))
                .cloned()
        };

        match producer {
            Some(producer) => invoke(&producer, path, ctx),
            None => artifact::not_found(),
        }
    }
}

fn invoke(producer: &Producer, path: &str, ctx: &mut RenderContext) -> Artifact {
    match panic::catch_unwind(AssertUnwindSafe(|| producer(ctx))) {
        Ok(artifact) => artifact,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!("Producer for {} panicked: {}", path, reason);
            artifact::internal_error()
        }
    }
}
