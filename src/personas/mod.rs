//! Persona definitions.
//!
//! A persona bundles brand attributes with a fragment of the endpoint table.
//! Fragments are merged by [`crate::router::build_endpoint_table`] in the order
//! returned by [`all_personas`]; later personas win on colliding paths.

use std::sync::Arc;

use crate::artifact::Artifact;
use crate::freshness::RenderContext;

pub mod api;
pub mod common;
pub mod database;
pub mod devops;
pub mod generic;
pub mod iot;
pub mod iot_tapo;
pub mod wordpress;

/// Artifact factory invoked once per matching request
pub type Producer = Arc<dyn Fn(&mut RenderContext) -> Artifact + Send + Sync>;

pub fn producer<F>(f: F) -> Producer
where
    F: Fn(&mut RenderContext) -> Artifact + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Producer that always returns the same artifact
pub fn fixed(artifact: Artifact) -> Producer {
    Arc::new(move |_ctx: &mut RenderContext| artifact.clone())
}

/// What the persona pretends to be
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrandAttributes {
    pub name: String,
    pub tech_stack: Vec<String>,
    pub model: Option<String>,
    pub firmware: Option<String>,
}

impl BrandAttributes {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_stack(mut self, stack: &[&str]) -> Self {
        self.tech_stack = stack.iter().map(|s| s.to_string()).collect();
        self
    }
}

pub struct Persona {
    pub name: &'static str,
    pub brand: BrandAttributes,
    pub endpoints: Vec<(String, Producer)>,
}

impl Persona {
    pub fn new(name: &'static str, brand: BrandAttributes) -> Self {
        Self {
            name,
            brand,
            endpoints: Vec::new(),
        }
    }

    /// Register `path`; a repeated path replaces the earlier producer in place
    pub fn endpoint(mut self, path: &str, producer: Producer) -> Self {
        match self.endpoints.iter_mut().find(|(p, _)| p == path) {
            Some(entry) => entry.1 = producer,
            None => self.endpoints.push((path.to_string(), producer)),
        }
        self
    }

    pub fn extend(self, endpoints: Vec<(String, Producer)>) -> Self {
        endpoints
            .into_iter()
            .fold(self, |persona, (path, producer)| persona.endpoint(&path, producer))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.endpoints.iter().map(|(path, _)| path.as_str())
    }
}

impl std::fmt::Debug for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Persona")
            .field("name", &self.name)
            .field("brand", &self.brand)
            .field("endpoints", &self.paths().collect::<Vec<_>>())
            .finish()
    }
}

/// Every built-in persona, in merge order
pub fn all_personas() -> Vec<Persona> {
    vec![
        generic::persona(),
        wordpress::persona(),
        api::persona(),
        database::persona(),
        iot::persona(),
        iot_tapo::persona(),
        devops::persona(),
    ]
}
