use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::expr::filters::{self, Filter};
use crate::tags::{self, TagHandler};

/// The process-wide registry used by templates that do not bring their own.
static GLOBAL: LazyLock<Arc<Registry>> = LazyLock::new(|| Arc::new(Registry::new()));

/// Returns the shared default registry, pre-populated with the built-in tags and filters.
///
/// Tags and filters registered here become visible to every template compiled
/// afterwards with default options.
pub fn registry() -> Arc<Registry> {
    GLOBAL.clone()
}

/// What a tag name resolves to.
#[derive(Clone)]
pub enum TagKind {
    /// A tag with behaviour of its own.
    Handler(Arc<dyn TagHandler>),
    /// A closing or separator keyword (`endif`, `else`, ...) that only delimits the
    /// body of another tag.
    Marker,
}

impl std::fmt::Debug for TagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagKind::Handler(_) => f.write_str("Handler"),
            TagKind::Marker => f.write_str("Marker"),
        }
    }
}

/// Tag and filter lookup tables.
///
/// Templates keep only names; handlers are looked up here at render time, so a
/// registry can outlive or be shared between any number of templates.
pub struct Registry {
    tags: DashMap<String, TagKind>,
    filters: DashMap<String, Arc<dyn Filter>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry holding the built-in tags and filters.
    pub fn new() -> Self {
        let registry = Self::empty();
        tags::register_builtins(&registry);
        filters::register_builtins(&registry);
        registry
    }

    /// Creates a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            tags: DashMap::new(),
            filters: DashMap::new(),
        }
    }

    /// Registers (or replaces) a tag handler under `name`.
    pub fn register_tag(&self, name: &str, handler: impl TagHandler + 'static) {
        self.tags
            .insert(name.to_string(), TagKind::Handler(Arc::new(handler)));
    }

    /// Registers `name` as a marker tag.
    pub fn register_marker(&self, name: &str) {
        self.tags.insert(name.to_string(), TagKind::Marker);
    }

    pub fn register_filter(&self, name: &str, filter: impl Filter + 'static) {
        self.filters.insert(name.to_string(), Arc::new(filter));
    }

    pub fn tag(&self, name: &str) -> Option<TagKind> {
        self.tags.get(name).map(|v| v.value().clone())
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn filter(&self, name: &str) -> Option<Arc<dyn Filter>> {
        self.filters.get(name).map(|v| v.value().clone())
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }
}
