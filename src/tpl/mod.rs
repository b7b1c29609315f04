pub mod ast;
pub mod engine;
mod lexer;
pub mod locator;
mod parser;
pub mod position;

use crate::Result;
use crate::context::Context;
use crate::error::TemplateError;
use crate::registry::{self, Registry};
use crate::tpl::ast::Node;
use crate::tpl::engine::Execution;
use crate::tpl::locator::{FileLocator, Locator};
use log::debug;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Settings a template is compiled with.
#[derive(Clone)]
pub struct TemplateOptions {
    autoescape: bool,
    locator: Option<Arc<dyn Locator>>,
    registry: Arc<Registry>,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            autoescape: true,
            locator: None,
            registry: registry::registry(),
        }
    }
}

impl fmt::Debug for TemplateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateOptions")
            .field("autoescape", &self.autoescape)
            .field("locator", &self.locator.is_some())
            .finish_non_exhaustive()
    }
}

impl TemplateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// When enabled (the default) every `{{ }}` output is HTML-escaped.
    pub fn autoescape(mut self, enabled: bool) -> Self {
        self.autoescape = enabled;
        self
    }

    /// Locator used by `include`.
    pub fn locator(mut self, locator: impl Locator + 'static) -> Self {
        self.locator = Some(Arc::new(locator));
        self
    }

    pub fn shared_locator(mut self, locator: Arc<dyn Locator>) -> Self {
        self.locator = Some(locator);
        self
    }

    /// Tag and filter registry; defaults to the shared [`registry()`](crate::registry()).
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn is_autoescape(&self) -> bool {
        self.autoescape
    }

    pub fn get_locator(&self) -> Option<&Arc<dyn Locator>> {
        self.locator.as_ref()
    }

    pub fn get_registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

/// A compiled template.
///
/// Once parsed, a template is immutable: rendering keeps its state in a per-call
/// [`Execution`], so one template can be rendered concurrently.
#[derive(Debug)]
pub struct Template {
    name: String,
    raw: String,
    nodes: Vec<Node>,
    options: TemplateOptions,
    parsed: bool,
}

impl Template {
    /// Creates an unparsed template. Call [`parse`](Template::parse) before executing it.
    pub fn new(name: &str, source: &str, options: TemplateOptions) -> Result<Self> {
        if source.is_empty() {
            return Err(TemplateError::EmptyTemplate(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            raw: source.to_string(),
            nodes: Vec::new(),
            options,
            parsed: false,
        })
    }

    /// Creates and parses a template from a string.
    pub fn from_string(name: &str, source: &str, options: TemplateOptions) -> Result<Self> {
        let mut tpl = Self::new(name, source, options)?;
        tpl.parse()?;
        Ok(tpl)
    }

    /// Reads and parses a template file.
    ///
    /// `path` may be absolute or relative to the working directory. Without a
    /// locator in `options`, includes resolve relative to the file's directory.
    pub fn from_file(path: impl AsRef<Path>, options: TemplateOptions) -> Result<Self> {
        let path = std::path::absolute(path.as_ref())?;
        let source = fs::read_to_string(&path)?;

        let mut options = options;
        if options.locator.is_none() {
            let base = path.parent().unwrap_or(Path::new("/"));
            options = options.locator(FileLocator::new(base));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Self::from_string(&name, &source, options)
    }

    /// Lexes and parses the source. A second call after success does nothing.
    pub fn parse(&mut self) -> Result<()> {
        if self.parsed {
            return Ok(());
        }

        let nodes = lexer::tokenize(
            &self.name,
            &self.raw,
            &self.options.registry,
            self.options.autoescape,
        )?;
        debug!("Parsed template '{}': nodes={}", self.name, nodes.len());

        self.nodes = nodes;
        self.parsed = true;
        Ok(())
    }

    /// Renders the template. `None` renders against an empty context.
    ///
    /// Either the whole output is returned or the first error; never partial output.
    pub fn execute(&self, ctx: Option<&mut Context>) -> Result<String> {
        let mut empty = Context::new();
        let ctx = ctx.unwrap_or(&mut empty);
        self.execute_nested(ctx, 0)
    }

    /// Renders the template against any serialisable data (a struct or map).
    pub fn render<T: ?Sized + Serialize>(&self, data: &T) -> Result<String> {
        let mut ctx = Context::from_serialize(data)?;
        self.execute_nested(&mut ctx, 0)
    }

    pub(crate) fn execute_nested(&self, ctx: &mut Context, include_depth: usize) -> Result<String> {
        if !self.parsed {
            return Err(TemplateError::NotParsed(self.name.clone()));
        }

        let start = Instant::now();
        let result = Execution::new(self, include_depth).render_all(ctx);
        let elapsed = start.elapsed().as_micros();

        match &result {
            Ok(out) => debug!(
                "Execute: template={}, elapsed={}us, bytes={}",
                self.name,
                elapsed,
                out.len()
            ),
            Err(e) => debug!(
                "Execute: template={}, elapsed={}us, error={}",
                self.name, elapsed, e
            ),
        }

        result
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.raw
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed
    }

    pub fn options(&self) -> &TemplateOptions {
        &self.options
    }
}
