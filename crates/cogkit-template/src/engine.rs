//! Template engine: compiling templates and rendering them within a budget.
//!
//! The [`Engine`] holds the filter registry and the engine settings. It
//! compiles sources into shareable [`Template`]s and renders them on a worker
//! bounded by the render budget, so a runaway template can never hold up the
//! caller for longer than that.

use std::sync::Arc;
use std::time::Duration;

use cogkit_core::error::RenderError;
use cogkit_core::logging::render_span;
use cogkit_core::settings::TemplateSettings;
use tracing::Instrument;

use crate::ast::Node;
use crate::context::Context;
use crate::filters::{default_registry, Filter, FilterRegistry};
use crate::lexer;
use crate::parser;
use crate::render::Renderer;
use crate::sandbox::Limits;
use crate::timeout::{run_with_deadline, run_with_deadline_async, Deadline};

/// A compiled template.
///
/// Compiling is a pure function of the source text: compiling the same
/// source twice gives templates that render identically. A template is
/// immutable and can be shared across threads behind an [`Arc`].
#[derive(Debug)]
pub struct Template {
    source: String,
    nodes: Vec<Node>,
    filters: Arc<FilterRegistry>,
}

impl Template {
    /// Compiles `source` against the given filter registry.
    pub(crate) fn compile_with(
        source: &str,
        filters: Arc<FilterRegistry>,
    ) -> Result<Self, RenderError> {
        let tokens = lexer::tokenize(source)?;
        let nodes = parser::parse(source, &tokens, &filters)?;
        Ok(Self {
            source: source.to_string(),
            nodes,
            filters,
        })
    }

    /// The source text this template was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Renders on the current thread with no time limit.
    ///
    /// Only for trusted templates; untrusted input goes through
    /// [`Engine::render_compiled`].
    pub fn render(&self, context: &Context) -> Result<String, RenderError> {
        self.render_with(context, &Deadline::unbounded(), Limits::default())
    }

    /// Renders on the current thread, stopping once `deadline` passes.
    pub fn render_with(
        &self,
        context: &Context,
        deadline: &Deadline,
        limits: Limits,
    ) -> Result<String, RenderError> {
        Renderer::new(context, &self.filters, deadline, limits).render(&self.nodes)
    }
}

/// The template engine.
///
/// # Examples
///
/// ```
/// use cogkit_template::{Context, Engine};
///
/// let engine = Engine::new();
/// let ctx = Context::new().with("username", "alice").with("dupenum", 2);
///
/// let name = engine
///     .render("{{ username }}'s room{% if dupenum > 1 %} ({{ dupenum }}){% endif %}", &ctx)
///     .unwrap();
/// assert_eq!(name, "alice's room (2)");
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    filters: Arc<FilterRegistry>,
    settings: TemplateSettings,
}

impl Engine {
    /// Creates an engine with the built-in filters and default settings.
    pub fn new() -> Self {
        Self::from_settings(&TemplateSettings::default())
    }

    /// Creates an engine with the built-in filters and the given settings.
    pub fn from_settings(settings: &TemplateSettings) -> Self {
        Self {
            filters: default_registry(),
            settings: settings.clone(),
        }
    }

    /// The engine settings.
    pub const fn settings(&self) -> &TemplateSettings {
        &self.settings
    }

    /// The filters templates compiled by this engine can use.
    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// The resource limits applied to renders.
    pub const fn limits(&self) -> Limits {
        Limits::from_settings(&self.settings)
    }

    /// Registers a custom filter.
    ///
    /// Templates compiled earlier keep the registry they were compiled with.
    pub fn register_filter(&mut self, filter: Box<dyn Filter>) {
        Arc::make_mut(&mut self.filters).register(filter);
    }

    /// Registers a custom filter and returns the engine.
    #[must_use]
    pub fn with_filter(mut self, filter: Box<dyn Filter>) -> Self {
        self.register_filter(filter);
        self
    }

    /// Compiles a template.
    pub fn compile(&self, source: &str) -> Result<Arc<Template>, RenderError> {
        Template::compile_with(source, Arc::clone(&self.filters))
            .map(Arc::new)
            .map_err(|e| {
                tracing::debug!(error = %e, "Template compilation failed");
                e
            })
    }

    /// Compiles and renders a template within the configured budget.
    pub fn render(&self, source: &str, context: &Context) -> Result<String, RenderError> {
        self.render_with_timeout(source, context, self.settings.render_timeout())
    }

    /// Compiles and renders a template within `budget`.
    pub fn render_with_timeout(
        &self,
        source: &str,
        context: &Context,
        budget: Duration,
    ) -> Result<String, RenderError> {
        let template = self.compile(source)?;
        self.render_compiled(template, context, budget)
    }

    /// Renders a compiled template on a worker thread within `budget`.
    pub fn render_compiled(
        &self,
        template: Arc<Template>,
        context: &Context,
        budget: Duration,
    ) -> Result<String, RenderError> {
        let span = render_span(template.source().len(), budget.as_millis());
        let _guard = span.enter();

        let context = context.clone();
        let limits = self.limits();
        let result = run_with_deadline(budget, move |deadline| {
            template.render_with(&context, deadline, limits)
        });
        log_outcome(&result);
        result
    }

    /// Compiles and renders a template on the tokio blocking pool within the
    /// configured budget.
    pub async fn render_async(
        &self,
        source: &str,
        context: &Context,
    ) -> Result<String, RenderError> {
        let template = self.compile(source)?;
        self.render_compiled_async(template, context, self.settings.render_timeout())
            .await
    }

    /// Renders a compiled template on the tokio blocking pool within `budget`.
    pub async fn render_compiled_async(
        &self,
        template: Arc<Template>,
        context: &Context,
        budget: Duration,
    ) -> Result<String, RenderError> {
        let span = render_span(template.source().len(), budget.as_millis());
        let context = context.clone();
        let limits = self.limits();
        let result = run_with_deadline_async(budget, move |deadline| {
            template.render_with(&context, deadline, limits)
        })
        .instrument(span)
        .await;
        log_outcome(&result);
        result
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn log_outcome(result: &Result<String, RenderError>) {
    match result {
        Ok(output) => tracing::debug!(output_len = output.len(), "Template rendered"),
        // Timeouts are reported by the deadline runner.
        Err(RenderError::TimedOut { .. }) => {}
        Err(e) => tracing::debug!(error = %e, "Template render failed"),
    }
}
