//! Template engine backed by minijinja.
//!
//! Templates use `${ expr }` for interpolation, `{% ... %}` for blocks and
//! `{# ... #}` for comments. Output is markdown, so HTML auto-escaping is
//! disabled for every template. Named HTML entities in the template source are
//! decoded before compilation. Booleans print as `true`/`false`. Compiled
//! templates are cached process-wide, keyed by name and source text.

use super::error::TemplateError;
use minijinja::syntax::SyntaxConfig;
use minijinja::value::ValueKind;
use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value, escape_formatter};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace, warn};

static ENGINE: LazyLock<TemplateEngine> = LazyLock::new(TemplateEngine::new);

/// Reference used in evaluation errors when the engine reports no span
const UNKNOWN_REFERENCE: &str = "<unknown>";

/// A parsed template, ready to render any number of contexts
pub struct CompiledTemplate {
    name: String,
    source: String,
    env: Environment<'static>,
}

impl CompiledTemplate {
    fn new(name: &str, source: String) -> Result<Self, TemplateError> {
        let compile_error = |source| TemplateError::Compile {
            template: name.to_string(),
            source,
        };
        let mut env = environment().map_err(compile_error)?;
        env.add_template_owned(name.to_string(), source.clone())
            .map_err(compile_error)?;
        Ok(Self {
            name: name.to_string(),
            source,
            env,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Evaluate the template against a context
    pub fn render(&self, ctx: Value) -> Result<String, TemplateError> {
        let evaluation_error = |source: minijinja::Error| {
            let reference = source
                .range()
                .and_then(|range| self.source.get(range))
                .unwrap_or(UNKNOWN_REFERENCE)
                .to_string();
            TemplateError::Evaluation {
                template: self.name.clone(),
                reference,
                source,
            }
        };
        let template = self
            .env
            .get_template(&self.name)
            .map_err(evaluation_error)?;
        template.render(ctx).map_err(|e| {
            warn!("Template '{}' failed to render: {}", self.name, e);
            evaluation_error(e)
        })
    }
}

/// Compile-once, render-many template cache
pub struct TemplateEngine {
    cache: RwLock<HashMap<(String, String), Arc<CompiledTemplate>>>,
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide engine shared by every render of a run
    pub fn global() -> &'static TemplateEngine {
        &ENGINE
    }

    /// Compile `source` under `name`, or return the cached compilation
    ///
    /// Entries are keyed by name as well as source so errors always carry the
    /// identifier the caller used.
    pub fn compile(&self, name: &str, source: &str) -> Result<Arc<CompiledTemplate>, TemplateError> {
        let key = (
            name.to_string(),
            html_escape::decode_html_entities(source).into_owned(),
        );

        if let Some(compiled) = self.cache.read().get(&key) {
            trace!("Template cache hit for '{}'", name);
            return Ok(compiled.clone());
        }

        let mut cache = self.cache.write();
        // Another thread may have compiled it while we waited for the lock
        if let Some(compiled) = cache.get(&key) {
            return Ok(compiled.clone());
        }
        debug!("Compiling template '{}' ({} bytes)", name, key.1.len());
        let compiled = Arc::new(CompiledTemplate::new(name, key.1.clone())?);
        cache.insert(key, compiled.clone());
        Ok(compiled)
    }

    pub fn render(&self, name: &str, source: &str, ctx: Value) -> Result<String, TemplateError> {
        self.compile(name, source)?.render(ctx)
    }

    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_syntax(
        SyntaxConfig::builder()
            .block_delimiters("{%", "%}")
            .variable_delimiters("${", "}")
            .comment_delimiters("{#", "#}")
            .build()?,
    );
    // Markdown output, never HTML-escape interpolated values
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.set_formatter(|out, state, value| match value.kind() {
        ValueKind::Bool => out
            .write_str(if value.is_true() { "true" } else { "false" })
            .map_err(minijinja::Error::from),
        _ => escape_formatter(out, state, value),
    });
    Ok(env)
}
