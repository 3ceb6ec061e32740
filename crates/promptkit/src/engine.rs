//! Rendering engine contract and its minijinja implementation.
//!
//! Template sources are usually written as indented string literals, so the
//! engine normalises them with [`clean`] before parsing. The normalisation
//! lets a prompt be laid out naturally in code:
//!
//! ```
//! let source = "
//!     You are a helpful assistant.
//!     Answer: {{ question }}
//! ";
//! assert_eq!(
//!     promptkit::engine::clean(source),
//!     "You are a helpful assistant.\nAnswer: {{ question }}"
//! );
//! ```

use crate::error::{PromptError, Result};
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{LazyLock, OnceLock};

/// Names the engine provides on its own; templates may use them freely.
const ENGINE_GLOBALS: &[&str] = &["range", "dict", "namespace", "debug"];

/// Whitespace run that follows a word character and does not open with a
/// line break.
static CONTINUED_LINE_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[^\S\r\n]\s*").expect("whitespace pattern is valid"));

/// Trait for engines that turn template sources into strings.
///
/// # Examples
///
/// ```
/// use promptkit::{JinjaEngine, PromptEngine};
/// use std::collections::BTreeMap;
///
/// let engine = JinjaEngine::new();
/// let ctx = BTreeMap::from([("name", "Dan")]);
/// let rendered = engine.render("greeting", "My name is {{ name }}", &ctx)?;
/// assert_eq!(rendered, "My name is Dan");
/// # Ok::<(), promptkit::PromptError>(())
/// ```
pub trait PromptEngine {
    /// Parses `source` and returns the top-level variables it reads from
    /// the context.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::TemplateSyntax`] if `source` does not parse.
    fn check(&self, name: &str, source: &str) -> Result<BTreeSet<String>>;

    /// Renders `source` against `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::TemplateSyntax`] if `source` does not parse and
    /// [`PromptError::TemplateRender`] for any other engine failure,
    /// including reads of undefined variables.
    fn render<T: Serialize>(&self, name: &str, source: &str, ctx: &T) -> Result<String>;
}

/// minijinja-backed engine with Jinja2 prompt-friendly settings.
///
/// Block tags swallow the newline that follows them and the indentation that
/// precedes them, trailing newlines are kept, and undefined variables are
/// errors.
#[derive(Debug)]
pub struct JinjaEngine {
    env: Environment<'static>,
}

static SHARED: OnceLock<JinjaEngine> = OnceLock::new();

impl JinjaEngine {
    /// Creates a new engine.
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }

    /// Returns the process-wide engine, built on first use.
    pub fn shared() -> &'static JinjaEngine {
        SHARED.get_or_init(JinjaEngine::new)
    }
}

impl Default for JinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine for JinjaEngine {
    fn check(&self, name: &str, source: &str) -> Result<BTreeSet<String>> {
        let cleaned = clean(source);
        let tmpl = self
            .env
            .template_from_str(&cleaned)
            .map_err(|e| engine_error(name, e))?;

        Ok(tmpl
            .undeclared_variables(false)
            .into_iter()
            .filter(|var| !ENGINE_GLOBALS.contains(&var.as_str()))
            .collect())
    }

    fn render<T: Serialize>(&self, name: &str, source: &str, ctx: &T) -> Result<String> {
        let cleaned = clean(source);
        self.env
            .render_str(&cleaned, ctx)
            .map_err(|e| engine_error(name, e))
    }
}

fn engine_error(name: &str, err: minijinja::Error) -> PromptError {
    match err.kind() {
        ErrorKind::SyntaxError => PromptError::TemplateSyntax {
            template: name.to_string(),
            message: err.to_string(),
        },
        _ => PromptError::TemplateRender {
            template: name.to_string(),
            message: err.to_string(),
        },
    }
}

/// Renders a one-off `source` with the shared engine.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// let ctx = BTreeMap::from([("food", "tomatoes"), ("sport", "tennis")]);
/// let out = promptkit::engine::render("I like {{food}} and {{sport}}", &ctx)?;
/// assert_eq!(out, "I like tomatoes and tennis");
/// # Ok::<(), promptkit::PromptError>(())
/// ```
///
/// # Errors
///
/// See [`PromptEngine::render`].
pub fn render<T: Serialize>(source: &str, ctx: &T) -> Result<String> {
    JinjaEngine::shared().render("<string>", source, ctx)
}

/// Normalises a template source before parsing.
///
/// - tabs expand to 8-column stops;
/// - the first line loses its leading whitespace and the remaining lines
///   lose their common indentation;
/// - leading and trailing empty lines are dropped;
/// - a source ending in an empty line (spaces ignored) keeps one trailing
///   newline;
/// - a whitespace run that directly follows a word character and does not
///   start with a line break collapses to one space.
pub fn clean(source: &str) -> String {
    let mut cleaned = dedent(&expand_tabs(source));

    if source.replace(' ', "").ends_with("\n\n") {
        cleaned.push('\n');
    }

    CONTINUED_LINE_GAP.replace_all(&cleaned, " ").into_owned()
}

fn expand_tabs(source: &str) -> String {
    const TAB_SIZE: usize = 8;

    let mut out = String::with_capacity(source.len());
    let mut column = 0;
    for c in source.chars() {
        match c {
            '\t' => {
                let pad = TAB_SIZE - column % TAB_SIZE;
                out.extend(std::iter::repeat_n(' ', pad));
                column += pad;
            }
            '\n' | '\r' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

fn dedent(source: &str) -> String {
    let mut lines: Vec<String> = source.split('\n').map(str::to_string).collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim_start().is_empty())
        .map(|line| line.chars().count() - line.trim_start().chars().count())
        .min();

    if let Some(first) = lines.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(margin) = margin {
        for line in lines.iter_mut().skip(1) {
            *line = line.chars().skip(margin).collect();
        }
    }

    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.is_empty()).count();
    lines.drain(..leading);

    lines.join("\n")
}
