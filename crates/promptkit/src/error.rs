//! Error types for the promptkit crate.
//!
//! Every fallible operation returns [`PromptError`]. Nothing is retried
//! internally: rendering is deterministic, so the caller decides what to do
//! with a failure.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while declaring or rendering prompts.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PromptError {
    // Registry errors
    /// The model identifier is not present in the registry.
    #[error("unknown model: {0}")]
    UnknownModel(String),

    // Template errors
    /// The template source could not be parsed by the rendering engine.
    #[error("template syntax error in {template}: {message}")]
    TemplateSyntax {
        /// Name of the template that failed to parse.
        template: String,
        /// Message reported by the engine.
        message: String,
    },

    /// The engine failed while rendering a parsed template.
    #[error("template render error in {template}: {message}")]
    TemplateRender {
        /// Name of the template that failed to render.
        template: String,
        /// Message reported by the engine.
        message: String,
    },

    /// The template source references a variable that is neither a declared
    /// parameter nor a special token.
    #[error("template {template} references undeclared variable `{name}`")]
    UndeclaredVariable {
        /// Name of the template.
        template: String,
        /// The undeclared variable.
        name: String,
    },

    // Signature errors
    /// A parameter uses one of the reserved special-token names.
    #[error("parameter name `{0}` is reserved for special tokens")]
    ReservedName(String),

    /// The same parameter name was declared twice.
    #[error("duplicate parameter `{0}`")]
    DuplicateParameter(String),

    /// The parameter list is not a valid signature.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    // Binding errors
    /// A required argument was not supplied.
    #[error("{template}() missing required argument `{name}`")]
    MissingArgument {
        /// Name of the template.
        template: String,
        /// The missing parameter.
        name: String,
    },

    /// A keyword argument does not match any declared parameter.
    #[error("{template}() got an unexpected keyword argument `{name}`")]
    UnexpectedArgument {
        /// Name of the template.
        template: String,
        /// The unexpected keyword.
        name: String,
    },

    /// A parameter was given both positionally and by keyword.
    #[error("{template}() got multiple values for argument `{name}`")]
    DuplicateArgument {
        /// Name of the template.
        template: String,
        /// The parameter bound twice.
        name: String,
    },

    /// More positional arguments than declared parameters.
    #[error("{template}() takes {expected} positional arguments but {given} were given")]
    TooManyArguments {
        /// Name of the template.
        template: String,
        /// Number of positional parameters accepted.
        expected: usize,
        /// Number of positional arguments supplied.
        given: usize,
    },

    // Chat errors
    /// A message produced by a chat filter cannot be rendered.
    #[error("invalid message at index {index}: {reason}")]
    InvalidMessage {
        /// Position of the message in the filtered sequence.
        index: usize,
        /// Why the message was rejected.
        reason: String,
    },

    // Config errors
    /// Configuration file not found at the given location.
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Registry configuration could not be parsed.
    #[error("config parse error in {path}: {message}")]
    ConfigParse {
        /// Path of the offending file (`<memory>` for in-memory sources).
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Template manifest could not be parsed.
    #[error("manifest parse error in {path}: {message}")]
    ManifestParse {
        /// Path of the offending file (`<memory>` for in-memory sources).
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    // IO errors
    /// Standard IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for promptkit operations.
pub type Result<T> = std::result::Result<T, PromptError>;
