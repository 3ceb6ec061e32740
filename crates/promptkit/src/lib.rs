//! Model-aware prompt templates.
//!
//! This crate renders parameterized text templates (minijinja syntax) with
//! two independent axes of model-specific variation:
//!
//! - special tokens (`bos`, `eos`, role delimiters) looked up in a
//!   [`ModelRegistry`] and exposed to every template;
//! - whole-template variants registered per model on a [`Template`] and
//!   chosen through its [`DispatchTable`].
//!
//! It also renders role-tagged [`Chat`] histories with a model's turn
//! delimiters.
//!
//! # Architecture
//!
//! - [`error`]: Error type and result alias
//! - [`tokens`]: Special-token records
//! - [`registry`]: Model registry, plus the process-wide instance
//! - [`config`]: Registry configuration files
//! - [`engine`]: Rendering engine trait and the minijinja engine
//! - [`args`]: Parameters and argument binding
//! - [`dispatch`]: Per-model template variants
//! - [`template`]: Templates and model-bound templates
//! - [`manifest`]: Templates declared in TOML
//! - [`chat`]: Chat histories
//!
//! # Examples
//!
//! ```
//! use promptkit::{Args, Template};
//!
//! let prompt = Template::new("prompt", ["query"], "{{ bos + query + eos }}")?;
//! let args = Args::new().kwarg("query", "question");
//!
//! assert_eq!(prompt.for_model("mistralai/Mistral-7B-v0.1")?.render(&args)?, "<s>question</s>");
//! assert_eq!(prompt.for_model("google/gemma-2-9b")?.render(&args)?, "<bos>question<eos>");
//! # Ok::<(), promptkit::PromptError>(())
//! ```

pub mod args;
pub mod chat;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod registry;
pub mod template;
pub mod tokens;

// Re-export public types for convenience
pub use args::{Args, Param, RESERVED_NAMES, Signature};
pub use chat::{Chat, Filter, Message, Role, filters};
pub use config::RegistryConfig;
pub use dispatch::DispatchTable;
pub use engine::{JinjaEngine, PromptEngine};
pub use error::{PromptError, Result};
pub use manifest::{ParamSpec, TemplateManifest};
pub use registry::ModelRegistry;
pub use template::{ModelTemplate, Template};
pub use tokens::{Limits, SpecialTokens};
pub use minijinja::Value;
