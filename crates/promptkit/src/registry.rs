//! Model registry mapping model identifiers to their special tokens.
//!
//! A [`ModelRegistry`] is a plain map and can be built and passed around
//! explicitly. Most callers use the process-wide registry instead, reached
//! through the free functions of this module ([`lookup`], [`register`],
//! [`models`]). It is seeded from [`ModelRegistry::builtin`] on first use and
//! guarded by an `RwLock`: registration takes the write lock, lookups share
//! the read lock.

use crate::config::RegistryConfig;
use crate::error::{PromptError, Result};
use crate::tokens::{Limits, SpecialTokens};
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Table of model identifiers and their special tokens.
///
/// # Examples
///
/// ```
/// use promptkit::{ModelRegistry, SpecialTokens};
///
/// let mut registry = ModelRegistry::builtin();
/// registry.register("acme/base", SpecialTokens::new("<start>", "<stop>"));
///
/// let tokens = registry.lookup("acme/base")?;
/// assert_eq!(tokens.bos, "<start>");
/// assert!(registry.lookup("acme/missing").is_err());
/// # Ok::<(), promptkit::PromptError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    entries: HashMap<String, SpecialTokens>,
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in model table.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("google/gemma-2-9b", SpecialTokens::new("<bos>", "<eos>"));
        registry.register(
            "openai-community/gpt2",
            SpecialTokens::new("", "<|endoftext|>"),
        );
        registry.register(
            "mistralai/Mistral-7B-v0.1",
            SpecialTokens::new("<s>", "</s>"),
        );
        registry.register(
            "mistralai/Mistral-7B-Instruct-v0.1",
            SpecialTokens::new("<s>", "</s>")
                .with_user(Limits::new("[INST]", "[/INST]"))
                .with_assistant(Limits::new("", "</s>")),
        );
        registry
    }

    /// Returns the special tokens registered for `model`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::UnknownModel`] if `model` is not registered.
    pub fn lookup(&self, model: &str) -> Result<SpecialTokens> {
        self.entries
            .get(model)
            .cloned()
            .ok_or_else(|| PromptError::UnknownModel(model.to_string()))
    }

    /// Returns `true` if `model` is registered.
    pub fn contains(&self, model: &str) -> bool {
        self.entries.contains_key(model)
    }

    /// Inserts or replaces the entry for `model`. The last write wins.
    pub fn register(&mut self, model: impl Into<String>, tokens: SpecialTokens) {
        let model = model.into();
        if self.entries.insert(model.clone(), tokens).is_some() {
            tracing::debug!(model = %model, "replaced registry entry");
        } else {
            tracing::debug!(model = %model, "registered model");
        }
    }

    /// Registers every model of `config`.
    pub fn apply(&mut self, config: &RegistryConfig) {
        for (model, tokens) in &config.models {
            self.register(model.clone(), tokens.clone());
        }
    }

    /// Lists registered identifiers in sorted order.
    pub fn models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.entries.keys().cloned().collect();
        models.sort();
        models
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no model is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static GLOBAL: OnceLock<RwLock<ModelRegistry>> = OnceLock::new();

/// Returns the process-wide registry, seeding it with the built-in table on
/// first access.
pub fn global() -> &'static RwLock<ModelRegistry> {
    GLOBAL.get_or_init(|| RwLock::new(ModelRegistry::builtin()))
}

// Writers replace whole entries, so a poisoned lock never guards a
// half-written map.
fn read() -> RwLockReadGuard<'static, ModelRegistry> {
    global().read().unwrap_or_else(PoisonError::into_inner)
}

fn write() -> RwLockWriteGuard<'static, ModelRegistry> {
    global().write().unwrap_or_else(PoisonError::into_inner)
}

/// Looks `model` up in the process-wide registry.
///
/// # Errors
///
/// Returns [`PromptError::UnknownModel`] if `model` is not registered.
pub fn lookup(model: &str) -> Result<SpecialTokens> {
    read().lookup(model)
}

/// Registers `model` in the process-wide registry. The last write wins.
pub fn register(model: impl Into<String>, tokens: SpecialTokens) {
    write().register(model, tokens);
}

/// Registers every model of `config` in the process-wide registry.
pub fn register_config(config: &RegistryConfig) {
    write().apply(config);
}

/// Lists the identifiers of the process-wide registry in sorted order.
pub fn models() -> Vec<String> {
    read().models()
}

/// Returns a copy of the process-wide registry.
pub fn snapshot() -> ModelRegistry {
    read().clone()
}
