//! Per-model template variants.

use std::collections::HashMap;

/// Alternate template sources keyed by model identifier.
///
/// Resolution never fails: a model without a variant gets the default source.
///
/// # Examples
///
/// ```
/// use promptkit::DispatchTable;
///
/// let mut table = DispatchTable::new();
/// table.register("provider/name", "name: {{ query }}");
///
/// assert_eq!(table.resolve("provider/name", "{{ query }}"), "name: {{ query }}");
/// assert_eq!(table.resolve("openai-community/gpt2", "{{ query }}"), "{{ query }}");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchTable {
    variants: HashMap<String, String>,
}

impl DispatchTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `source` to `model`, replacing any earlier variant.
    ///
    /// Returns the replaced source, if any.
    pub fn register(
        &mut self,
        model: impl Into<String>,
        source: impl Into<String>,
    ) -> Option<String> {
        let model = model.into();
        let previous = self.variants.insert(model.clone(), source.into());
        if previous.is_some() {
            tracing::debug!(model = %model, "replaced template variant");
        }
        previous
    }

    /// Returns the variant for `model`, or `default` when none is registered.
    pub fn resolve<'a>(&'a self, model: &str, default: &'a str) -> &'a str {
        self.get(model).unwrap_or(default)
    }

    /// Returns the variant registered for `model`.
    pub fn get(&self, model: &str) -> Option<&str> {
        self.variants.get(model).map(String::as_str)
    }

    /// Models with a registered variant, sorted.
    pub fn models(&self) -> Vec<String> {
        let mut models: Vec<String> = self.variants.keys().cloned().collect();
        models.sort();
        models
    }

    /// Number of registered variants.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Returns `true` if no variant is registered.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_falls_back_to_default() {
        let table = DispatchTable::new();
        assert!(table.is_empty());
        assert_eq!(table.resolve("any/model", "default"), "default");
    }

    #[test]
    fn test_register_then_resolve() {
        let mut table = DispatchTable::new();
        assert_eq!(table.register("x", "variant x"), None);

        assert_eq!(table.resolve("x", "default"), "variant x");
        assert_eq!(table.resolve("y", "default"), "default");
    }

    #[test]
    fn test_register_overwrites() {
        let mut table = DispatchTable::new();
        table.register("x", "first");
        let previous = table.register("x", "second");

        assert_eq!(previous.as_deref(), Some("first"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("x"), Some("second"));
    }

    #[test]
    fn test_models_sorted() {
        let mut table = DispatchTable::new();
        table.register("b", "");
        table.register("a", "");
        assert_eq!(table.models(), vec!["a", "b"]);
    }
}
