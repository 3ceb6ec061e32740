//! Parameterized prompt templates with per-model dispatch.

use crate::args::{Args, Param, Signature, is_reserved};
use crate::dispatch::DispatchTable;
use crate::engine::{JinjaEngine, PromptEngine};
use crate::error::{PromptError, Result};
use crate::registry::{self, ModelRegistry};
use crate::tokens::SpecialTokens;
use minijinja::Value;
use std::collections::BTreeMap;

/// A prompt template: a source text plus the parameters it is called with.
///
/// A template renders in two modes:
///
/// - [`render`](Self::render) renders the default source with every special
///   token (`bos`, `eos`, `user`, `assistant`, `system`) set to empty strings;
/// - [`for_model`](Self::for_model) selects a registered model, picks the
///   model's variant if one was [registered](Self::register), and exposes
///   the model's special tokens to the source.
///
/// # Examples
///
/// ```
/// use promptkit::{Args, Template};
///
/// let mut prompt = Template::new("prompt", ["query"], "{{ bos + query + eos }}")?;
/// prompt.register("openai-community/gpt2", "Q: {{ query }}{{ eos }}")?;
///
/// let args = Args::new().kwarg("query", "question");
/// assert_eq!(prompt.render(&args)?, "question");
/// assert_eq!(
///     prompt.for_model("mistralai/Mistral-7B-v0.1")?.render(&args)?,
///     "<s>question</s>"
/// );
/// assert_eq!(
///     prompt.for_model("openai-community/gpt2")?.render(&args)?,
///     "Q: question<|endoftext|>"
/// );
/// # Ok::<(), promptkit::PromptError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    signature: Signature,
    fixed: BTreeMap<String, Value>,
    source: String,
    variants: DispatchTable,
}

impl Template {
    /// Declares a template from its parameters and source text.
    ///
    /// The source is parsed immediately so syntax errors surface at
    /// declaration rather than on first render.
    ///
    /// # Errors
    ///
    /// - any [`Signature::new`] error for an invalid parameter list
    /// - [`PromptError::TemplateSyntax`] if the source does not parse
    /// - [`PromptError::UndeclaredVariable`] if the source reads a variable
    ///   that is neither a parameter nor a special token
    pub fn new<I, P>(name: impl Into<String>, params: I, source: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        let template = Self {
            name: name.into(),
            signature: Signature::new(params)?,
            fixed: BTreeMap::new(),
            source: source.into(),
            variants: DispatchTable::new(),
        };
        template.validate(&template.source)?;

        tracing::debug!(
            template = %template.name,
            params = template.signature.params().len(),
            "declared template"
        );
        Ok(template)
    }

    /// Template name, used in error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Default source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parameters still accepted at call time.
    pub fn params(&self) -> &[Param] {
        self.signature.params()
    }

    /// Models with a registered variant, sorted.
    pub fn variants(&self) -> Vec<String> {
        self.variants.models()
    }

    /// Registers an alternate source for `model`.
    ///
    /// The variant shares this template's parameters and is validated the
    /// same way as the default source. Registering twice for the same model
    /// replaces the earlier variant.
    ///
    /// # Errors
    ///
    /// [`PromptError::TemplateSyntax`] or [`PromptError::UndeclaredVariable`]
    /// if the variant is invalid; the table is left unchanged.
    pub fn register(&mut self, model: impl Into<String>, source: impl Into<String>) -> Result<()> {
        let source = source.into();
        self.validate(&source)?;
        self.variants.register(model, source);
        Ok(())
    }

    /// Returns the source used for `model`: its variant if registered,
    /// otherwise the default source.
    pub fn resolve(&self, model: &str) -> &str {
        self.variants.resolve(model, &self.source)
    }

    /// Renders the default source without a model.
    ///
    /// # Errors
    ///
    /// Binding errors ([`PromptError::MissingArgument`],
    /// [`PromptError::UnexpectedArgument`], ...) are raised before anything
    /// is rendered; engine failures surface as
    /// [`PromptError::TemplateRender`].
    pub fn render(&self, args: &Args) -> Result<String> {
        self.render_source(&self.source, &SpecialTokens::default(), args)
    }

    /// Selects `model` from the process-wide registry.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::UnknownModel`] if `model` is not registered.
    pub fn for_model(&self, model: &str) -> Result<ModelTemplate<'_>> {
        let tokens = registry::lookup(model)?;
        Ok(self.bind_model(model, tokens))
    }

    /// Selects `model` from an explicit registry.
    ///
    /// # Errors
    ///
    /// Returns [`PromptError::UnknownModel`] if `model` is not in `registry`.
    pub fn for_model_in(&self, registry: &ModelRegistry, model: &str) -> Result<ModelTemplate<'_>> {
        let tokens = registry.lookup(model)?;
        Ok(self.bind_model(model, tokens))
    }

    /// Fixes some arguments ahead of time and returns the narrower template.
    ///
    /// Leading positional values and keyword values are bound now; the
    /// returned template accepts only the remaining parameters. Variants are
    /// carried over.
    ///
    /// ```
    /// use promptkit::{Args, Template};
    ///
    /// let solve = Template::new(
    ///     "solve_task",
    ///     ["name", "objective", "task"],
    ///     "Your name is {{name}}. Your objective is to {{objective}}. Solve: {{task}}",
    /// )?;
    /// let hal = solve.partial(&Args::new().arg("HAL").arg("travel to Jupiter"))?;
    ///
    /// assert_eq!(
    ///     hal.render(&Args::new().arg("open the pod bay doors"))?,
    ///     "Your name is HAL. Your objective is to travel to Jupiter. Solve: open the pod bay doors"
    /// );
    /// # Ok::<(), promptkit::PromptError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Same binding errors as [`render`](Self::render), except that unset
    /// parameters are allowed.
    pub fn partial(&self, args: &Args) -> Result<Template> {
        let (signature, fixed) = self.signature.bind_partial(&self.name, args)?;

        let mut all_fixed = self.fixed.clone();
        all_fixed.extend(fixed);

        Ok(Self {
            name: self.name.clone(),
            signature,
            fixed: all_fixed,
            source: self.source.clone(),
            variants: self.variants.clone(),
        })
    }

    fn bind_model(&self, model: &str, tokens: SpecialTokens) -> ModelTemplate<'_> {
        ModelTemplate {
            template: self,
            model: model.to_string(),
            source: self.resolve(model),
            tokens,
        }
    }

    fn declares(&self, name: &str) -> bool {
        self.signature.names().any(|n| n == name) || self.fixed.contains_key(name)
    }

    fn validate(&self, source: &str) -> Result<()> {
        let referenced = JinjaEngine::shared().check(&self.name, source)?;
        match referenced
            .into_iter()
            .find(|var| !is_reserved(var) && !self.declares(var))
        {
            Some(name) => Err(PromptError::UndeclaredVariable {
                template: self.name.clone(),
                name,
            }),
            None => Ok(()),
        }
    }

    fn render_source(&self, source: &str, tokens: &SpecialTokens, args: &Args) -> Result<String> {
        let mut ctx = self.fixed.clone();
        ctx.extend(self.signature.bind(&self.name, args)?);

        ctx.insert("bos".into(), Value::from(tokens.bos.as_str()));
        ctx.insert("eos".into(), Value::from(tokens.eos.as_str()));
        ctx.insert("user".into(), Value::from_object(tokens.user.clone()));
        ctx.insert("assistant".into(), Value::from_object(tokens.assistant.clone()));
        ctx.insert("system".into(), Value::from_object(tokens.system.clone()));

        tracing::debug!(template = %self.name, "rendering template");
        JinjaEngine::shared().render(&self.name, source, &ctx)
    }
}

/// A template bound to one model.
///
/// Returned by [`Template::for_model`]; rendering uses the model's variant
/// (or the default source) and the model's special tokens.
#[derive(Debug, Clone)]
pub struct ModelTemplate<'a> {
    template: &'a Template,
    model: String,
    source: &'a str,
    tokens: SpecialTokens,
}

impl ModelTemplate<'_> {
    /// The selected model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The source that will be rendered.
    pub fn source(&self) -> &str {
        self.source
    }

    /// The selected model's special tokens.
    pub fn tokens(&self) -> &SpecialTokens {
        &self.tokens
    }

    /// Renders the resolved source with the model's special tokens.
    ///
    /// # Errors
    ///
    /// Same as [`Template::render`].
    pub fn render(&self, args: &Args) -> Result<String> {
        tracing::debug!(model = %self.model, "rendering for model");
        self.template.render_source(self.source, &self.tokens, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::Limits;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.register(
            "mistralai/Mistral-7B-v0.1",
            SpecialTokens::new("<s>", "</s>"),
        );
        registry.register("google/gemma-2-9b", SpecialTokens::new("<bos>", "<eos>"));
        registry.register(
            "acme/chat",
            SpecialTokens::default().with_user(Limits::new("<u>", "</u>")),
        );
        registry
    }

    #[test]
    fn test_render_with_special_tokens() {
        let tpl = Template::new("prompt", ["query"], "{{ bos + query + eos }}").unwrap();
        let registry = registry();
        let args = Args::new().kwarg("query", "question");

        let mistral = tpl
            .for_model_in(&registry, "mistralai/Mistral-7B-v0.1")
            .unwrap();
        assert_eq!(mistral.render(&args).unwrap(), "<s>question</s>");

        let gemma = tpl.for_model_in(&registry, "google/gemma-2-9b").unwrap();
        assert_eq!(gemma.model(), "google/gemma-2-9b");
        assert_eq!(gemma.tokens(), &SpecialTokens::new("<bos>", "<eos>"));
        assert_eq!(gemma.render(&args).unwrap(), "<bos>question<eos>");
    }

    #[test]
    fn test_plain_render_uses_empty_tokens() {
        let tpl = Template::new(
            "prompt",
            ["query"],
            "{{ bos }}{{ user.begin }}{{ query }}{{ user.end }}{{ eos }}",
        )
        .unwrap();
        assert_eq!(tpl.render(&Args::new().arg("q")).unwrap(), "q");
    }

    #[test]
    fn test_bare_role_markers_render_as_strings() {
        let tpl = Template::new("prompt", ["q"], "[{{ user }}]{{ q }}[{{ system }}]").unwrap();
        assert_eq!(tpl.render(&Args::new().arg("x")).unwrap(), "[]x[]");

        let tpl = Template::new("prompt", ["q"], "{{ user }}{{ q }}{{ assistant }}").unwrap();
        assert_eq!(tpl.render(&Args::new().arg("q")).unwrap(), "q");
        let rendered = tpl
            .for_model_in(&registry(), "acme/chat")
            .unwrap()
            .render(&Args::new().arg("hi"))
            .unwrap();
        assert_eq!(rendered, "<u>hi");
    }

    #[test]
    fn test_role_markers_in_template() {
        let tpl = Template::new(
            "prompt",
            ["query"],
            "{{ user.begin }}{{ query }}{{ user.end }}",
        )
        .unwrap();
        let rendered = tpl
            .for_model_in(&registry(), "acme/chat")
            .unwrap()
            .render(&Args::new().arg("hi"))
            .unwrap();
        assert_eq!(rendered, "<u>hi</u>");
    }

    #[test]
    fn test_unknown_model() {
        let tpl = Template::new("prompt", ["query"], "{{ query }}").unwrap();
        let err = tpl.for_model_in(&registry(), "nobody/nothing").unwrap_err();
        assert!(matches!(err, PromptError::UnknownModel(model) if model == "nobody/nothing"));
    }

    #[test]
    fn test_dispatch_and_fallback() {
        let mut tpl = Template::new("simple_prompt", ["query"], "{{ query }}").unwrap();
        tpl.register("acme/chat", "name: {{ query }}").unwrap();

        assert_eq!(tpl.variants(), vec!["acme/chat"]);
        assert_eq!(tpl.resolve("acme/chat"), "name: {{ query }}");
        assert_eq!(tpl.resolve("google/gemma-2-9b"), "{{ query }}");

        let registry = registry();
        let args = Args::new().arg("test");
        assert_eq!(tpl.render(&args).unwrap(), "test");
        assert_eq!(
            tpl.for_model_in(&registry, "acme/chat")
                .unwrap()
                .render(&args)
                .unwrap(),
            "name: test"
        );
        assert_eq!(
            tpl.for_model_in(&registry, "google/gemma-2-9b")
                .unwrap()
                .render(&args)
                .unwrap(),
            "test"
        );
    }

    #[test]
    fn test_invalid_variant_is_rejected() {
        let mut tpl = Template::new("prompt", ["query"], "{{ query }}").unwrap();
        assert!(matches!(
            tpl.register("acme/chat", "{{ query"),
            Err(PromptError::TemplateSyntax { .. })
        ));
        assert!(matches!(
            tpl.register("acme/chat", "{{ other }}"),
            Err(PromptError::UndeclaredVariable { .. })
        ));
        assert!(tpl.variants().is_empty());
    }

    #[test]
    fn test_declaration_errors() {
        assert!(matches!(
            Template::new("t", ["query"], "{% for x in %}"),
            Err(PromptError::TemplateSyntax { .. })
        ));
        assert!(matches!(
            Template::new("t", ["query"], "{{ query }} {{ missing }}"),
            Err(PromptError::UndeclaredVariable { name, .. }) if name == "missing"
        ));
        assert!(matches!(
            Template::new("t", ["eos"], "{{ eos }}"),
            Err(PromptError::ReservedName(_))
        ));
    }

    #[test]
    fn test_missing_argument_produces_no_output() {
        let tpl = Template::new("prompt", ["query"], "{{ query }}").unwrap();
        match tpl.render(&Args::new()).unwrap_err() {
            PromptError::MissingArgument { template, name } => {
                assert_eq!(template, "prompt");
                assert_eq!(name, "query");
            }
            other => panic!("expected MissingArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_rejects_fixed_param() {
        let tpl = Template::new("t", ["a", "b"], "{{ a }}{{ b }}").unwrap();
        let partial = tpl.partial(&Args::new().kwarg("a", "x")).unwrap();

        assert_eq!(partial.params().len(), 1);
        assert_eq!(partial.render(&Args::new().arg("y")).unwrap(), "xy");
        assert!(matches!(
            partial.render(&Args::new().arg("y").kwarg("a", "z")),
            Err(PromptError::UnexpectedArgument { .. })
        ));
    }

    #[test]
    fn test_render_is_deterministic() {
        let tpl = Template::new(
            "t",
            [Param::required("items"), Param::optional("sep", ", ")],
            "{{ items | join(sep) }}",
        )
        .unwrap();
        let args = Args::new().arg(vec!["a", "b", "c"]);
        let first = tpl.render(&args).unwrap();
        assert_eq!(first, "a, b, c");
        for _ in 0..10 {
            assert_eq!(tpl.render(&args).unwrap(), first);
        }
    }
}
