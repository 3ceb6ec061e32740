//! Template parameters and call-site argument binding.

use crate::error::{PromptError, Result};
use minijinja::Value;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Variable names bound automatically from the selected model.
pub const RESERVED_NAMES: [&str; 5] = ["bos", "eos", "user", "assistant", "system"];

/// Returns `true` if `name` is one of the special-token variables.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// A declared template parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Variable name used in the template source.
    pub name: String,

    /// Value used when the caller omits the argument.
    pub default: Option<Value>,
}

impl Param {
    /// A parameter the caller must supply.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    /// A parameter with a default value.
    #[must_use]
    pub fn optional<T: Serialize>(name: impl Into<String>, default: T) -> Self {
        Self {
            name: name.into(),
            default: Some(Value::from_serialize(&default)),
        }
    }

    /// Returns `true` if the parameter has no default.
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

impl From<&str> for Param {
    fn from(name: &str) -> Self {
        Param::required(name)
    }
}

impl From<String> for Param {
    fn from(name: String) -> Self {
        Param::required(name)
    }
}

/// Arguments supplied at a call site.
///
/// # Examples
///
/// ```
/// use promptkit::Args;
///
/// let args = Args::new().arg("test").kwarg("other_var", "kwarg");
/// assert_eq!(args.positional().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Args {
    positional: Vec<Value>,
    keyword: BTreeMap<String, Value>,
}

impl Args {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn arg<T: Serialize>(mut self, value: T) -> Self {
        self.positional.push(Value::from_serialize(&value));
        self
    }

    /// Sets a keyword argument. Setting the same keyword twice keeps the
    /// last value.
    #[must_use]
    pub fn kwarg<T: Serialize>(mut self, name: impl Into<String>, value: T) -> Self {
        self.keyword
            .insert(name.into(), Value::from_serialize(&value));
        self
    }

    /// Positional values in call order.
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    /// Keyword values by name.
    pub fn keyword(&self) -> &BTreeMap<String, Value> {
        &self.keyword
    }
}

/// Ordered parameter list of a template.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    /// Builds a signature from declared parameters.
    ///
    /// # Errors
    ///
    /// - [`PromptError::ReservedName`] if a parameter uses a special-token name
    /// - [`PromptError::DuplicateParameter`] if a name is declared twice
    /// - [`PromptError::InvalidSignature`] if a required parameter follows an
    ///   optional one
    pub fn new<I, P>(params: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<Param>,
    {
        let params: Vec<Param> = params.into_iter().map(Into::into).collect();

        let mut seen = BTreeSet::new();
        let mut saw_default = false;
        for param in &params {
            if is_reserved(&param.name) {
                return Err(PromptError::ReservedName(param.name.clone()));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(PromptError::DuplicateParameter(param.name.clone()));
            }
            if param.is_required() && saw_default {
                return Err(PromptError::InvalidSignature(format!(
                    "required parameter `{}` follows a parameter with a default",
                    param.name
                )));
            }
            saw_default |= !param.is_required();
        }

        Ok(Self { params })
    }

    /// Declared parameters in order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Declared parameter names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|p| p.name.as_str())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    /// Binds call-site arguments to parameters.
    ///
    /// Positional values fill parameters in order, keywords fill parameters
    /// by name, and anything left takes its default.
    ///
    /// # Errors
    ///
    /// - [`PromptError::TooManyArguments`] for surplus positional values
    /// - [`PromptError::UnexpectedArgument`] for an unknown keyword
    /// - [`PromptError::DuplicateArgument`] for a keyword already filled
    ///   positionally
    /// - [`PromptError::MissingArgument`] for a required parameter left unset
    pub fn bind(&self, template: &str, args: &Args) -> Result<BTreeMap<String, Value>> {
        let mut bound = self.bind_given(template, args)?;

        for param in &self.params {
            if bound.contains_key(&param.name) {
                continue;
            }
            match &param.default {
                Some(default) => {
                    bound.insert(param.name.clone(), default.clone());
                }
                None => {
                    return Err(PromptError::MissingArgument {
                        template: template.to_string(),
                        name: param.name.clone(),
                    });
                }
            }
        }

        Ok(bound)
    }

    /// Binds only the supplied arguments and returns the signature of the
    /// parameters still open, together with the fixed values.
    ///
    /// # Errors
    ///
    /// Same as [`bind`](Self::bind), except that unset parameters are not an
    /// error.
    pub fn bind_partial(
        &self,
        template: &str,
        args: &Args,
    ) -> Result<(Signature, BTreeMap<String, Value>)> {
        let fixed = self.bind_given(template, args)?;
        let params = self
            .params
            .iter()
            .filter(|p| !fixed.contains_key(&p.name))
            .cloned()
            .collect();
        Ok((Signature { params }, fixed))
    }

    fn bind_given(&self, template: &str, args: &Args) -> Result<BTreeMap<String, Value>> {
        if args.positional.len() > self.params.len() {
            return Err(PromptError::TooManyArguments {
                template: template.to_string(),
                expected: self.params.len(),
                given: args.positional.len(),
            });
        }

        let mut bound: BTreeMap<String, Value> = self
            .params
            .iter()
            .zip(&args.positional)
            .map(|(param, value)| (param.name.clone(), value.clone()))
            .collect();

        for (name, value) in &args.keyword {
            let Some(index) = self.position(name) else {
                return Err(PromptError::UnexpectedArgument {
                    template: template.to_string(),
                    name: name.clone(),
                });
            };
            if index < args.positional.len() {
                return Err(PromptError::DuplicateArgument {
                    template: template.to_string(),
                    name: name.clone(),
                });
            }
            bound.insert(name.clone(), value.clone());
        }

        Ok(bound)
    }
}
