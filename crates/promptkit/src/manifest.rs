//! Template manifests: templates declared in TOML files.
//!
//! ```toml
//! name = "simple"
//! source = "{{ query }}"
//!
//! [[params]]
//! name = "query"
//!
//! [[params]]
//! name = "tone"
//! default = "neutral"
//!
//! [variants]
//! "provider/name" = "name: {{ query }}"
//! ```

use crate::args::Param;
use crate::config::read_config;
use crate::error::{PromptError, Result};
use crate::template::Template;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// A template declaration read from TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateManifest {
    /// Template name.
    pub name: String,

    /// Default source text.
    pub source: String,

    /// Parameters in call order.
    #[serde(default)]
    pub params: Vec<ParamSpec>,

    /// Per-model variant sources.
    #[serde(default)]
    pub variants: BTreeMap<String, String>,
}

/// One parameter entry of a manifest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParamSpec {
    /// Variable name.
    pub name: String,

    /// Default value; the parameter is required when absent.
    #[serde(default)]
    pub default: Option<toml::Value>,
}

impl From<&ParamSpec> for Param {
    fn from(spec: &ParamSpec) -> Self {
        match &spec.default {
            Some(default) => Param::optional(spec.name.clone(), default),
            None => Param::required(spec.name.clone()),
        }
    }
}

impl TemplateManifest {
    /// Loads a manifest from a TOML file.
    ///
    /// # Errors
    ///
    /// - [`PromptError::ConfigNotFound`] if `path` does not exist
    /// - [`PromptError::ManifestParse`] if the file is not a valid manifest
    /// - [`PromptError::Io`] for any other read failure
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_config(path)?;
        parse_manifest(&content, path)
    }

    /// Declares the template and registers its variants.
    ///
    /// # Errors
    ///
    /// Any declaration error of [`Template::new`] or [`Template::register`].
    pub fn to_template(&self) -> Result<Template> {
        let mut template = Template::new(&self.name, &self.params, &self.source)?;
        for (model, source) in &self.variants {
            template.register(model, source)?;
        }
        Ok(template)
    }
}

impl FromStr for TemplateManifest {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self> {
        parse_manifest(s, Path::new("<memory>"))
    }
}

fn parse_manifest(content: &str, path: &Path) -> Result<TemplateManifest> {
    toml::from_str(content).map_err(|e| PromptError::ManifestParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
