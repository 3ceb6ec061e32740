//! Registry configuration loaded from TOML.
//!
//! A registry config adds models to (or overrides models of) the built-in
//! table without recompiling:
//!
//! ```toml
//! [models."acme/chat-1"]
//! bos = "<s>"
//! eos = "</s>"
//!
//! [models."acme/chat-1".user]
//! begin = "<|user|>"
//! end = "<|end|>"
//!
//! [models."acme/chat-1".roles.tool]
//! begin = "<|tool|>"
//! end = "<|end|>"
//! ```
//!
//! Fields left out default to empty strings.

use crate::error::{PromptError, Result};
use crate::tokens::SpecialTokens;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Models to register, keyed by identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Special tokens per model identifier.
    pub models: BTreeMap<String, SpecialTokens>,
}

impl RegistryConfig {
    /// Loads a registry config from a TOML file.
    ///
    /// # Errors
    ///
    /// - [`PromptError::ConfigNotFound`] if `path` does not exist
    /// - [`PromptError::ConfigParse`] if the file is not a valid config
    /// - [`PromptError::Io`] for any other read failure
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_config(path)?;
        parse_config(&content, path)
    }
}

impl FromStr for RegistryConfig {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self> {
        parse_config(s, Path::new("<memory>"))
    }
}

fn parse_config(content: &str, path: &Path) -> Result<RegistryConfig> {
    toml::from_str(content).map_err(|e| PromptError::ConfigParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Reads a config-like file, mapping a missing file to `ConfigNotFound`.
pub(crate) fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PromptError::ConfigNotFound(PathBuf::from(path))
        } else {
            PromptError::Io(e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::Limits;

    #[test]
    fn test_parse_full_entry() {
        let config: RegistryConfig = r#"
[models."acme/chat-1"]
bos = "<s>"
eos = "</s>"

[models."acme/chat-1".user]
begin = "<|user|>"
end = "<|end|>"

[models."acme/chat-1".roles.tool]
begin = "<|tool|>"
end = "<|end|>"
"#
        .parse()
        .unwrap();

        let entry = &config.models["acme/chat-1"];
        assert_eq!(entry.bos, "<s>");
        assert_eq!(entry.user, Limits::new("<|user|>", "<|end|>"));
        assert_eq!(entry.assistant, Limits::default());
        assert_eq!(entry.roles["tool"].begin, "<|tool|>");
    }

    #[test]
    fn test_partial_entry_defaults_to_empty() {
        let config: RegistryConfig = "[models.\"acme/eos-only\"]\neos = \"<end>\"\n"
            .parse()
            .unwrap();
        let entry = &config.models["acme/eos-only"];
        assert_eq!(entry.bos, "");
        assert_eq!(entry.eos, "<end>");
    }

    #[test]
    fn test_empty_config() {
        let config: RegistryConfig = "".parse().unwrap();
        assert!(config.models.is_empty());
    }

    #[test]
    fn test_invalid_toml() {
        let result = "invalid { toml".parse::<RegistryConfig>();
        match result.unwrap_err() {
            PromptError::ConfigParse { path, .. } => assert_eq!(path, PathBuf::from("<memory>")),
            other => panic!("expected ConfigParse, got {other:?}"),
        }
    }
}
