//! Special-token records for registered models.

use crate::chat::Role;
use minijinja::Value;
use minijinja::value::{Object, ObjectRepr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A pair of markers surrounding one chat turn.
///
/// Inside templates `{{ user.begin }}` and `{{ user.end }}` read the
/// markers. A bare `{{ user }}` prints the opening marker, so it renders as
/// an empty string when no model is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Marker emitted before the turn content.
    pub begin: String,

    /// Marker emitted after the turn content.
    pub end: String,
}

impl Limits {
    /// Creates a new pair of markers.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptkit::Limits;
    ///
    /// let inst = Limits::new("[INST]", "[/INST]");
    /// assert_eq!(inst.begin, "[INST]");
    /// ```
    #[must_use]
    pub fn new(begin: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            begin: begin.into(),
            end: end.into(),
        }
    }

    /// Wraps `content` in the markers.
    pub fn wrap(&self, content: &str) -> String {
        let mut out = String::with_capacity(self.begin.len() + content.len() + self.end.len());
        out.push_str(&self.begin);
        out.push_str(content);
        out.push_str(&self.end);
        out
    }
}

impl Object for Limits {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "begin" => Some(Value::from(self.begin.as_str())),
            "end" => Some(Value::from(self.end.as_str())),
            _ => None,
        }
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        Self: Sized + 'static,
    {
        f.write_str(&self.begin)
    }
}

/// Special tokens and chat delimiters of one model.
///
/// This is the value stored in the [`ModelRegistry`](crate::ModelRegistry).
/// The default value, where every marker is empty, stands for "no model
/// selected".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialTokens {
    /// Beginning-of-sequence token.
    pub bos: String,

    /// End-of-sequence token.
    pub eos: String,

    /// Delimiters of user turns.
    pub user: Limits,

    /// Delimiters of assistant turns.
    pub assistant: Limits,

    /// Delimiters of system turns.
    pub system: Limits,

    /// Delimiters of extension roles, keyed by role name.
    pub roles: BTreeMap<String, Limits>,
}

impl SpecialTokens {
    /// Creates an entry with sequence tokens only.
    #[must_use]
    pub fn new(bos: impl Into<String>, eos: impl Into<String>) -> Self {
        Self {
            bos: bos.into(),
            eos: eos.into(),
            ..Default::default()
        }
    }

    /// Sets the user turn delimiters.
    #[must_use]
    pub fn with_user(mut self, limits: Limits) -> Self {
        self.user = limits;
        self
    }

    /// Sets the assistant turn delimiters.
    #[must_use]
    pub fn with_assistant(mut self, limits: Limits) -> Self {
        self.assistant = limits;
        self
    }

    /// Sets the system turn delimiters.
    #[must_use]
    pub fn with_system(mut self, limits: Limits) -> Self {
        self.system = limits;
        self
    }

    /// Adds delimiters for an extension role such as `tool`.
    #[must_use]
    pub fn with_role(mut self, name: impl Into<String>, limits: Limits) -> Self {
        self.roles.insert(name.into(), limits);
        self
    }

    /// Returns the delimiters used for `role`, if this model defines them.
    ///
    /// The three built-in roles always resolve, whether written as a
    /// variant or as `Role::Other("user")`; extension roles resolve only
    /// when present in [`roles`](Self::roles).
    pub fn limits(&self, role: &Role) -> Option<&Limits> {
        match role.as_str() {
            "system" => Some(&self.system),
            "user" => Some(&self.user),
            "assistant" => Some(&self.assistant),
            name => self.roles.get(name),
        }
    }
}
