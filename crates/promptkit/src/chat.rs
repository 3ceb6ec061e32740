//! Role-tagged chat histories rendered with a model's turn delimiters.
//!
//! A [`Chat`] keeps the full history. What actually gets rendered is decided
//! by its filter strategy, so history curation (dropping the system prompt,
//! keeping the last few turns, retrieval) can change without touching the
//! stored messages or the model's token format.
//!
//! # Examples
//!
//! ```
//! use promptkit::{Chat, Limits, Message, ModelRegistry, SpecialTokens};
//!
//! let mut registry = ModelRegistry::new();
//! registry.register(
//!     "acme/chat",
//!     SpecialTokens::default()
//!         .with_system(Limits::new("<sys>", "</sys>"))
//!         .with_user(Limits::new("<usr>", "</usr>")),
//! );
//!
//! let chat = Chat::with_system("S") + Message::user("Q");
//! assert_eq!(chat.render_with(&registry, "acme/chat")?, "<sys>S</sys><usr>Q</usr>");
//! # Ok::<(), promptkit::PromptError>(())
//! ```

use crate::error::{PromptError, Result};
use crate::registry::{self, ModelRegistry};
use crate::tokens::SpecialTokens;
use serde::{Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, AddAssign, Index};
use std::str::FromStr;
use std::sync::Arc;

/// Role of a chat message.
///
/// Roles compare, hash and serialize by their lowercase name, so
/// `Role::Other("user".into())` is the same role as `Role::User`.
#[derive(Debug, Clone)]
pub enum Role {
    /// System instructions.
    System,
    /// End-user turn.
    User,
    /// Model turn.
    Assistant,
    /// Extension role such as `tool`; needs delimiters in the model's
    /// [`roles`](crate::SpecialTokens::roles) table to render.
    Other(String),
}

impl Role {
    /// Lowercase role name.
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other(name) => name,
        }
    }
}

impl PartialEq for Role {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Role {}

impl Hash for Role {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        match name {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            other => Role::Other(other.to_string()),
        }
    }
}

impl FromStr for Role {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Role::from(s))
    }
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Who speaks.
    pub role: Role,
    /// What is said.
    pub content: String,
}

impl Message {
    /// Creates a message with an explicit role.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Strategy selecting which messages a [`Chat`] renders, and in what order.
pub type Filter = Arc<dyn Fn(&[Message]) -> Vec<Message> + Send + Sync>;

/// An ordered conversation history.
#[derive(Clone, Default)]
pub struct Chat {
    messages: Vec<Message>,
    filter: Option<Filter>,
}

impl fmt::Debug for Chat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chat")
            .field("messages", &self.messages)
            .field("custom_filter", &self.filter.is_some())
            .finish()
    }
}

impl Chat {
    /// Creates an empty chat.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chat that opens with a system message.
    #[must_use]
    pub fn with_system(content: impl Into<String>) -> Self {
        Self::from_messages([Message::system(content)])
    }

    /// Creates a chat from existing messages.
    #[must_use]
    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        Self {
            messages: messages.into_iter().collect(),
            filter: None,
        }
    }

    /// Installs a filter strategy.
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&[Message]) -> Vec<Message> + Send + Sync + 'static,
    {
        self.set_filter(filter);
        self
    }

    /// Replaces the filter strategy.
    pub fn set_filter<F>(&mut self, filter: F)
    where
        F: Fn(&[Message]) -> Vec<Message> + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
    }

    /// Restores the identity filter.
    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Stored messages, unfiltered.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Iterates over stored messages.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Returns the stored message at `index`.
    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing has been said yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages the filter selects for rendering. Stored history is not
    /// modified.
    pub fn filter(&self) -> Vec<Message> {
        match &self.filter {
            Some(filter) => filter(&self.messages),
            None => self.messages.clone(),
        }
    }

    /// Renders the filtered history for `model` from the process-wide
    /// registry.
    ///
    /// # Errors
    ///
    /// See [`render_with`](Self::render_with).
    pub fn render(&self, model: &str) -> Result<String> {
        let messages = self.filter();
        let tokens = registry::lookup(model)?;
        encode(&messages, &tokens, model)
    }

    /// Renders the filtered history for `model` from `registry`.
    ///
    /// Each message becomes `begin + content + end` using the delimiters of
    /// its role; fragments are concatenated in order with no separator.
    ///
    /// # Errors
    ///
    /// - [`PromptError::UnknownModel`] if `model` is not registered
    /// - [`PromptError::InvalidMessage`] if a filtered message has a role the
    ///   model defines no delimiters for; nothing is rendered in that case
    pub fn render_with(&self, registry: &ModelRegistry, model: &str) -> Result<String> {
        let messages = self.filter();
        let tokens = registry.lookup(model)?;
        encode(&messages, &tokens, model)
    }
}

// All messages are checked before the first fragment is produced.
fn encode(messages: &[Message], tokens: &SpecialTokens, model: &str) -> Result<String> {
    let mut turns = Vec::with_capacity(messages.len());
    for (index, message) in messages.iter().enumerate() {
        if message.role.as_str().trim().is_empty() {
            return Err(PromptError::InvalidMessage {
                index,
                reason: "empty role name".to_string(),
            });
        }
        let limits = tokens
            .limits(&message.role)
            .ok_or_else(|| PromptError::InvalidMessage {
                index,
                reason: format!("model {model} has no delimiters for role `{}`", message.role),
            })?;
        turns.push((limits, message.content.as_str()));
    }

    tracing::debug!(model = %model, turns = turns.len(), "rendering chat");
    Ok(turns
        .into_iter()
        .map(|(limits, content)| limits.wrap(content))
        .collect())
}

impl Add<Message> for Chat {
    type Output = Chat;

    fn add(mut self, message: Message) -> Chat {
        self.push(message);
        self
    }
}

impl AddAssign<Message> for Chat {
    fn add_assign(&mut self, message: Message) {
        self.push(message);
    }
}

impl Index<usize> for Chat {
    type Output = Message;

    fn index(&self, index: usize) -> &Message {
        &self.messages[index]
    }
}

impl Extend<Message> for Chat {
    fn extend<T: IntoIterator<Item = Message>>(&mut self, iter: T) {
        self.messages.extend(iter);
    }
}

impl FromIterator<Message> for Chat {
    fn from_iter<T: IntoIterator<Item = Message>>(iter: T) -> Self {
        Self::from_messages(iter)
    }
}

impl<'a> IntoIterator for &'a Chat {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ready-made filter strategies for [`Chat::with_filter`].
pub mod filters {
    use super::{Message, Role};

    /// Drops every message with `role`.
    pub fn drop_role(role: Role) -> impl Fn(&[Message]) -> Vec<Message> + Send + Sync + 'static {
        move |messages: &[Message]| {
            messages
                .iter()
                .filter(|m| m.role != role)
                .cloned()
                .collect()
        }
    }

    /// Keeps a leading system message plus the last `n` other messages.
    pub fn last(n: usize) -> impl Fn(&[Message]) -> Vec<Message> + Send + Sync + 'static {
        move |messages: &[Message]| {
            let (head, rest) = match messages.split_first() {
                Some((first, rest)) if first.role == Role::System => (Some(first), rest),
                _ => (None, messages),
            };
            let skip = rest.len().saturating_sub(n);
            head.into_iter()
                .chain(rest.iter().skip(skip))
                .cloned()
                .collect()
        }
    }
}
