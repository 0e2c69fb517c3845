//! Chat completion [`Request`] types.

use std::num::NonZeroU16;

use crate::Model;
use serde::{Deserialize, Serialize};

pub mod message;
pub use message::{Message, Role};

/// Request body for the chat completion endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// [`Model`] to use for inference.
    pub model: Model,
    /// Input [`Message`]s. A new assistant message is generated from these.
    pub messages: Vec<Message>,
    /// If `true`, the response will be a stream of [`Chunk`]s. If `false`, the
    /// response will be a single [`Completion`].
    ///
    /// [`Chunk`]: crate::stream::Chunk
    /// [`Completion`]: crate::response::Completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Temperature for sampling. Must be between 0 and 2. Higher values mean
    /// more randomness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Max tokens to generate.
    pub max_tokens: NonZeroU16,
}

impl Request {
    /// Default temperature. Translations and definitions should be stable.
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;
    /// Default maximum number of generated tokens.
    pub const DEFAULT_MAX_TOKENS: u16 = 1024;

    /// Turn streaming on.
    ///
    /// **Note**: [`Client::stream`] and [`Client::message`] overwrite this.
    ///
    /// [`Client::stream`]: crate::Client::stream
    /// [`Client::message`]: crate::Client::message
    pub fn stream(mut self) -> Self {
        self.stream = Some(true);
        self
    }

    /// Turn streaming off.
    pub fn no_stream(mut self) -> Self {
        self.stream = Some(false);
        self
    }

    /// Set the [`model`].
    ///
    /// [`model`]: Request::model
    pub fn model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Set the [`temperature`].
    ///
    /// [`temperature`]: Request::temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the [`max_tokens`].
    ///
    /// [`max_tokens`]: Request::max_tokens
    pub fn max_tokens(mut self, max_tokens: NonZeroU16) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Add a [`Message`] to [`messages`].
    ///
    /// [`messages`]: Request::messages
    pub fn add_message<M>(mut self, message: M) -> Self
    where
        M: Into<Message>,
    {
        self.messages.push(message.into());
        self
    }

    /// A copy of `self` with `prompt` as the only user message. Settings such
    /// as the model and temperature are kept.
    pub fn user<S>(&self, prompt: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            messages: vec![Message::user(prompt)],
            ..self.clone()
        }
    }
}

impl Default for Request {
    fn default() -> Self {
        Self {
            model: Model::default(),
            messages: Vec::new(),
            stream: None,
            temperature: Some(Self::DEFAULT_TEMPERATURE),
            max_tokens: NonZeroU16::new(Self::DEFAULT_MAX_TOKENS)
                .unwrap_or(NonZeroU16::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_json() {
        let request = Request::default().user("hello").no_stream();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "deepseek-chat",
                "messages": [{"role": "user", "content": "hello"}],
                "stream": false,
                "temperature": 0.3f32,
                "max_tokens": 1024,
            })
        );
    }

    #[test]
    fn test_user_replaces_messages() {
        let base = Request::default()
            .model(Model::Reasoner)
            .add_message(Message::system("be brief"))
            .add_message(Message::user("first"));
        let request = base.user("second");

        assert_eq!(request.model, Model::Reasoner);
        assert_eq!(request.messages, vec![Message::user("second")]);
        // The template is untouched.
        assert_eq!(base.messages.len(), 2);
    }

    #[test]
    fn test_stream_toggle() {
        assert_eq!(Request::default().stream().stream, Some(true));
        assert_eq!(Request::default().stream().no_stream().stream, Some(false));
        assert!(serde_json::to_value(Request::default()).unwrap()["stream"]
            .is_null());
    }
}
