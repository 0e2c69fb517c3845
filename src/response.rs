//! [`Response`] types for the chat completion endpoint.

use derive_more::derive::IsVariant;
use serde::{Deserialize, Serialize};

use crate::request;

/// Sucessful API response: a whole [`Completion`] or a [`Stream`] of chunks.
///
/// [`Stream`]: crate::Stream
#[derive(IsVariant)]
pub enum Response {
    /// Single [`Completion`] from the API.
    Message {
        #[allow(missing_docs)]
        completion: Completion,
    },
    /// [`Stream`] of [`Chunk`]s.
    ///
    /// [`Stream`]: crate::Stream
    /// [`Chunk`]: crate::stream::Chunk
    Stream {
        #[allow(missing_docs)]
        stream: crate::Stream,
    },
}

impl Response {
    /// Convert a [`Response::Stream`] variant into a [`crate::Stream`].
    pub fn into_stream(self) -> Option<crate::Stream> {
        match self {
            Self::Stream { stream } => Some(stream),
            _ => None,
        }
    }

    /// Convert a [`Response::Message`] variant into a [`Completion`].
    pub fn into_completion(self) -> Option<Completion> {
        match self {
            Self::Message { completion } => Some(completion),
            _ => None,
        }
    }
}

/// A complete, non-streaming answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Unique `id` for the completion.
    #[serde(default)]
    pub id: String,
    /// Model that generated the completion, as reported by the server.
    #[serde(default)]
    pub model: String,
    /// Generated choices. Only one is ever requested.
    pub choices: Vec<Choice>,
    /// Usage statistics.
    #[serde(default)]
    pub usage: Usage,
}

impl Completion {
    /// Text of the first choice, or an empty string if there is none.
    pub fn text(&self) -> &str {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .unwrap_or_default()
    }

    /// Why the first choice stopped, if known.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.choices.first().and_then(|choice| choice.finish_reason)
    }
}

/// One generated answer in a [`Completion`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Position in [`Completion::choices`].
    #[serde(default)]
    pub index: usize,
    /// The generated [`request::Message`].
    pub message: request::Message,
    /// The reason the model stopped generating tokens.
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Reason the model stopped generating tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model reached a natural stopping point. This is the terminator
    /// marker of a normal stream.
    Stop,
    /// Maximum tokens reached.
    Length,
    /// Output was withheld by the content filter.
    ContentFilter,
    /// A tool was called.
    ToolCalls,
    /// The server ran out of resources mid-generation.
    InsufficientSystemResource,
}

/// Usage statistics from the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Usage {
    /// Number of input tokens used.
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Number of output tokens generated.
    #[serde(default)]
    pub completion_tokens: u64,
    /// Sum of the above. This is the count reported to the user.
    #[serde(default)]
    pub total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    pub const RESPONSE_JSON: &str = r#"{
    "id": "930c60df-bf64-41c9-a88e-3ec75f81e00e",
    "object": "chat.completion",
    "created": 1705651092,
    "model": "deepseek-chat",
    "choices": [
        {
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "Hello! How can I help you today?"
            },
            "logprobs": null,
            "finish_reason": "stop"
        }
    ],
    "usage": {
        "prompt_tokens": 16,
        "completion_tokens": 10,
        "total_tokens": 26
    },
    "system_fingerprint": "fp_44709d6fcb"
}"#;

    #[test]
    fn test_deserialize_completion() {
        let completion: Completion =
            serde_json::from_str(RESPONSE_JSON).unwrap();
        assert_eq!(completion.id, "930c60df-bf64-41c9-a88e-3ec75f81e00e");
        assert_eq!(completion.model, "deepseek-chat");
        assert_eq!(completion.text(), "Hello! How can I help you today?");
        assert_eq!(completion.finish_reason(), Some(FinishReason::Stop));
        assert_eq!(completion.usage.total_tokens, 26);
    }

    #[test]
    fn test_empty_choices() {
        let completion: Completion =
            serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(completion.text(), "");
        assert_eq!(completion.finish_reason(), None);
        assert_eq!(completion.usage, Usage::default());
    }

    #[test]
    fn test_into_completion() {
        let completion: Completion =
            serde_json::from_str(RESPONSE_JSON).unwrap();
        let response = Response::Message {
            completion: completion.clone(),
        };
        assert!(response.is_message());
        assert_eq!(response.into_completion(), Some(completion));
    }

    #[test]
    fn test_into_stream() {
        let response = Response::Stream {
            stream: crate::stream::tests::mock_stream(include_str!(
                "../test/data/chat.stream.txt"
            )),
        };
        assert!(response.is_stream());
        assert!(response.into_stream().is_some());
    }
}
