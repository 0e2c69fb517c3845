//! [`Chunk`] [`Stream`] for streaming responses from the API as well as
//! associated types and errors only used when streaming.
use futures::{future, StreamExt};
use serde::{Deserialize, Serialize};
use std::{pin::Pin, task::Poll};

use crate::{
    client::ApiError,
    request::Role,
    response::{FinishReason, Usage},
};

/// Payload the server sends after the last chunk.
pub const DONE: &str = "[DONE]";

/// One server-sent chunk of a streaming completion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Id shared by every chunk of one completion.
    #[serde(default)]
    pub id: String,
    /// Model generating the completion.
    #[serde(default)]
    pub model: String,
    /// Partial choices. Usually exactly one.
    pub choices: Vec<ChunkChoice>,
    /// Token usage. Present on the final chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Partial [`Choice`] carried by a [`Chunk`].
///
/// [`Choice`]: crate::response::Choice
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Position of the choice.
    #[serde(default)]
    pub index: usize,
    /// Text to append to the answer.
    #[serde(default)]
    pub delta: Delta,
    /// Set on the chunk that ends the choice.
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Partial message content.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    /// Only sent on the first chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Text increment. May be empty or `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// One unit of a streamed answer, as consumed by the [`Requester`].
///
/// [`Requester`]: crate::requester::Requester
#[derive(Clone, Debug, PartialEq, derive_more::IsVariant)]
pub enum Increment {
    /// Partial text. May be empty.
    Text(String),
    /// Terminator marker. No further increments follow.
    Stop {
        /// Why generation stopped. [`FinishReason::Stop`] is the normal case.
        reason: FinishReason,
        /// Final token usage.
        usage: Usage,
    },
}

impl Chunk {
    /// Split the chunk into [`Increment`]s. A chunk that ends the choice
    /// yields its text (if any) followed by [`Increment::Stop`]. A chunk with
    /// no choices (for example a usage-only chunk) yields nothing.
    pub fn into_increments(self) -> Vec<Increment> {
        let usage = self.usage.unwrap_or_default();
        let Some(choice) = self.choices.into_iter().next() else {
            return Vec::new();
        };
        let text = choice.delta.content.unwrap_or_default();

        match choice.finish_reason {
            None => vec![Increment::Text(text)],
            Some(reason) if text.is_empty() => {
                vec![Increment::Stop { reason, usage }]
            }
            Some(reason) => {
                vec![Increment::Text(text), Increment::Stop { reason, usage }]
            }
        }
    }
}

/// Internal enum for the API result so we don't have to add an error variant to
/// [`Chunk`].
#[derive(Deserialize)]
#[serde(untagged)]
enum ApiResult {
    /// Successful chunk.
    Chunk(Chunk),
    /// Error payload.
    Error { error: ApiError },
}

/// Stream error. This can be transport errors, JSON parsing errors or errors
/// from the API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// [`eventsource_stream::EventStreamError`] wrapping a [`reqwest::Error`].
    #[error("HTTP error: {error}")]
    Stream {
        #[from]
        /// Error from the `eventsource_stream` crate.
        error: eventsource_stream::EventStreamError<reqwest::Error>,
    },
    /// JSON parsing error.
    #[error("JSON error: {error}")]
    Parse {
        /// Error from [`serde_json`].
        error: serde_json::Error,
        /// [`eventsource_stream::Event`] that did not parse.
        event: eventsource_stream::Event,
    },
    /// Error from the API.
    #[error("API error: {error}")]
    Api {
        /// Error from the API.
        error: ApiError,
        /// [`eventsource_stream::Event`] containing the error.
        event: eventsource_stream::Event,
    },
}

impl Error {
    /// Whether the connection itself failed, as opposed to the server sending
    /// something we could not use.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Stream {
                error: eventsource_stream::EventStreamError::Transport(_)
            }
        )
    }
}

/// Stream of [`Chunk`]s or [`Error`]s.
pub struct Stream {
    inner: Pin<
        Box<dyn futures::Stream<Item = Result<Chunk, Error>> + Send + 'static>,
    >,
}

static_assertions::assert_impl_all!(Stream: futures::Stream, Send);

impl Stream {
    /// Create a new stream from an [`eventsource_stream::EventStream`] or
    /// similar stream of [`eventsource_stream::Event`]s. The [`DONE`] event is
    /// dropped.
    pub fn new<S>(stream: S) -> Self
    where
        S: futures::Stream<
                Item = Result<
                    eventsource_stream::Event,
                    eventsource_stream::EventStreamError<reqwest::Error>,
                >,
            > + Send
            + 'static,
    {
        Self {
            inner: Box::pin(stream.filter_map(|event| {
                future::ready(match event {
                    Ok(event) if event.data.trim() == DONE => None,
                    Ok(event) => {
                        #[cfg(feature = "log")]
                        log::trace!("Event: {:?}", event);

                        Some(match serde_json::from_str::<ApiResult>(&event.data)
                        {
                            Ok(ApiResult::Chunk(chunk)) => Ok(chunk),
                            Ok(ApiResult::Error { error }) => {
                                Err(Error::Api { error, event })
                            }
                            Err(error) => Err(Error::Parse { error, event }),
                        })
                    }
                    Err(error) => {
                        #[cfg(feature = "log")]
                        log::error!("Stream error: {:?}", error);
                        Some(Err(Error::Stream { error }))
                    }
                })
            })),
        }
    }
}

impl futures::Stream for Stream {
    type Item = Result<Chunk, Error>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context,
    ) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Extension trait for [`Chunk`] streams.
pub trait FilterExt:
    futures::stream::Stream<Item = Result<Chunk, Error>> + Sized
{
    /// Flatten chunks into [`Increment`]s. Errors are passed through.
    fn increments(
        self,
    ) -> impl futures::Stream<Item = Result<Increment, Error>> {
        self.flat_map(|result| {
            futures::stream::iter(match result {
                Ok(chunk) => {
                    chunk.into_increments().into_iter().map(Ok).collect::<Vec<_>>()
                }
                Err(error) => vec![Err(error)],
            })
        })
    }

    /// Filter out everything but text pieces.
    fn text(self) -> impl futures::Stream<Item = Result<String, Error>> {
        self.increments().filter_map(|result| async move {
            match result {
                Ok(Increment::Text(text)) => Some(Ok(text)),
                Ok(Increment::Stop { .. }) => None,
                Err(error) => Some(Err(error)),
            }
        })
    }
}

impl<S> FilterExt for S where S: futures::Stream<Item = Result<Chunk, Error>> {}
