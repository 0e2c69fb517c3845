//! The [`Requester`] performs the network exchange for one question and
//! drives the [`Lifecycle`] flags the [`Animator`] watches.
//!
//! [`Animator`]: crate::animation::Animator

use std::{future::Future, io, pin::pin, sync::Arc, time::Duration};

use chrono::{DateTime, Local};
use crossterm::style::Stylize;
use futures::TryStreamExt;

use crate::{
    client,
    lifecycle::{Lifecycle, State},
    output::SharedOutput,
    response::Completion,
    stream::{self, FilterExt, Increment},
    Client, Request, Stream,
};

/// Answer logged in place of the real one when a request fails. Partial
/// streamed text is never logged.
pub const FAILURE_PLACEHOLDER: &str = "<no answer: request failed>";

/// Default pause after each streamed character.
pub const TYPING_DELAY: Duration = Duration::from_millis(20);

/// The remote completion service.
///
/// [`Client`] is the real implementation. Tests substitute their own.
pub trait Backend {
    /// Send `request` and wait for the whole answer.
    fn complete(
        &self,
        request: &Request,
    ) -> impl Future<Output = client::Result<Completion>>;

    /// Send `request` and return the stream of chunks.
    fn stream(
        &self,
        request: &Request,
    ) -> impl Future<Output = client::Result<Stream>>;
}

impl Backend for Client {
    async fn complete(&self, request: &Request) -> client::Result<Completion> {
        self.message(request).await
    }

    async fn stream(&self, request: &Request) -> client::Result<Stream> {
        Client::stream(self, request).await
    }
}

/// Anything that can go wrong during one request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request could not be sent or the response not read.
    #[error(transparent)]
    Client(#[from] client::Error),
    /// A stream broke or sent garbage.
    #[error(transparent)]
    Stream(#[from] stream::Error),
    /// The stream ended without a terminator marker.
    #[error("stream ended before the answer was complete")]
    Truncated,
    /// The answer could not be written to the terminal.
    #[error("could not write the answer: {0}")]
    Output(#[from] io::Error),
}

impl Error {
    /// See [`FailureKind`].
    pub fn kind(&self) -> FailureKind {
        let transport = match self {
            Self::Client(error) => error.is_transport(),
            Self::Stream(error) => error.is_transport(),
            Self::Truncated | Self::Output(_) => false,
        };
        if transport {
            FailureKind::Transport
        } else {
            FailureKind::Unknown
        }
    }
}

/// The two user-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum FailureKind {
    /// The network layer failed.
    Transport,
    /// Anything else.
    Unknown,
}

impl FailureKind {
    /// Label printed before the error message.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Transport => "Network error",
            Self::Unknown => "Unexpected error",
        }
    }
}

/// A finished question and answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    /// The whole answer text.
    pub answer: String,
    /// Total tokens reported by the server.
    pub tokens: u64,
    /// When the request was sent.
    pub timestamp: DateTime<Local>,
}

/// A failed request.
#[derive(Debug)]
pub struct Failure {
    /// Category shown to the user.
    pub kind: FailureKind,
    /// What went wrong.
    pub error: Error,
    /// When the request was sent.
    pub timestamp: DateTime<Local>,
}

/// How a request ended.
#[derive(Debug, derive_more::IsVariant)]
pub enum Outcome {
    /// The answer arrived.
    Completed(Exchange),
    /// The request failed.
    Failed(Failure),
}

impl Outcome {
    /// [`State::Completed`] or [`State::Failed`].
    pub fn state(&self) -> State {
        match self {
            Self::Completed(_) => State::Completed,
            Self::Failed(_) => State::Failed,
        }
    }

    /// Answer to log: the real answer, or [`FAILURE_PLACEHOLDER`].
    pub fn answer(&self) -> &str {
        match self {
            Self::Completed(exchange) => &exchange.answer,
            Self::Failed(_) => FAILURE_PLACEHOLDER,
        }
    }

    /// When the request was sent.
    pub fn timestamp(&self) -> DateTime<Local> {
        match self {
            Self::Completed(exchange) => exchange.timestamp,
            Self::Failed(failure) => failure.timestamp,
        }
    }
}

/// Sends one request and sets the [`Lifecycle`] flags as it goes.
pub struct Requester<'a, B> {
    backend: &'a B,
    template: &'a Request,
    lifecycle: Arc<Lifecycle>,
    output: SharedOutput,
    typing_delay: Duration,
}

impl<'a, B> Requester<'a, B>
where
    B: Backend,
{
    /// `template` supplies the model and sampling settings; its messages are
    /// replaced by the prompt.
    pub fn new(
        backend: &'a B,
        template: &'a Request,
        lifecycle: Arc<Lifecycle>,
        output: SharedOutput,
    ) -> Self {
        Self {
            backend,
            template,
            lifecycle,
            output,
            typing_delay: TYPING_DELAY,
        }
    }

    /// Pause after each streamed character. Zero disables the effect.
    pub fn typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    /// Send `prompt` and wait for the answer. Streamed answers are written to
    /// the output as they arrive; whole answers are left to the caller.
    ///
    /// The lifecycle is finished on every path, including when this future is
    /// dropped before completion.
    pub async fn run(&self, prompt: &str, streaming: bool) -> Outcome {
        let timestamp = Local::now();
        let _finish = self.lifecycle.finish_guard();
        let request = self.template.user(prompt);

        #[cfg(feature = "log")]
        log::debug!(
            "sending {} request ({} characters)",
            if streaming { "streaming" } else { "blocking" },
            prompt.chars().count()
        );

        let result = if streaming {
            self.receive(&request).await
        } else {
            self.fetch(&request).await
        };

        match result {
            Ok((answer, tokens)) => Outcome::Completed(Exchange {
                answer,
                tokens,
                timestamp,
            }),
            Err(error) => {
                self.lifecycle.finish();
                let kind = error.kind();

                #[cfg(feature = "log")]
                log::error!("request failed: {:?}", error);

                self.report(kind, &error);
                Outcome::Failed(Failure {
                    kind,
                    error,
                    timestamp,
                })
            }
        }
    }

    /// One blocking call.
    async fn fetch(&self, request: &Request) -> Result<(String, u64), Error> {
        let completion = self.backend.complete(request).await;
        self.lifecycle.finish();
        let completion = completion?;

        Ok((completion.text().to_string(), completion.usage.total_tokens))
    }

    /// Consume increments until the terminator marker.
    async fn receive(&self, request: &Request) -> Result<(String, u64), Error> {
        let stream = self.backend.stream(request).await?;
        let mut increments = pin!(stream.increments());
        let mut answer = String::new();

        while let Some(increment) = increments.try_next().await? {
            self.lifecycle.mark_progress();

            match increment {
                Increment::Text(text) => {
                    answer.push_str(&text);
                    self.type_out(&text).await?;
                }
                Increment::Stop { reason, usage } => {
                    #[cfg(feature = "log")]
                    if reason != crate::response::FinishReason::Stop {
                        log::warn!("answer stopped early: {:?}", reason);
                    }
                    #[cfg(not(feature = "log"))]
                    let _ = reason;

                    self.lifecycle.finish();
                    return Ok((answer, usage.total_tokens));
                }
            }
        }

        Err(Error::Truncated)
    }

    /// Write `text` one character at a time, taking the output lock for each
    /// character so status redraws can slip in between. A status frame may
    /// therefore land inside one increment. The guard cannot be held across
    /// the delay: the animator runs in the same task and would block on the
    /// lock forever.
    async fn type_out(&self, text: &str) -> io::Result<()> {
        let mut buf = [0u8; 4];
        for c in text.chars() {
            self.output.print(c.encode_utf8(&mut buf))?;
            if !self.typing_delay.is_zero() {
                tokio::time::sleep(self.typing_delay).await;
            }
        }
        Ok(())
    }

    fn report(&self, kind: FailureKind, error: &Error) {
        let result = self.output.write_with(|w| {
            writeln!(w, "\n{} {}: {}", "✗".red(), kind.label(), error)
        });
        if let Err(_error) = result {
            #[cfg(feature = "log")]
            log::warn!("Could not report failure: {}", _error);
        }
    }
}
