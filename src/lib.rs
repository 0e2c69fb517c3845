#![warn(missing_docs)]
#![forbid(unsafe_code)]
//! `deepask` asks [DeepSeek] chat models short questions from the terminal.
//!
//! A [`Session`] wraps the user's text in a [`PromptType`] template, sends it
//! through a [`Client`] and shows a live status [`Animation`] until the answer
//! arrives, either all at once or as a [`Stream`]. Every exchange is appended
//! to a plain text [`History`]; word explanations are also parsed into
//! [`WordRecord`]s and kept in a JSON [`RecordStore`].
//!
//! The status display and the request coordinate only through a
//! [`Lifecycle`] and a [`SharedOutput`], so either side can be used on its
//! own.
//!
//! [DeepSeek]: <https://api-docs.deepseek.com/>
//! [`History`]: history::History
//! [`WordRecord`]: words::WordRecord
//! [`RecordStore`]: words::RecordStore

pub mod key;
pub use key::Key;

pub mod client;
pub use client::Client;

pub mod account;

pub mod model;
pub use model::Model;

pub mod request;
pub use request::Request;

pub mod response;
pub use response::Response;

pub mod stream;
pub use stream::Stream;

pub mod prompt;
pub use prompt::PromptType;

pub mod lifecycle;
pub use lifecycle::{Lifecycle, State};

pub mod output;
pub use output::SharedOutput;

pub mod animation;
pub use animation::{Animation, Animator};

pub mod requester;
pub use requester::{Backend, Outcome, Requester};

pub mod history;

pub mod words;

pub mod config;
pub use config::Config;

pub mod session;
pub use session::Session;

/// Re-exports of commonly used crates to avoid version conflicts.
pub mod exports {
    pub use chrono;
    pub use crossterm;
    pub use eventsource_stream;
    pub use futures;
    #[cfg(feature = "log")]
    pub use log;
    pub use reqwest;
    pub use serde;
    pub use serde_json;
}

/// Re-export of `serde_json::json!` for convenience.
pub use exports::serde_json::json;
