//! [`Client`] for the DeepSeek chat completion API and related types.

use std::sync::Arc;

use eventsource_stream::Eventsource;
use serde::{Deserialize, Serialize};

use crate::{
    account::{Balance, ModelList},
    key,
    response::Completion,
    Key,
};

/// Result type for the client. See also [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Client for the DeepSeek API.
///
/// See [`Self::new`] for creating a new client and [`Self::message`] and
/// [`Self::stream`] to get started.
#[derive(Clone)]
pub struct Client {
    /// Inner [`reqwest::Client`]. The API [`Key`] is **set automatically on
    /// requests**, it does not need to be configured here.
    pub inner: reqwest::Client,
    /// API [`Key`]. It can be set to a new [`Key`] to change the key used for
    /// requests.
    pub key: Arc<Key>,
    /// Base URL of the API, without a trailing slash.
    pub base_url: String,
}

impl Client {
    /// Our user agent.
    pub const USER_AGENT: &'static str =
        concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
    /// Default base URL.
    pub const DEFAULT_URL: &'static str = "https://api.deepseek.com";
    /// Chat completion endpoint, relative to the base URL.
    pub const CHAT_PATH: &'static str = "/chat/completions";
    /// Model listing endpoint, relative to the base URL.
    pub const MODELS_PATH: &'static str = "/models";
    /// Account balance endpoint, relative to the base URL.
    pub const BALANCE_PATH: &'static str = "/user/balance";

    /// Create a new client from any type that can be converted into a [`Key`].
    ///
    /// ## Note:
    /// - It's safest to use a [`String`]. If you use a [`&str`] you must
    ///   zeroize it after creating the client.
    pub fn new<K>(key: K) -> Result<Self>
    where
        K: TryInto<Key, Error = key::InvalidKey>,
    {
        Self::from_key(key.try_into()?)
    }

    /// Create a new client with the given key.
    pub fn from_key(key: Key) -> Result<Self> {
        #[cfg(feature = "log")]
        {
            log::info!(concat!(
                "Creating ",
                env!("CARGO_PKG_NAME"),
                " client..."
            ));
            log::debug!(concat!("Crate version: ", env!("CARGO_PKG_VERSION")));
        }

        // Headers for all requests.
        let mut headers = reqwest::header::HeaderMap::new();

        // Content type needs to be set to JSON.
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        Ok(Self {
            inner: reqwest::Client::builder()
                .default_headers(headers)
                .user_agent(Self::USER_AGENT)
                .build()?,
            key: Arc::new(key),
            base_url: Self::DEFAULT_URL.to_string(),
        })
    }

    /// Use a different DeepSeek compatible endpoint. This is useful for
    /// testing or for proxies.
    pub fn with_base_url<U>(mut self, base_url: U) -> Self
    where
        U: Into<String>,
    {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Full URL for an endpoint path such as [`Self::CHAT_PATH`].
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create a [`reqwest::RequestBuilder`] with the API key set as a sensitive
    /// bearer token.
    pub fn request_raw<U>(
        &self,
        method: reqwest::Method,
        url: U,
    ) -> Result<reqwest::RequestBuilder>
    where
        U: reqwest::IntoUrl,
    {
        #[cfg(feature = "log")]
        {
            log::debug!("{} request to {}", method, url.as_str());
        }

        let secret = self.key.read();
        let mut val = reqwest::header::HeaderValue::from_str(&format!(
            "Bearer {}",
            secret.as_str()
        ))?;
        val.set_sensitive(true);

        Ok(self
            .inner
            .request(method, url)
            .header(reqwest::header::AUTHORIZATION, val))
    }

    /// Send a GET request with the API key set.
    pub async fn get<U>(&self, url: U) -> Result<reqwest::Response>
    where
        U: reqwest::IntoUrl,
    {
        Ok(self.request_raw(reqwest::Method::GET, url)?.send().await?)
    }

    /// Send a POST request with the API key set.
    pub async fn post<U, B>(&self, url: U, body: B) -> Result<reqwest::Response>
    where
        U: reqwest::IntoUrl,
        B: serde::Serialize,
    {
        let req = self.request_raw(reqwest::Method::POST, url)?;

        #[cfg(feature = "log")]
        {
            if let Ok(json) = serde_json::to_string_pretty(&body) {
                log::debug!("Sending body:\n{}", json);
            } else {
                log::warn!("Could not serialize body. Request will fail.");
            }
        }

        Ok(req.json(&body).send().await?)
    }

    /// Post a request to the chat completion endpoint.
    ///
    /// `prompt` can be a [`Request`] or anything that can be serialized but it
    /// should conform to the API. The return will be either a
    /// [`Response::Message`] or a [`Response::Stream`] depending on whether
    /// `stream` is set to `true` in the `prompt`.
    ///
    /// See also [`Self::message`] and [`Self::stream`] for convenience methods.
    ///
    /// [`Request`]: crate::Request
    /// [`Response::Message`]: crate::Response::Message
    /// [`Response::Stream`]: crate::Response::Stream
    pub async fn request<P>(&self, prompt: P) -> Result<crate::Response>
    where
        P: Serialize,
    {
        let json = serde_json::to_value(prompt)?;
        let streaming = json["stream"].as_bool().unwrap_or(false);

        let response = self.post(self.url(Self::CHAT_PATH), json).await?;
        let response = Self::check(response).await?;

        if streaming {
            // Get a stream and wrap it in our stream type.
            Ok(crate::Response::Stream {
                stream: crate::Stream::new(
                    response.bytes_stream().eventsource(),
                ),
            })
        } else {
            Ok(crate::Response::Message {
                completion: response.json().await?,
            })
        }
    }

    /// Make a [`request`] forcing `stream=false`. This function will always
    /// return a single [`Completion`].
    ///
    /// [`request`]: Self::request
    pub async fn message<P>(&self, prompt: P) -> Result<Completion>
    where
        P: Serialize,
    {
        let mut json = serde_json::to_value(prompt)?;
        json["stream"] = serde_json::Value::Bool(false);

        self.request(json).await?.into_completion().ok_or(
            // The server is misbehaving if this happens.
            Error::UnexpectedResponse {
                message: "Expected a message, got a stream.",
            },
        )
    }

    /// Make a [`request`] forcing `stream=true`. This function will always
    /// return a [`crate::Stream`].
    ///
    /// [`request`]: Self::request
    pub async fn stream<P>(&self, prompt: P) -> Result<crate::Stream>
    where
        P: Serialize,
    {
        let mut json = serde_json::to_value(prompt)?;
        json["stream"] = serde_json::Value::Bool(true);

        self.request(json).await?.into_stream().ok_or(
            Error::UnexpectedResponse {
                message: "Expected a stream, got a message.",
            },
        )
    }

    /// List the models available to this key.
    pub async fn models(&self) -> Result<ModelList> {
        let response = self.get(self.url(Self::MODELS_PATH)).await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Query the account balance.
    pub async fn balance(&self) -> Result<Balance> {
        let response = self.get(self.url(Self::BALANCE_PATH)).await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Turn a non-200 response into an [`Error`].
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status == reqwest::StatusCode::OK {
            return Ok(response);
        }

        #[cfg(feature = "log")]
        log::warn!("Request failed with status {}", status);

        let body = response.bytes().await?;
        match serde_json::from_slice::<ApiErrorWrapper>(&body) {
            // Error was sucessfully parsed from the API.
            Ok(wrapper) => Err(Error::Api {
                status: status.as_u16(),
                error: wrapper.error,
            }),
            Err(_) => Err(Error::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }
}

/// [`Client`] error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP error.
    #[error("HTTP error: {0}")]
    HTTP(#[from] reqwest::Error),
    /// Data could not be parsed.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// The key cannot be used.
    #[error("Invalid key: {0}")]
    Key(#[from] key::InvalidKey),
    /// The authorization header could not be built.
    #[error("Invalid header: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    /// Error reported by the API.
    #[error("API error ({status}): {error}")]
    #[allow(missing_docs)]
    Api { status: u16, error: ApiError },
    /// Non-200 status without a parsable error body.
    #[error("HTTP status {status}: {body}")]
    #[allow(missing_docs)]
    Status { status: u16, body: String },
    /// Unexpected response from the API. These should never happen unless the
    /// server is misbehaving (for example, returning a stream when a message is
    /// expected).
    #[error("Unexpected response: {message}")]
    #[allow(missing_docs)]
    UnexpectedResponse { message: &'static str },
}

impl Error {
    /// Whether the failure happened at the network layer: the connection could
    /// not be made, timed out or broke while sending or reading.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::HTTP(error) => {
                error.is_connect()
                    || error.is_timeout()
                    || error.is_request()
                    || error.is_body()
            }
            _ => false,
        }
    }
}

/// Error payload from the API.
#[derive(
    Clone, Debug, thiserror::Error, Serialize, Deserialize, PartialEq,
)]
#[error("{}: {message}", .kind.as_deref().unwrap_or("error"))]
pub struct ApiError {
    /// Human readable message.
    pub message: String,
    /// Error category, such as `authentication_error`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Machine readable code. Some errors send a string, others a number.
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

// The API wraps errors in an `error` object.
#[derive(Deserialize)]
pub(crate) struct ApiErrorWrapper {
    pub(crate) error: ApiError,
}
