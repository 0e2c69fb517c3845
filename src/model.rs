//! [`Model`] to use for inference.
use serde::{Deserialize, Serialize};

/// Model to use for inference.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub enum Model {
    /// DeepSeek-V3 chat model. This is the default model.
    #[default]
    #[serde(rename = "deepseek-chat")]
    Chat,
    /// DeepSeek-R1 reasoning model.
    #[serde(rename = "deepseek-reasoner")]
    Reasoner,
}

impl Model {
    /// Identifier sent to the API.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Chat => "deepseek-chat",
            Self::Reasoner => "deepseek-reasoner",
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Error parsing a [`Model`] from a string.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown model `{0}` (expected `deepseek-chat` or `deepseek-reasoner`)")]
pub struct UnknownModel(pub String);

impl std::str::FromStr for Model {
    type Err = UnknownModel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "deepseek-chat" | "chat" => Ok(Self::Chat),
            "deepseek-reasoner" | "reasoner" => Ok(Self::Reasoner),
            other => Err(UnknownModel(other.to_string())),
        }
    }
}
