//! A [`request::Message`] and associated types. The API returns the same type
//! inside each [`response::Choice`].
//!
//! [`response::Choice`]: crate::response::Choice
//! [`request::Message`]: crate::request::Message

use serde::{Deserialize, Serialize};

/// Role of the [`Message`] author.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Instructions for the model.
    #[display("system")]
    System,
    /// From the user.
    #[display("user")]
    User,
    /// From the AI.
    #[display("assistant")]
    Assistant,
}

/// A message in a [`Request`] or a [`Completion`] choice.
///
/// [`Request`]: crate::Request
/// [`Completion`]: crate::response::Completion
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, derive_more::Display)]
#[display("{}", content)]
pub struct Message {
    /// Who is providing the content.
    pub role: Role,
    /// Text content of the message. The API sends `null` for some assistant
    /// messages, which is read as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
}

impl Message {
    /// A [`Role::User`] message.
    pub fn user<S>(content: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// A [`Role::System`] message.
    pub fn system<S>(content: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

impl<S> From<(Role, S)> for Message
where
    S: Into<String>,
{
    fn from((role, content): (Role, S)) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_message() {
        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_null_content() {
        let message: Message =
            serde_json::from_str(r#"{"role":"assistant","content":null}"#)
                .unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert!(message.content.is_empty());
    }

    #[test]
    fn test_from_tuple() {
        let message: Message = (Role::System, "be brief").into();
        assert_eq!(message, Message::system("be brief"));
        assert_eq!(message.to_string(), "be brief");
    }
}
