//! [`PromptType`] templates. The user only types a short question or phrase;
//! the template turns it into the full prompt sent to the model.

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the user's text.
pub const PLACEHOLDER: &str = "{text}";

/// Which fixed template to wrap the user's text in.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum PromptType {
    /// General question answering. Used when no mode is selected.
    #[default]
    #[display("default_answer")]
    DefaultAnswer,
    /// Detect the language (Chinese, English or Japanese) and translate into
    /// the other two.
    #[display("fast_translate")]
    FastTranslate,
    /// Explain a word or phrase in a fixed labeled layout that
    /// [`WordRecord::parse`] understands.
    ///
    /// [`WordRecord::parse`]: crate::words::WordRecord::parse
    #[display("explain_word")]
    ExplainWord,
    /// Careful Chinese to Japanese translation.
    #[display("translate_jp")]
    TranslateJp,
    /// Explain a sentence: difficult words, usage and a translation.
    #[display("explain_sentence")]
    ExplainSentence,
    /// English synonyms as a table.
    #[display("en_synonyms")]
    EnSynonyms,
}

impl PromptType {
    /// Every prompt type.
    pub const ALL: [Self; 6] = [
        Self::DefaultAnswer,
        Self::FastTranslate,
        Self::ExplainWord,
        Self::TranslateJp,
        Self::ExplainSentence,
        Self::EnSynonyms,
    ];

    /// The raw template, containing [`PLACEHOLDER`] once.
    pub const fn template(self) -> &'static str {
        match self {
            Self::DefaultAnswer => {
                "Answer the following question concisely and accurately. \
                 Reply in the language the question is written in.\n\n\
                 Question: {text}"
            }
            Self::FastTranslate => {
                "Identify whether the following text is Chinese, English or \
                 Japanese, then translate it into the other two languages. \
                 Output only the two translations, each on its own line and \
                 prefixed with the language name.\n\n\
                 Text: {text}"
            }
            Self::ExplainWord => {
                "Explain the English word or phrase below for a Chinese \
                 speaker. Reply with exactly these five labeled lines, in \
                 this order, and nothing else:\n\
                 Word: <the word or phrase>\n\
                 Closest Chinese: <the closest Chinese meaning>\n\
                 Slang or Usage: <slang meaning or typical usage>\n\
                 Context: <situations where it is used>\n\
                 Example: <one example sentence with its Chinese translation>\n\n\
                 Word or phrase: {text}"
            }
            Self::TranslateJp => {
                "Translate the following Chinese text into natural Japanese. \
                 Keep the tone and register of the original, and add a short \
                 note for any expression that has no direct equivalent.\n\n\
                 Text: {text}"
            }
            Self::ExplainSentence => {
                "Explain the following sentence. List the words and grammar \
                 that are hard to understand with their meaning and usage, \
                 then give a Chinese translation of the whole sentence.\n\n\
                 Sentence: {text}"
            }
            Self::EnSynonyms => {
                "List English synonyms and near-synonyms of the word below as \
                 a Markdown table with the columns: word, part of speech, \
                 Chinese meaning, nuance compared to the original, \
                 example.\n\n\
                 Word: {text}"
            }
        }
    }

    /// Substitute `text` into the template.
    pub fn render(self, text: &str) -> String {
        self.template().replacen(PLACEHOLDER, text, 1)
    }
}
