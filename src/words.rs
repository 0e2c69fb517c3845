//! Structured [`WordRecord`]s pulled out of word explanations, and the JSON
//! [`RecordStore`] they are kept in.

use std::{
    ffi::OsString,
    fs,
    io::{self, Write},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Capture group names and the labels the model is asked to use, in the order
/// they must appear.
const FIELDS: [(&str, &str); 5] = [
    ("word", "Word"),
    ("closest_chinese", "Closest Chinese"),
    ("slang_or_usage", "Slang or Usage"),
    ("context", "Context"),
    ("example", "Example"),
];

/// Each label starts a line and may be decorated with Markdown emphasis, a
/// heading marker or a bullet or numbered list marker. A value runs until the next label; the last one runs until a
/// blank line or the end of the text.
static PATTERN: Lazy<Regex> = Lazy::new(|| {
    let fields: Vec<String> = FIELDS
        .iter()
        .map(|(name, label)| {
            format!(
                r"^[ \t>*_#-]*(?:\d+[.)])?[ \t*_]*{}[ \t*_]*[:：][ \t*_]*(?P<{name}>.+?)",
                label.replace(' ', r"\s+"),
            )
        })
        .collect();
    let pattern = format!(r"(?ism){}(?:\n\s*\n|\s*\z)", fields.join(r"\s*\n"));
    Regex::new(&pattern).expect("word pattern is valid")
});

/// Why [`WordRecord::parse`] found nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// The answer has no text at all.
    #[error("the answer is empty")]
    Empty,
    /// At least one labeled field is missing or out of order.
    #[error("the answer does not contain every labeled field")]
    NoMatch,
}

/// A word explanation split into its labeled fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRecord {
    /// The word or phrase explained.
    pub word: String,
    /// Closest Chinese meaning.
    pub closest_chinese: String,
    /// Slang meaning or typical usage.
    pub slang_or_usage: String,
    /// Where the word is used.
    pub context: String,
    /// An example sentence.
    pub example: String,
    /// When the record was extracted.
    pub timestamp: DateTime<Local>,
}

impl WordRecord {
    /// Extract the five labeled fields from `answer`.
    pub fn parse(answer: &str) -> std::result::Result<Self, ExtractError> {
        if answer.trim().is_empty() {
            return Err(ExtractError::Empty);
        }

        let captures = PATTERN.captures(answer).ok_or(ExtractError::NoMatch)?;
        let field = |name: &str| -> std::result::Result<String, ExtractError> {
            let value = captures
                .name(name)
                .map(|m| m.as_str().trim().trim_end_matches(['*', '_']).trim())
                .unwrap_or_default();
            if value.is_empty() {
                Err(ExtractError::NoMatch)
            } else {
                Ok(value.to_string())
            }
        };

        Ok(Self {
            word: field("word")?,
            closest_chinese: field("closest_chinese")?,
            slang_or_usage: field("slang_or_usage")?,
            context: field("context")?,
            example: field("example")?,
            timestamp: Local::now(),
        })
    }
}

/// [`RecordStore`] error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The file could not be read, written or moved.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Records could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for [`RecordStore`].
pub type Result<T> = std::result::Result<T, StoreError>;

/// A JSON file holding one array of records.
#[derive(Debug, Clone)]
pub struct RecordStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> RecordStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Suffix added to a corrupted file when it is moved aside.
    pub const BACKUP_SUFFIX: &'static str = ".bak";

    /// Store records at `path`. Nothing is created until the first append.
    pub fn new<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// Where the records live.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupted file would be moved to now: `<name>.bak`, or
    /// `<name>.bak.1`, `<name>.bak.2` and so on when earlier backups exist.
    /// An existing backup is never replaced.
    pub fn backup_path(&self) -> PathBuf {
        let first = with_suffix(&self.path, Self::BACKUP_SUFFIX);
        if !first.exists() {
            return first;
        }
        (1u32..)
            .map(|n| with_suffix(&first, &format!(".{n}")))
            .find(|path| !path.exists())
            .unwrap_or(first)
    }

    /// All records in append order. A missing file holds no records. A file
    /// that does not parse is moved to [`Self::backup_path`] and treated as
    /// empty.
    pub fn load(&self) -> Result<Vec<T>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(error) => return Err(error.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        match serde_json::from_slice(&bytes) {
            Ok(records) => Ok(records),
            Err(_error) => {
                let backup = self.backup_path();
                fs::rename(&self.path, &backup)?;

                #[cfg(feature = "log")]
                log::warn!(
                    "{} is corrupted ({}), moved it to {}",
                    self.path.display(),
                    _error,
                    backup.display()
                );

                Ok(Vec::new())
            }
        }
    }

    /// Add `record` at the end and return the new number of records. The file
    /// is replaced in one rename, so a crash never leaves half an array.
    pub fn append(&self, record: T) -> Result<usize> {
        let mut records = self.load()?;
        records.push(record);
        self.save(&records)?;
        Ok(records.len())
    }

    fn save(&self, records: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(records)?;
        let temp = with_suffix(&self.path, ".tmp");
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// `path` with `suffix` added to the whole file name.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// The word store.
pub type WordStore = RecordStore<WordRecord>;

/// File name of the [`WordStore`] inside the data directory.
pub const WORDS_FILE_NAME: &str = "words.json";

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: &str = "Word: serendipity
Closest Chinese: 机缘巧合
Slang or Usage: a happy accident, often used about discoveries
Context: stories about finding something good by chance
Example: Meeting her was pure serendipity. 遇见她纯属机缘巧合。";

    fn assert_same_fields(a: &WordRecord, b: &WordRecord) {
        assert_eq!(a.word, b.word);
        assert_eq!(a.closest_chinese, b.closest_chinese);
        assert_eq!(a.slang_or_usage, b.slang_or_usage);
        assert_eq!(a.context, b.context);
        assert_eq!(a.example, b.example);
    }

    #[test]
    fn test_parse() {
        let record = WordRecord::parse(ANSWER).unwrap();
        assert_eq!(record.word, "serendipity");
        assert_eq!(record.closest_chinese, "机缘巧合");
        assert_eq!(
            record.slang_or_usage,
            "a happy accident, often used about discoveries"
        );
        assert_eq!(record.context, "stories about finding something good by chance");
        assert_eq!(
            record.example,
            "Meeting her was pure serendipity. 遇见她纯属机缘巧合。"
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first = WordRecord::parse(ANSWER).unwrap();
        let second = WordRecord::parse(ANSWER).unwrap();
        assert_same_fields(&first, &second);
        assert!(first.timestamp <= second.timestamp);
    }

    #[test]
    fn test_parse_markdown_decorations() {
        let answer = "Sure! Here you go:\n\n\
            **Word:** break a leg\n\
            **Closest Chinese:** 祝你好运\n\
            - **Slang or Usage**: said to performers before a show\n\
            **context**：theatre\n\
            **Example:** Break a leg tonight!\n\
            \n\
            Let me know if you need more.";
        let record = WordRecord::parse(answer).unwrap();
        assert_eq!(record.word, "break a leg");
        assert_eq!(record.closest_chinese, "祝你好运");
        assert_eq!(record.slang_or_usage, "said to performers before a show");
        assert_eq!(record.context, "theatre");
        assert_eq!(record.example, "Break a leg tonight!");
    }

    #[test]
    fn test_parse_headings_and_numbered_lists() {
        let headings = "### Word: break a leg\n\
            ### Closest Chinese: 祝你好运\n\
            ### Slang or Usage: said to performers\n\
            ### Context: theatre\n\
            ### Example: Break a leg tonight!";
        let record = WordRecord::parse(headings).unwrap();
        assert_eq!(record.word, "break a leg");
        assert_eq!(record.example, "Break a leg tonight!");

        let numbered = "1. Word: break a leg\n\
            2. **Closest Chinese:** 祝你好运\n\
            3) Slang or Usage: said to performers\n\
            4. Context: theatre\n\
            5. Example: Break a leg tonight!";
        let record = WordRecord::parse(numbered).unwrap();
        assert_eq!(record.closest_chinese, "祝你好运");
        assert_eq!(record.slang_or_usage, "said to performers");
        assert_eq!(record.context, "theatre");
    }

    #[test]
    fn test_parse_multiline_value() {
        let answer = ANSWER.replace(
            "Context: stories",
            "Context: first line\nsecond line about stories",
        );
        let record = WordRecord::parse(&answer).unwrap();
        assert!(record.context.starts_with("first line\nsecond line"));
    }

    #[test]
    fn test_parse_missing_label() {
        let answer = ANSWER.replace("Context:", "Setting:");
        assert_eq!(WordRecord::parse(&answer), Err(ExtractError::NoMatch));
    }

    #[test]
    fn test_parse_labels_out_of_order() {
        let answer = "Closest Chinese: 你好\nWord: hello\nSlang or Usage: x\n\
                      Context: y\nExample: z";
        assert_eq!(WordRecord::parse(answer), Err(ExtractError::NoMatch));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(WordRecord::parse(""), Err(ExtractError::Empty));
        assert_eq!(WordRecord::parse(" \n\t"), Err(ExtractError::Empty));
        assert_eq!(
            WordRecord::parse("I don't know that word."),
            Err(ExtractError::NoMatch)
        );
    }

    #[test]
    fn test_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = WordStore::new(dir.path().join(WORDS_FILE_NAME));
        assert!(store.load().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_store_append_then_load_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = WordStore::new(dir.path().join("data").join(WORDS_FILE_NAME));
        let template = WordRecord::parse(ANSWER).unwrap();

        for n in 1..=5 {
            let record = WordRecord {
                word: format!("word {n}"),
                ..template.clone()
            };
            assert_eq!(store.append(record).unwrap(), n);
        }

        let records = store.load().unwrap();
        assert_eq!(records.len(), 5);
        for (n, record) in records.iter().enumerate() {
            assert_eq!(record.word, format!("word {}", n + 1));
            assert_same_fields(
                record,
                &WordRecord {
                    word: record.word.clone(),
                    ..template.clone()
                },
            );
        }
        assert!(!with_suffix(store.path(), ".tmp").exists());
    }

    #[test]
    fn test_store_corrupted_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WORDS_FILE_NAME);
        fs::write(&path, "[{\"word\": \"trunc").unwrap();
        let store = WordStore::new(&path);

        assert!(store.load().unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(dir.path().join("words.json.bak")).unwrap(),
            "[{\"word\": \"trunc"
        );
        assert!(!path.exists());

        // Processing continues with an empty list.
        let record = WordRecord::parse(ANSWER).unwrap();
        assert_eq!(store.append(record).unwrap(), 1);
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_store_wrong_shape_is_corrupted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WORDS_FILE_NAME);
        // The old store format was an object keyed by word.
        fs::write(&path, "{}").unwrap();
        let store = WordStore::new(&path);

        assert!(store.load().unwrap().is_empty());
        assert!(dir.path().join("words.json.bak").exists());
    }

    #[test]
    fn test_store_keeps_every_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(WORDS_FILE_NAME);
        let store = WordStore::new(&path);

        for content in ["first corruption", "second corruption", "{\"third\""] {
            fs::write(&path, content).unwrap();
            assert!(store.load().unwrap().is_empty());
        }

        let read = |name: &str| fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(read("words.json.bak"), "first corruption");
        assert_eq!(read("words.json.bak.1"), "second corruption");
        assert_eq!(read("words.json.bak.2"), "{\"third\"");
        assert_eq!(
            store.backup_path(),
            dir.path().join("words.json.bak.3")
        );
    }
}
