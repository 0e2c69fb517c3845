//! Append-only question and answer [`History`].

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local};

use crate::prompt::PromptType;

/// Timestamp layout used in the log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

/// One logged exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<'a> {
    /// When the request was sent.
    pub timestamp: DateTime<Local>,
    /// Template the question was wrapped in.
    pub prompt_type: PromptType,
    /// What the user typed, before templating.
    pub question: &'a str,
    /// The answer, or a failure placeholder.
    pub answer: &'a str,
}

impl std::fmt::Display for Entry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} || Prompt Type: {}\nQuestion: {}\nAnswer: {}]\n\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.prompt_type,
            self.question,
            self.answer
        )
    }
}

/// Plain text log file. Entries are only ever appended.
#[derive(Debug, Clone)]
pub struct History {
    path: PathBuf,
}

impl History {
    /// File name inside the data directory.
    pub const FILE_NAME: &'static str = "log.txt";

    /// Log to `path`. Nothing is created until the first append.
    pub fn new<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { path: path.into() }
    }

    /// Log to [`Self::FILE_NAME`] inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(Self::FILE_NAME))
    }

    /// Where entries go.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `entry` and sync it to disk. Parent directories are created as
    /// needed.
    pub fn append(&self, entry: &Entry) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        // One write call so a concurrent appender cannot split the entry.
        file.write_all(entry.to_string().as_bytes())?;
        file.sync_data()?;

        #[cfg(feature = "log")]
        log::debug!("logged exchange to {}", self.path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry<'a>(question: &'a str, answer: &'a str) -> Entry<'a> {
        Entry {
            timestamp: Local.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
            prompt_type: PromptType::FastTranslate,
            question,
            answer,
        }
    }

    #[test]
    fn test_entry_format() {
        let text = entry("你好", "Hello\nこんにちは").to_string();
        assert!(text.starts_with("[2024-05-01 09:30:00 "));
        assert!(text.ends_with(
            " || Prompt Type: fast_translate\n\
             Question: 你好\n\
             Answer: Hello\nこんにちは]\n\n"
        ));
    }

    #[test]
    fn test_append_creates_directories_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let history = History::in_dir(&dir.path().join("nested").join("data"));

        history.append(&entry("one", "1")).unwrap();
        history.append(&entry("two", "2")).unwrap();

        let text = fs::read_to_string(history.path()).unwrap();
        assert_eq!(text.matches("|| Prompt Type:").count(), 2);
        let first = text.find("Question: one").unwrap();
        let second = text.find("Question: two").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_append_to_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be.
        let history = History::new(dir.path());
        assert!(history.append(&entry("q", "a")).is_err());
    }
}
