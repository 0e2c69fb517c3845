//! A [`Session`] asks one question at a time: it runs the status animation
//! and the request side by side, then reports and records the result.

use std::{path::Path, sync::Arc, time::Duration};

use crossterm::style::Stylize;
use tokio::time::Instant;

use crate::{
    animation::{Animation, Animator},
    history::{Entry, History},
    lifecycle::Lifecycle,
    output::SharedOutput,
    prompt::PromptType,
    requester::{Backend, Outcome, Requester, TYPING_DELAY},
    words::{ExtractError, StoreError, WordRecord, WordStore, WORDS_FILE_NAME},
    Request,
};

/// What happened to the word record of an [`PromptType::ExplainWord`]
/// answer.
#[derive(Debug, derive_more::IsVariant)]
pub enum WordSave {
    /// Appended. The store now holds `total` records.
    Saved {
        /// Records in the store.
        total: usize,
    },
    /// The answer did not have the expected layout. Nothing was written.
    NotFound(ExtractError),
    /// The store could not be updated.
    Failed(StoreError),
}

/// Result of [`Session::ask`].
#[derive(Debug)]
pub struct Report {
    /// Template used.
    pub prompt_type: PromptType,
    /// How the request ended.
    pub outcome: Outcome,
    /// Time from sending the request until both tasks were done.
    pub elapsed: Duration,
    /// Whether the history entry was written.
    pub logged: bool,
    /// Word record result, for [`PromptType::ExplainWord`] answers only.
    pub word: Option<WordSave>,
}

/// Everything needed to ask questions.
pub struct Session<B> {
    backend: B,
    template: Request,
    animation: Animation,
    typing_delay: Duration,
    output: SharedOutput,
    history: History,
    words: WordStore,
}

impl<B> Session<B>
where
    B: Backend,
{
    /// Ask `backend` using the model settings in `template`. The history and
    /// word store live in `data_dir`.
    pub fn new(
        backend: B,
        template: Request,
        output: SharedOutput,
        data_dir: &Path,
    ) -> Self {
        Self {
            backend,
            template,
            animation: Animation::default(),
            typing_delay: TYPING_DELAY,
            output,
            history: History::in_dir(data_dir),
            words: WordStore::new(data_dir.join(WORDS_FILE_NAME)),
        }
    }

    /// Set the status [`Animation`].
    pub fn animation(mut self, animation: Animation) -> Self {
        self.animation = animation;
        self
    }

    /// Pause after each streamed character.
    pub fn typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    /// The question log.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The word store.
    pub fn words(&self) -> &WordStore {
        &self.words
    }

    /// The remote service.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Ask `text` wrapped in the `prompt_type` template.
    ///
    /// The animation and the request run concurrently inside this call and
    /// both are done before it returns or, if the future is dropped, before
    /// the drop completes. The history entry is then written exactly once.
    /// Failures are reported on the output, never returned.
    pub async fn ask(
        &self,
        prompt_type: PromptType,
        text: &str,
        streaming: bool,
    ) -> Report {
        let prompt = prompt_type.render(text);
        let lifecycle = Arc::new(Lifecycle::new());

        let animator = Animator::new(
            self.animation,
            streaming,
            Arc::clone(&lifecycle),
            self.output.clone(),
        );
        let requester = Requester::new(
            &self.backend,
            &self.template,
            Arc::clone(&lifecycle),
            self.output.clone(),
        )
        .typing_delay(self.typing_delay);

        #[cfg(feature = "log")]
        log::info!("asking ({prompt_type}, streaming: {streaming})");

        let started = Instant::now();
        let ((), outcome) =
            tokio::join!(animator.run(), requester.run(&prompt, streaming));
        let elapsed = started.elapsed();

        self.show(&outcome, streaming, elapsed);
        let logged = self.log(prompt_type, text, &outcome);
        let word = match (&outcome, prompt_type) {
            (Outcome::Completed(exchange), PromptType::ExplainWord) => {
                Some(self.save_word(&exchange.answer))
            }
            _ => None,
        };

        Report {
            prompt_type,
            outcome,
            elapsed,
            logged,
            word,
        }
    }

    /// Print the answer (unless it was streamed) and the metrics.
    fn show(&self, outcome: &Outcome, streaming: bool, elapsed: Duration) {
        let result = self.output.write_with(|w| {
            if let Outcome::Completed(exchange) = outcome {
                if !streaming {
                    writeln!(w, "\n{}", exchange.answer)?;
                }
                writeln!(
                    w,
                    "\nTokens used: {} ({} characters)",
                    exchange.tokens,
                    exchange.answer.chars().count()
                )?;
            }
            writeln!(w, "Elapsed: {:.2}s", elapsed.as_secs_f64())
        });
        if let Err(_error) = result {
            #[cfg(feature = "log")]
            log::warn!("Could not print the answer: {}", _error);
        }
    }

    fn log(&self, prompt_type: PromptType, text: &str, outcome: &Outcome) -> bool {
        let entry = Entry {
            timestamp: outcome.timestamp(),
            prompt_type,
            question: text,
            answer: outcome.answer(),
        };
        match self.history.append(&entry) {
            Ok(()) => {
                self.status(&format!(
                    "{} Logged to {}",
                    "✓".green(),
                    self.history.path().display()
                ));
                true
            }
            Err(error) => {
                #[cfg(feature = "log")]
                log::error!("could not write history: {}", error);

                self.status(&format!(
                    "{} Could not write {}: {}",
                    "✗".red(),
                    self.history.path().display(),
                    error
                ));
                false
            }
        }
    }

    fn save_word(&self, answer: &str) -> WordSave {
        let record = match WordRecord::parse(answer) {
            Ok(record) => record,
            Err(error) => {
                self.status(&format!("{} No word record: {}", "!".yellow(), error));
                return WordSave::NotFound(error);
            }
        };

        match self.words.append(record) {
            Ok(total) => {
                self.status(&format!(
                    "{} Saved word record ({} total) to {}",
                    "✓".green(),
                    total,
                    self.words.path().display()
                ));
                WordSave::Saved { total }
            }
            Err(error) => {
                #[cfg(feature = "log")]
                log::error!("could not save word record: {}", error);

                self.status(&format!(
                    "{} Could not save word record: {}",
                    "✗".red(),
                    error
                ));
                WordSave::Failed(error)
            }
        }
    }

    fn status(&self, line: &str) {
        if let Err(_error) = self.output.println(line) {
            #[cfg(feature = "log")]
            log::warn!("Could not print status: {}", _error);
        }
    }
}
