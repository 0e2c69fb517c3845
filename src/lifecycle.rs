//! [`Lifecycle`] flags shared by the [`Animator`] and the [`Requester`] of one
//! request.
//!
//! Both flags are one-shot: they only ever go from unset to set. The requester
//! writes them, the animator reads them. No lock is needed for the flags
//! themselves; the output lock in [`SharedOutput`] only serializes terminal
//! writes.
//!
//! [`Animator`]: crate::animation::Animator
//! [`Requester`]: crate::requester::Requester
//! [`SharedOutput`]: crate::output::SharedOutput

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Display state of a request.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum State {
    /// No request has been dispatched yet.
    #[default]
    Idle,
    /// The request is out but no data has arrived.
    Started,
    /// The server is producing data.
    InProgress,
    /// Terminal. The request is over.
    Completed,
    /// Terminal. The request failed. Only reported by a [`Requester`]
    /// outcome; flag derivation never yields it.
    ///
    /// [`Requester`]: crate::requester::Requester
    Failed,
}

impl State {
    /// Status label shown next to the animation frame.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Started => "Requesting",
            Self::InProgress => "Receiving",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    /// Whether no further transition can happen.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The two lifecycle flags of one request.
#[derive(Debug, Default)]
pub struct Lifecycle {
    progress_started: AtomicBool,
    finished: AtomicBool,
}

impl Lifecycle {
    /// Fresh flags, both unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the server produced data. Returns `true` only for the call
    /// that set the flag.
    pub fn mark_progress(&self) -> bool {
        let first = !self.progress_started.swap(true, Ordering::AcqRel);

        #[cfg(feature = "log")]
        if first {
            log::debug!("request lifecycle: first data received");
        }

        first
    }

    /// Record that the request is over, whatever the outcome. Returns `true`
    /// only for the call that set the flag.
    pub fn finish(&self) -> bool {
        let first = !self.finished.swap(true, Ordering::AcqRel);

        #[cfg(feature = "log")]
        if first {
            log::debug!("request lifecycle: finished");
        }

        first
    }

    /// Whether [`Self::mark_progress`] has been called.
    pub fn is_progress_started(&self) -> bool {
        self.progress_started.load(Ordering::Acquire)
    }

    /// Whether [`Self::finish`] has been called.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Current display state: [`State::Completed`] once finished, otherwise
    /// [`State::InProgress`] once data arrived, otherwise [`State::Started`].
    pub fn state(&self) -> State {
        if self.is_finished() {
            State::Completed
        } else if self.is_progress_started() {
            State::InProgress
        } else {
            State::Started
        }
    }

    /// A guard that calls [`Self::finish`] when dropped. Hold it for the whole
    /// request so every exit path (return, `?`, panic, or the future being
    /// dropped) sets the flag.
    pub fn finish_guard(self: &Arc<Self>) -> FinishGuard {
        FinishGuard {
            lifecycle: Arc::clone(self),
        }
    }
}

/// Calls [`Lifecycle::finish`] on drop. See [`Lifecycle::finish_guard`].
#[must_use = "the lifecycle is finished as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FinishGuard {
    lifecycle: Arc<Lifecycle>,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.lifecycle.finish();
    }
}
