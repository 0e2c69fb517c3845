//! [`SharedOutput`], the terminal stream shared by the animator and the
//! requester.

use std::{
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;

/// A writer behind a mutex. Every print operation holds the lock for its whole
/// duration and flushes before releasing it, so a status redraw and a piece of
/// answer text are never interleaved.
///
/// The lock is never held across an `.await`.
#[derive(Clone)]
pub struct SharedOutput {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

static_assertions::assert_impl_all!(SharedOutput: Send, Sync);

impl SharedOutput {
    /// Wrap any writer.
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Run one print operation under the lock, then flush.
    pub fn write_with<F>(&self, f: F) -> io::Result<()>
    where
        F: FnOnce(&mut dyn Write) -> io::Result<()>,
    {
        let mut writer = self.inner.lock();
        f(&mut **writer)?;
        writer.flush()
    }

    /// Print `text` under the lock.
    pub fn print(&self, text: &str) -> io::Result<()> {
        self.write_with(|w| w.write_all(text.as_bytes()))
    }

    /// Print `line` and a newline under the lock.
    pub fn println(&self, line: &str) -> io::Result<()> {
        self.write_with(|w| writeln!(w, "{line}"))
    }
}

impl std::fmt::Debug for SharedOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedOutput").finish_non_exhaustive()
    }
}

/// An in-memory writer for tests. Each flush closes a segment, so a test can
/// check that every print operation reached the writer in one piece.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct Capture {
    state: Arc<Mutex<CaptureState>>,
}

#[cfg(test)]
#[derive(Default)]
struct CaptureState {
    pending: Vec<u8>,
    segments: Vec<String>,
}

#[cfg(test)]
impl Capture {
    /// A [`SharedOutput`] writing into this capture.
    pub(crate) fn output(&self) -> SharedOutput {
        SharedOutput::new(self.clone())
    }

    /// Flushed print operations, in order.
    pub(crate) fn segments(&self) -> Vec<String> {
        self.state.lock().segments.clone()
    }

    /// Everything flushed so far.
    pub(crate) fn text(&self) -> String {
        self.segments().concat()
    }
}

#[cfg(test)]
impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.lock().pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        if !state.pending.is_empty() {
            let bytes = std::mem::take(&mut state.pending);
            state
                .segments
                .push(String::from_utf8_lossy(&bytes).into_owned());
        }
        Ok(())
    }
}
