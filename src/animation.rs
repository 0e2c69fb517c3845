//! Terminal status [`Animation`]s and the [`Animator`] that renders them while
//! a request is in flight.

use std::{io::Write, sync::Arc, time::Duration};

use crossterm::{
    cursor,
    style::Stylize,
    terminal::{Clear, ClearType},
    QueueableCommand,
};
use serde::{Deserialize, Serialize};

use crate::{
    lifecycle::{Lifecycle, State},
    output::SharedOutput,
};

/// A cyclic sequence of frames and the time each frame stays on screen.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Animation {
    /// A spinning bar.
    #[default]
    Spin,
    /// Growing dots.
    Dots,
}

impl Animation {
    /// Frames, shown in order and wrapping around.
    pub const fn frames(self) -> &'static [&'static str] {
        match self {
            Self::Spin => &["-", "/", "|", "\\"],
            Self::Dots => &[".  ", ".. ", "...", "   "],
        }
    }

    /// Time between two frames.
    pub const fn interval(self) -> Duration {
        match self {
            Self::Spin => Duration::from_millis(100),
            Self::Dots => Duration::from_millis(400),
        }
    }
}

/// Renders the request status until the [`Lifecycle`] is finished.
///
/// Non-streaming requests keep the status on the current line and overwrite it
/// when done. Streaming requests pin the status to the first terminal row,
/// since the answer is being written below it, and print a banner once the
/// answer is complete.
#[derive(Debug)]
pub struct Animator {
    animation: Animation,
    streaming: bool,
    lifecycle: Arc<Lifecycle>,
    output: SharedOutput,
}

impl Animator {
    /// Banner printed under a streamed answer.
    pub const BANNER: &'static str = "Answer complete";

    /// Create an animator observing `lifecycle`.
    pub fn new(
        animation: Animation,
        streaming: bool,
        lifecycle: Arc<Lifecycle>,
        output: SharedOutput,
    ) -> Self {
        Self {
            animation,
            streaming,
            lifecycle,
            output,
        }
    }

    /// Draw one frame per interval until the request is finished, then draw
    /// the completed status. The completed status is always the last thing
    /// this writes.
    ///
    /// Returns at most one interval after [`Lifecycle::finish`] is called.
    pub async fn run(self) {
        let frames = self.animation.frames();
        let mut tick = 0usize;

        loop {
            let state = self.lifecycle.state();
            if state.is_terminal() {
                break;
            }

            let frame = frames[tick % frames.len()];
            self.render(|w| self.draw(w, frame, state));

            tokio::time::sleep(self.animation.interval()).await;
            tick = tick.wrapping_add(1);
        }

        self.render(|w| self.complete(w));
    }

    /// Write under the output lock. Terminal errors are not fatal: the loop
    /// must keep observing the lifecycle either way.
    fn render<F>(&self, f: F)
    where
        F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
    {
        if let Err(_error) = self.output.write_with(f) {
            #[cfg(feature = "log")]
            log::warn!("Could not draw status: {}", _error);
        }
    }

    fn draw(
        &self,
        w: &mut dyn Write,
        frame: &str,
        state: State,
    ) -> std::io::Result<()> {
        let line = format!("{} {}", state.label(), frame.cyan());
        if self.streaming {
            pinned(w, &line)
        } else {
            inline(w, &line)
        }
    }

    fn complete(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let line = format!("{} {}", "✓".green(), State::Completed.label());
        if self.streaming {
            pinned(w, &line)?;
            write!(w, "\n\n{} {}\n", "✓".green(), Self::BANNER)
        } else {
            inline(w, &line)?;
            writeln!(w)
        }
    }
}

/// Replace the current line with `line`.
fn inline(w: &mut dyn Write, line: &str) -> std::io::Result<()> {
    w.write_all(b"\r")?;
    w.queue(Clear(ClearType::CurrentLine))?;
    write!(w, "{line}")
}

/// Replace the first terminal row with `line` and put the cursor back.
///
/// The row is absolute on the visible screen, not relative to where this
/// invocation started. Whatever sits on that row (old scrollback included) is
/// overwritten, and the final status stays there once the answer is done.
fn pinned(w: &mut dyn Write, line: &str) -> std::io::Result<()> {
    w.queue(cursor::SavePosition)?
        .queue(cursor::MoveTo(0, 0))?
        .queue(Clear(ClearType::CurrentLine))?;
    write!(w, "{line}")?;
    w.queue(cursor::RestorePosition)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Capture;
    use tokio::time::{sleep, Instant};

    const CLEAR_LINE: &str = "\x1b[2K";
    const ROW_ONE: &str = "\x1b[1;1H";

    fn animator(
        animation: Animation,
        streaming: bool,
    ) -> (Animator, Arc<Lifecycle>, Capture) {
        let lifecycle = Arc::new(Lifecycle::new());
        let capture = Capture::default();
        let animator = Animator::new(
            animation,
            streaming,
            Arc::clone(&lifecycle),
            capture.output(),
        );
        (animator, lifecycle, capture)
    }

    #[test]
    fn test_animations() {
        for animation in [Animation::Spin, Animation::Dots] {
            assert_eq!(animation.frames().len(), 4);
        }
        assert!(Animation::Spin.interval() < Animation::Dots.interval());
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_cycle_until_finished() {
        let (animator, lifecycle, capture) = animator(Animation::Spin, false);

        tokio::join!(animator.run(), async {
            // Frames are drawn at 0, 100, 200 and 300 ms.
            sleep(Duration::from_millis(350)).await;
            lifecycle.finish();
        });

        let segments = capture.segments();
        assert_eq!(segments.len(), 5, "{segments:?}");
        for (segment, frame) in segments.iter().zip(["-", "/", "|", "\\"]) {
            assert!(segment.starts_with('\r'));
            assert!(segment.contains(CLEAR_LINE));
            assert!(segment.contains("Requesting"));
            assert!(segment.contains(frame));
        }
        let last = segments.last().unwrap();
        assert!(last.contains(CLEAR_LINE));
        assert!(last.contains("Completed"));
        assert!(last.ends_with('\n'));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_wrap_around() {
        let (animator, lifecycle, capture) = animator(Animation::Dots, false);

        tokio::join!(animator.run(), async {
            sleep(Duration::from_millis(1800)).await;
            lifecycle.finish();
        });

        let segments = capture.segments();
        // 0, 400, 800, 1200, 1600, then completion.
        assert_eq!(segments.len(), 6);
        assert!(segments[4].contains(".  "));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_within_one_interval() {
        for animation in [Animation::Spin, Animation::Dots] {
            let (animator, lifecycle, _capture) = animator(animation, false);

            let ((), finished_at) = tokio::join!(animator.run(), async {
                sleep(Duration::from_millis(1234)).await;
                lifecycle.finish();
                Instant::now()
            });

            assert!(finished_at.elapsed() <= animation.interval());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_finished_draws_only_completion() {
        let (animator, lifecycle, capture) = animator(Animation::Spin, false);
        lifecycle.finish();

        animator.run().await;

        let segments = capture.segments();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].contains("Completed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_streaming_status_is_pinned() {
        let (animator, lifecycle, capture) = animator(Animation::Spin, true);

        tokio::join!(animator.run(), async {
            sleep(Duration::from_millis(150)).await;
            lifecycle.mark_progress();
            sleep(Duration::from_millis(100)).await;
            lifecycle.finish();
        });

        let segments = capture.segments();
        assert!(segments[0].contains("Requesting"));
        assert!(segments[2].contains("Receiving"));
        for segment in &segments {
            assert!(segment.contains(ROW_ONE));
            assert!(!segment.starts_with('\r'));
        }
        let last = segments.last().unwrap();
        assert!(last.contains("Completed"));
        assert!(last.contains(Animator::BANNER));
    }
}
