//! Status reporting for the build stages.

use crate::timing::{format_elapsed, Timer};

/// Sink for human-readable status updates.
pub trait Progress {
    /// The build moved on to a new step.
    fn status(&mut self, text: &str);

    /// A timed stage completed.
    fn finished(&mut self, timer: Timer) {
        let _ = timer;
    }
}

/// Prints status lines to stdout.
#[derive(Debug, Default)]
pub struct ConsoleProgress;

impl Progress for ConsoleProgress {
    fn status(&mut self, text: &str) {
        println!("{}", text);
    }

    fn finished(&mut self, timer: Timer) {
        println!("  {} {}", format_elapsed(timer.elapsed()), timer.name());
    }
}

/// Discards all updates.
#[derive(Debug, Default)]
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn status(&mut self, _text: &str) {}
}
