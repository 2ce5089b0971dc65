//! Stage progress display for TTY and non-TTY environments.
//!
//! TTY mode: spinner status lines per pipeline stage.
//! Non-TTY mode: hidden bars, logs carry the progress.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Central progress context; create one per process.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: std::io::stderr().is_terminal(),
        }
    }

    /// Status line with a spinner for one pipeline stage.
    ///
    /// Update with `set_message`, end with `finish_and_clear`.
    pub fn stage_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {prefix:<12.cyan.bold} {wide_msg}")
                .expect("invalid template"),
        );
        pb.set_prefix(name.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// `MultiProgress` handle for the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_line_is_hidden_off_tty() {
        let ctx = ProgressContext {
            multi: MultiProgress::new(),
            is_tty: false,
        };
        let pb = ctx.stage_line("projects");
        assert!(pb.is_hidden());
    }
}
