//! Progress feedback for long-running transfers
//!
//! Downloads and uploads can take minutes for large archives. While one is in
//! flight a spinner is drawn on stderr, but only when stderr is a terminal so
//! command files and pipes stay clean.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK_STRINGS: &[&str] = &["◐", "◓", "◑", "◒", "●"];
const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Spinner shown while a request is outstanding; cleared on drop
#[derive(Debug)]
pub struct Spinner {
    bar: Option<ProgressBar>,
}

impl Spinner {
    /// Start a spinner if `enabled` and stderr is a terminal
    pub fn start(enabled: bool, message: impl Into<String>) -> Self {
        if !enabled || !atty::is(atty::Stream::Stderr) {
            return Self::hidden();
        }

        let bar = ProgressBar::new_spinner();
        match ProgressStyle::default_spinner().template("{spinner:.green} {msg} ({elapsed})") {
            Ok(style) => bar.set_style(style.tick_strings(TICK_STRINGS)),
            Err(e) => tracing::debug!("Spinner template rejected: {}", e),
        }
        bar.set_message(message.into());
        bar.enable_steady_tick(TICK_INTERVAL);
        Self { bar: Some(bar) }
    }

    /// A spinner that draws nothing
    pub fn hidden() -> Self {
        Self { bar: None }
    }

    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    pub fn finish(self) {
        drop(self);
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_spinner_is_hidden() {
        let spinner = Spinner::start(false, "Downloading");
        assert!(!spinner.is_visible());
        spinner.finish();
    }

    #[test]
    fn test_hidden_spinner_drops_cleanly() {
        let spinner = Spinner::hidden();
        assert!(!spinner.is_visible());
    }
}
