//! Optional spinner shown while a remote step is running.

use std::future::Future;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Spinner policy for long remote calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Progress {
    /// No terminal output.
    #[default]
    Hidden,
    /// Steady-tick spinner on stderr.
    Spinner,
}

impl Progress {
    /// Spinner when `enabled`, hidden otherwise.
    #[must_use]
    pub fn from_flag(enabled: bool) -> Self {
        if enabled { Self::Spinner } else { Self::Hidden }
    }

    /// Awaits `future`, showing `message` next to a spinner while it runs.
    pub async fn run<F, T>(self, message: impl Into<String>, future: F) -> T
    where
        F: Future<Output = T>,
    {
        let Self::Spinner = self else {
            return future.await;
        };
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.into());
        spinner.enable_steady_tick(Duration::from_millis(100));
        let output = future.await;
        spinner.finish_and_clear();
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hidden_progress_returns_future_output() {
        let value = Progress::Hidden.run("working", async { 41 + 1 }).await;
        assert_eq!(value, 42);
    }

    #[test]
    fn test_from_flag() {
        assert_eq!(Progress::from_flag(true), Progress::Spinner);
        assert_eq!(Progress::from_flag(false), Progress::Hidden);
    }
}
