use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Observational progress channel for paginated fetches. Purely a side
/// channel: nothing in the client reads it back, so it cannot affect
/// control flow or data correctness.
pub struct FetchProgress {
    bar: Option<ProgressBar>,
}

impl FetchProgress {
    pub fn spinner() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        FetchProgress { bar: Some(bar) }
    }

    /// Silent progress for tests and quiet paths.
    pub fn hidden() -> Self {
        FetchProgress { bar: None }
    }

    pub fn set_message(&mut self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
        }
    }

    pub fn page_fetched(&mut self, page: usize, total_records: usize) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("page {} ({} records)", page, total_records));
            bar.tick();
        }
    }

    pub fn finish(&mut self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        }
    }
}

impl Drop for FetchProgress {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}
