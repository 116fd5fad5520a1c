use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::Progress;

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";

/// Terminal progress bar fed by extraction progress events.
pub struct ExtractionBar {
    bar: ProgressBar,
}

impl ExtractionBar {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }

    /// Apply one progress event: a row about to start, or a row finished.
    pub fn update(&self, progress: Progress<'_>) {
        self.bar.set_length(progress.total as u64);
        self.bar.set_position(progress.completed as u64);
        self.bar.set_message(status_message(&progress));
    }

    pub fn finish(&self, message: &'static str) {
        self.bar.finish_with_message(message);
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

pub fn status_message(progress: &Progress<'_>) -> String {
    format!("Processing {}", progress.entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_names_current_entity() {
        let progress = Progress {
            entity: "Acme",
            completed: 0,
            total: 2,
        };
        assert_eq!(status_message(&progress), "Processing Acme");
    }

    #[test]
    fn bar_tracks_position() {
        let bar = ExtractionBar::new(3);
        bar.update(Progress {
            entity: "Acme",
            completed: 1,
            total: 3,
        });
        assert_eq!(bar.bar.position(), 1);
        assert_eq!(bar.bar.length(), Some(3));
    }
}
