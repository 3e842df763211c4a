use geodrill_poller::{IterationReport, PollObserver};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar over the iterations of one polling run
pub struct PollProgress {
    bar: ProgressBar,
}

impl PollProgress {
    /// A visible bar, or a hidden one when output is machine-readable
    pub fn new(total: u32, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };

        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.blue} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("█▓▒░ "));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    pub fn finish(&self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }
}

impl PollObserver for PollProgress {
    fn on_iteration(&self, report: &IterationReport) {
        self.bar.inc(1);
        match (&report.point, &report.error) {
            (Some(point), _) => self.bar.set_message(format!(
                "index {} depth {:.1} m ({})",
                report.index, point.depth, point.lithology
            )),
            (None, Some(error)) => self
                .bar
                .println(format!("✗ index {} skipped: {}", report.index, error)),
            (None, None) => {}
        }
    }
}
