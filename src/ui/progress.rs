use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

pub fn create_status_spinner() -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    apply_status_style(&pb);
    pb.enable_steady_tick(Duration::from_millis(250));
    pb
}

/// Spinner that draws nowhere, for tests and non-interactive runs.
pub fn create_hidden_spinner() -> ProgressBar {
    let pb = ProgressBar::hidden();
    apply_status_style(&pb);
    pb
}

fn apply_status_style(pb: &ProgressBar) {
    let style = ProgressStyle::default_spinner()
        .template("{prefix:.bold.dim} {spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_prefix("Surface");
}
