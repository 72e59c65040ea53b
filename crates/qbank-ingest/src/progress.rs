//! Terminal progress for ingestion runs

use indicatif::{ProgressBar, ProgressStyle};

const RUN_TEMPLATE: &str =
    "{msg} {spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})";

/// Bar over the candidates of one collection run.
///
/// Falls back to the default style if the template is rejected.
pub fn create_run_progress(total: u64, collection: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(RUN_TEMPLATE) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(collection.to_string());
    pb
}
