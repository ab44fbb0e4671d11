use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use parallel_gzip::Progress;

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})";

/// Terminal progress bar fed by the pipeline writer.
pub struct BarProgress(ProgressBar);

impl BarProgress {
    pub fn new(total: u64) -> Self {
        let pb = ProgressBar::new(total);
        pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
        pb.set_style(
            ProgressStyle::with_template(TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self(pb)
    }

    pub fn finish(&self) {
        self.0.finish_with_message("Done!");
    }

    pub fn abandon(&self) {
        self.0.abandon();
    }
}

impl Progress for BarProgress {
    fn update(&self, processed: u64, total: u64) {
        self.0.set_length(total);
        self.0.set_position(processed);
    }
}
