use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

/// Progress tracker for the videos of one input folder
pub struct VideoProgressTracker {
    progress_bar: ProgressBar,
    start_time: Instant,
    total_videos: u64,
    processed_videos: u64,
    faces_saved: u64,
}

impl VideoProgressTracker {
    /// Creates a visible progress bar over `total_videos` videos
    pub fn new(total_videos: u64, operation_name: &str) -> Self {
        let progress_bar = ProgressBar::new(total_videos);

        let style = ProgressStyle::default_bar()
            .template(
                "{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} videos | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        progress_bar.set_style(style);
        progress_bar.set_prefix(operation_name.to_string());

        Self::with_bar(progress_bar, total_videos)
    }

    /// Creates a tracker that counts without drawing anything
    pub fn hidden(total_videos: u64) -> Self {
        Self::with_bar(ProgressBar::hidden(), total_videos)
    }

    fn with_bar(progress_bar: ProgressBar, total_videos: u64) -> Self {
        progress_bar.set_message("Starting...");
        Self {
            progress_bar,
            start_time: Instant::now(),
            total_videos,
            processed_videos: 0,
            faces_saved: 0,
        }
    }

    /// Records one finished video and the faces it yielded
    pub fn update_video(&mut self, faces_saved: u64) {
        self.processed_videos += 1;
        self.faces_saved += faces_saved;
        self.progress_bar.inc(1);

        let msg = self.get_progress_message();
        self.progress_bar.set_message(msg);
    }

    fn get_progress_message(&self) -> String {
        if self.processed_videos == 0 {
            return "Starting...".to_string();
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let seconds_per_video = elapsed / self.processed_videos as f64;
        let remaining = self.total_videos.saturating_sub(self.processed_videos);

        format!(
            "{} faces | {:.1}s/video | ETA: {}",
            self.faces_saved,
            seconds_per_video,
            format_duration(seconds_per_video * remaining as f64)
        )
    }

    /// Finishes the progress bar
    pub fn finish(&self) {
        let processing_time = format_duration(self.start_time.elapsed().as_secs_f64());
        self.progress_bar.finish_with_message(format!(
            "Completed! {} faces from {} videos in {}",
            self.faces_saved, self.processed_videos, processing_time
        ));
    }
}

/// Formats a duration in seconds to h:mm:ss format
fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
