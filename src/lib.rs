//! Face extraction for building real/fake training sets out of labeled
//! video folders.
//!
//! The pipeline samples every Nth frame of each video, asks a face locator
//! for the best face, and writes a fixed-size crop per hit:
//! 1. `video` - decode backend and frame numbering
//! 2. `detector` - face locator backends
//! 3. `crop` / `writer` - crop geometry, resize and JPEG output
//! 4. `extractor` - one video end to end
//! 5. `batch` - folders in configured order, progress and run summary

pub mod batch;
pub mod cli;
pub mod config;
pub mod crop;
pub mod detector;
pub mod extractor;
pub mod progress;
pub mod video;
pub mod writer;

#[cfg(test)]
mod testing;

/// Initializes the logger, filtered by `RUST_LOG` (default `info`)
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();
}
