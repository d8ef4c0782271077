use crate::config::{BatchConfig, FolderMapping, Label};
use crate::detector::FaceLocator;
use crate::extractor::{FaceExtractor, VideoOutcome, VideoTally};
use crate::progress::VideoProgressTracker;
use crate::video::VideoBackend;
use crate::writer;
use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderStatus {
    /// The input folder does not exist
    Missing,
    /// The input folder exists but could not be listed
    Unreadable(String),
    Processed,
}

/// What one configured folder contributed to the batch
#[derive(Debug, Clone)]
pub struct FolderSummary {
    pub mapping: FolderMapping,
    pub status: FolderStatus,
    pub videos: u64,
    pub unopenable_videos: u64,
    pub tally: VideoTally,
}

impl FolderSummary {
    fn new(mapping: &FolderMapping, status: FolderStatus) -> Self {
        Self {
            mapping: mapping.clone(),
            status,
            videos: 0,
            unopenable_videos: 0,
            tally: VideoTally::default(),
        }
    }

    fn record(&mut self, outcome: &VideoOutcome) {
        self.videos += 1;
        match outcome {
            VideoOutcome::Processed(tally) => self.tally.merge(tally),
            VideoOutcome::Unopenable(_) => self.unopenable_videos += 1,
        }
    }
}

/// Result of a whole batch run
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub folders: Vec<FolderSummary>,
    pub outputs: Vec<(Label, PathBuf)>,
}

impl BatchSummary {
    /// Tally summed over every folder carrying `label`
    pub fn totals_for(&self, label: Label) -> VideoTally {
        let mut total = VideoTally::default();
        for folder in self.folders.iter().filter(|f| f.mapping.label == label) {
            total.merge(&folder.tally);
        }
        total
    }

    pub fn skipped_folders(&self) -> usize {
        self.folders
            .iter()
            .filter(|f| f.status != FolderStatus::Processed)
            .count()
    }

    /// Terminal report naming the output folders and what each input folder yielded
    pub fn report(&self) -> String {
        let mut report = String::from("--- Preprocessing Complete ---\n");

        for folder in &self.folders {
            let label = folder.mapping.label;
            let input = folder.mapping.input.display();
            let _ = match &folder.status {
                FolderStatus::Missing => {
                    writeln!(report, "  [{}] {}: not found, skipped", label, input)
                }
                FolderStatus::Unreadable(reason) => {
                    writeln!(report, "  [{}] {}: unreadable ({}), skipped", label, input, reason)
                }
                FolderStatus::Processed => writeln!(
                    report,
                    "  [{}] {}: {} videos ({} unreadable), {} sampled frames, \
                     {} faces saved, {} frame failures",
                    label,
                    input,
                    folder.videos,
                    folder.unopenable_videos,
                    folder.tally.frames_sampled,
                    folder.tally.faces_saved,
                    folder.tally.frame_failures,
                ),
            };
        }

        let skipped = self.skipped_folders();
        if skipped > 0 {
            let _ = writeln!(report, "{} of {} folders skipped", skipped, self.folders.len());
        }

        for (label, dir) in &self.outputs {
            let saved = self.totals_for(*label).faces_saved;
            let name = match label {
                Label::Real => "Real",
                Label::Fake => "Fake",
            };
            let _ = writeln!(
                report,
                "{} faces saved to: {} ({} crops)",
                name,
                dir.display(),
                saved
            );
        }
        report
    }
}

/// Lists the files directly inside `dir` with the given extension, sorted by name
pub fn list_videos(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut videos = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension));
        if matches && path.is_file() {
            videos.push(path);
        }
    }
    videos.sort();
    Ok(videos)
}

/// Stems shared by more than one of `videos`, each with the videos using it.
/// Crop names start with the stem, so these videos would write the same files.
pub fn duplicate_stems<'a>(
    videos: impl IntoIterator<Item = &'a PathBuf>,
) -> Vec<(String, Vec<&'a PathBuf>)> {
    let mut by_stem: HashMap<String, Vec<&PathBuf>> = HashMap::new();
    for video in videos {
        by_stem.entry(writer::video_stem(video)).or_default().push(video);
    }
    let mut clashes: Vec<_> = by_stem
        .into_iter()
        .filter(|(_, videos)| videos.len() > 1)
        .collect();
    clashes.sort();
    clashes
}

/// Runs the face extractor over every configured folder, in order
pub struct BatchDriver<B, L> {
    extractor: FaceExtractor<B, L>,
    config: BatchConfig,
    show_progress: bool,
}

impl<B: VideoBackend, L: FaceLocator> BatchDriver<B, L> {
    pub fn new(extractor: FaceExtractor<B, L>, config: BatchConfig) -> Self {
        Self {
            extractor,
            config,
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Creates every output folder. Safe to call when they already exist.
    pub fn prepare_output_dirs(&self) -> Result<()> {
        for (_, dir) in self.config.output_dirs() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        }
        Ok(())
    }

    /// Processes all folders. Only failing to create an output folder is an
    /// error; missing folders and bad videos are recorded in the summary.
    pub fn run(&mut self) -> Result<BatchSummary> {
        self.prepare_output_dirs()?;

        let mappings = self.config.mappings.clone();
        self.warn_on_duplicate_stems(&mappings);

        let folders = mappings
            .iter()
            .map(|mapping| self.process_folder(mapping))
            .collect();

        Ok(BatchSummary {
            folders,
            outputs: self.config.output_dirs(),
        })
    }

    /// Warns, per output folder, about videos whose crops would share names.
    /// The extractor keeps the first crop written under a name.
    fn warn_on_duplicate_stems(&self, mappings: &[FolderMapping]) {
        let extension = &self.extractor.settings().extension;
        let mut per_output: HashMap<&Path, Vec<PathBuf>> = HashMap::new();
        for mapping in mappings.iter().filter(|m| m.input.is_dir()) {
            if let Ok(videos) = list_videos(&mapping.input, extension) {
                per_output.entry(&mapping.output).or_default().extend(videos);
            }
        }

        for (output, videos) in &per_output {
            for (stem, clashing) in duplicate_stems(videos) {
                let names: Vec<String> = clashing.iter().map(|v| v.display().to_string()).collect();
                warn!(
                    "Videos share the crop name stem '{}' in {}, clashing crops are skipped: {}",
                    stem,
                    output.display(),
                    names.join(", ")
                );
            }
        }
    }

    /// Processes every video of one folder into its output folder
    pub fn process_folder(&mut self, mapping: &FolderMapping) -> FolderSummary {
        if !mapping.input.is_dir() {
            warn!("Folder not found, skipping: {}", mapping.input.display());
            return FolderSummary::new(mapping, FolderStatus::Missing);
        }

        let videos = match list_videos(&mapping.input, &self.extractor.settings().extension) {
            Ok(videos) => videos,
            Err(err) => {
                warn!("Could not list {}, skipping: {}", mapping.input.display(), err);
                return FolderSummary::new(mapping, FolderStatus::Unreadable(err.to_string()));
            }
        };

        info!(
            "Processing folder: {} ({} videos, {})",
            mapping.input.display(),
            videos.len(),
            mapping.label
        );

        let mut progress = if self.show_progress {
            VideoProgressTracker::new(videos.len() as u64, "Extracting faces")
        } else {
            VideoProgressTracker::hidden(videos.len() as u64)
        };

        let mut summary = FolderSummary::new(mapping, FolderStatus::Processed);
        for video in &videos {
            let outcome = self.extractor.process_video(video, &mapping.output);
            progress.update_video(outcome.faces_saved());
            summary.record(&outcome);
        }
        progress.finish();

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionSettings;
    use crate::crop::FaceBox;
    use crate::testing::{ScriptedBackend, ScriptedLocator, marked_frames};

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    fn driver(
        backend: ScriptedBackend,
        mappings: Vec<FolderMapping>,
        output_root: &Path,
    ) -> BatchDriver<ScriptedBackend, ScriptedLocator> {
        let locator = ScriptedLocator::always(vec![FaceBox::new(0, 0, 16, 16)]);
        let settings = ExtractionSettings::default();
        let extractor = FaceExtractor::new(backend, locator, settings.clone());
        BatchDriver::new(extractor, BatchConfig::new(mappings, settings, output_root))
            .with_progress(false)
    }

    #[test]
    fn test_list_videos_filters_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.mp4");
        touch(dir.path(), "a.MP4");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "mp4");
        fs::create_dir(dir.path().join("nested.mp4")).unwrap();

        let names: Vec<String> = list_videos(dir.path(), "mp4")
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.MP4", "b.mp4"]);
    }

    #[test]
    fn test_unreadable_video_does_not_stop_folder() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        for name in ["a.mp4", "broken.mp4", "c.mp4"] {
            touch(input.path(), name);
        }
        let backend = ScriptedBackend::new()
            .with_video("a.mp4", marked_frames(31, 32, 32))
            .with_video("c.mp4", marked_frames(31, 32, 32));
        let mapping = FolderMapping::new(input.path(), output.path(), Label::Fake);
        let mut driver = driver(backend, vec![mapping], output.path());

        let summary = driver.run().unwrap();

        let folder = &summary.folders[0];
        assert_eq!(folder.status, FolderStatus::Processed);
        assert_eq!(folder.videos, 3);
        assert_eq!(folder.unopenable_videos, 1);
        assert_eq!(folder.tally.faces_saved, 4);
        assert!(output.path().join("fake/c_frame30.jpg").is_file());
    }

    #[test]
    fn test_missing_folder_is_skipped() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        touch(input.path(), "a.mp4");
        let backend = ScriptedBackend::new().with_video("a.mp4", marked_frames(1, 32, 32));
        let mappings = vec![
            FolderMapping::new(input.path().join("gone"), output.path(), Label::Real),
            FolderMapping::new(input.path(), output.path(), Label::Real),
        ];
        let mut driver = driver(backend, mappings, output.path());

        let summary = driver.run().unwrap();

        assert_eq!(summary.folders[0].status, FolderStatus::Missing);
        assert_eq!(summary.folders[1].status, FolderStatus::Processed);
        assert_eq!(summary.folders[1].tally.faces_saved, 1);
        assert_eq!(summary.skipped_folders(), 1);
        assert!(output.path().join("real/a_frame0.jpg").is_file());
    }

    #[test]
    fn test_run_creates_outputs_and_totals_by_label() {
        let real = tempfile::tempdir().unwrap();
        let fake = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        touch(real.path(), "r.mp4");
        touch(fake.path(), "f.mp4");
        let backend = ScriptedBackend::new()
            .with_video("r.mp4", marked_frames(61, 32, 32))
            .with_video("f.mp4", marked_frames(1, 32, 32));
        let mappings = vec![
            FolderMapping::new(real.path(), output.path(), Label::Real),
            FolderMapping::new(fake.path(), output.path(), Label::Fake),
            FolderMapping::new(output.path().join("absent"), output.path(), Label::Fake),
        ];
        let mut driver = driver(backend, mappings, output.path());

        let summary = driver.run().unwrap();

        assert!(output.path().join("real").is_dir());
        assert!(output.path().join("fake").is_dir());
        assert_eq!(summary.totals_for(Label::Real).faces_saved, 3);
        assert_eq!(summary.totals_for(Label::Fake).faces_saved, 1);

        let report = summary.report();
        assert!(report.contains("Real faces saved to:"));
        assert!(report.contains("Fake faces saved to:"));
        assert!(report.contains("not found, skipped"));
    }

    #[test]
    fn test_folders_sharing_output_keep_first_crops() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        touch(first.path(), "000.mp4");
        touch(second.path(), "000.mp4");
        let backend = ScriptedBackend::new().with_video("000.mp4", marked_frames(31, 32, 32));
        let mappings = vec![
            FolderMapping::new(first.path(), output.path(), Label::Real),
            FolderMapping::new(second.path(), output.path(), Label::Real),
        ];
        let mut driver = driver(backend, mappings, output.path());

        let summary = driver.run().unwrap();

        let real = summary.totals_for(Label::Real);
        assert_eq!(real.faces_saved, 2);
        assert_eq!(real.frame_failures, 2);
        let written = fs::read_dir(output.path().join("real")).unwrap().count() as u64;
        assert_eq!(written, real.faces_saved);
    }

    #[test]
    fn test_duplicate_stems() {
        let videos: Vec<PathBuf> = ["r1/000.mp4", "r2/000.mp4", "r2/001.mp4", "f/000.orig.mp4"]
            .iter()
            .map(PathBuf::from)
            .collect();

        let clashes = duplicate_stems(&videos);

        assert_eq!(clashes.len(), 1);
        assert_eq!(clashes[0].0, "000");
        assert_eq!(clashes[0].1.len(), 3);
    }

    #[test]
    fn test_report_counts_skipped_folders() {
        let output = tempfile::tempdir().unwrap();
        let mapping = FolderMapping::new(output.path().join("gone"), output.path(), Label::Fake);
        let mut driver = driver(ScriptedBackend::new(), vec![mapping], output.path());

        let report = driver.run().unwrap().report();
        assert!(report.contains("1 of 1 folders skipped"));
    }

    #[test]
    fn test_prepare_output_dirs_is_idempotent() {
        let output = tempfile::tempdir().unwrap();
        let mapping = FolderMapping::new(output.path().join("in"), output.path(), Label::Real);
        let driver = driver(ScriptedBackend::new(), vec![mapping], output.path());

        driver.prepare_output_dirs().unwrap();
        driver.prepare_output_dirs().unwrap();
        assert!(output.path().join("real").is_dir());
    }
}
