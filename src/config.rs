use crate::cli::Args;
use anyhow::{Context, Result, bail};
use chrono::Local;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use usls::Config;

/// Folders of the FaceForensics++ download, relative to the video root
pub const DEFAULT_LAYOUT: [(&str, Label); 4] = [
    ("Deepfakes/original_sequences/actors/c23/videos", Label::Real),
    ("Deepfakes/original_sequences/youtube/c23/videos", Label::Real),
    ("Deepfakes/manipulated_sequences/DeepFakeDetection/c23/videos", Label::Fake),
    ("Deepfakes/manipulated_sequences/Deepfakes/c23/videos", Label::Fake),
];

/// Class assigned to every video of an input folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    /// Name of the output sub-folder for this label
    pub fn dir_name(self) -> &'static str {
        match self {
            Label::Real => "real",
            Label::Fake => "fake",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Real => write!(f, "REAL"),
            Label::Fake => write!(f, "FAKE"),
        }
    }
}

/// One input folder, the folder its crops go to, and the label they carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderMapping {
    pub input: PathBuf,
    pub output: PathBuf,
    pub label: Label,
}

impl FolderMapping {
    pub fn new(input: impl Into<PathBuf>, output_root: &Path, label: Label) -> Self {
        Self {
            input: input.into(),
            output: output_root.join(label.dir_name()),
            label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSize {
    pub width: u32,
    pub height: u32,
}

impl CropSize {
    pub fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }
}

/// Per-video extraction parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSettings {
    /// Detection runs on frames whose index is a multiple of this
    pub frame_rate: u64,
    pub crop_size: CropSize,
    /// Video extension without the leading dot
    pub extension: String,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            frame_rate: 30,
            crop_size: CropSize::square(224),
            extension: "mp4".to_string(),
        }
    }
}

impl ExtractionSettings {
    pub fn new(frame_rate: u64, crop_size: CropSize, extension: &str) -> Result<Self> {
        if frame_rate == 0 {
            bail!("frame rate must be at least 1");
        }
        if crop_size.width == 0 || crop_size.height == 0 {
            bail!("crop size must be non-zero, got {}x{}", crop_size.width, crop_size.height);
        }
        let extension = extension.trim().trim_start_matches('.');
        if extension.is_empty() {
            bail!("video extension must not be empty");
        }
        Ok(Self {
            frame_rate,
            crop_size,
            extension: extension.to_string(),
        })
    }
}

/// Everything one batch run needs, in processing order
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub mappings: Vec<FolderMapping>,
    pub settings: ExtractionSettings,
    pub output_root: PathBuf,
}

impl BatchConfig {
    pub fn new(
        mappings: Vec<FolderMapping>,
        settings: ExtractionSettings,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mappings,
            settings,
            output_root: output_root.into(),
        }
    }

    /// Builds the batch from command line arguments. Explicit `--real` /
    /// `--fake` folders replace the default dataset layout.
    pub fn from_args(args: &Args, output_root: &Path) -> Result<Self> {
        let settings = ExtractionSettings::new(
            args.frame_rate,
            CropSize::square(args.crop_size),
            &args.extension,
        )?;

        let mappings = if args.real.is_empty() && args.fake.is_empty() {
            default_mappings(Path::new(&args.video_root), output_root)
        } else {
            args.real
                .iter()
                .map(|dir| FolderMapping::new(dir, output_root, Label::Real))
                .chain(
                    args.fake
                        .iter()
                        .map(|dir| FolderMapping::new(dir, output_root, Label::Fake)),
                )
                .collect()
        };

        Ok(Self::new(mappings, settings, output_root))
    }

    /// Distinct output folders with their labels, in first-use order
    pub fn output_dirs(&self) -> Vec<(Label, PathBuf)> {
        let mut dirs: Vec<(Label, PathBuf)> = Vec::new();
        for mapping in &self.mappings {
            if !dirs.iter().any(|(_, dir)| dir == &mapping.output) {
                dirs.push((mapping.label, mapping.output.clone()));
            }
        }
        dirs
    }
}

/// Maps the FaceForensics++ folders under `video_root` to `real/` and `fake/`
pub fn default_mappings(video_root: &Path, output_root: &Path) -> Vec<FolderMapping> {
    DEFAULT_LAYOUT
        .iter()
        .map(|(relative, label)| FolderMapping::new(video_root.join(relative), output_root, *label))
        .collect()
}

/// Creates the output root. An empty request yields a timestamped folder under `./runs`.
pub fn create_output_dir(requested: &str) -> Result<PathBuf> {
    let output_dir = if requested.is_empty() {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        PathBuf::from(format!("./runs/{}", timestamp))
    } else {
        PathBuf::from(requested)
    };
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    Ok(output_dir)
}

/// Builds the face detection model configuration from command line arguments
pub fn build_model_config(args: &Args) -> Result<Config> {
    let config = Config::yolo()
        .with_model_file(&args.model)
        .with_task(args.task.parse()?)
        .with_version(args.ver.try_into()?)
        .with_scale(args.scale.parse()?)
        .with_model_dtype(args.dtype.parse()?)
        .with_model_device(args.device.parse()?)
        .with_class_confs(&[args.confidence])
        .with_model_num_dry_run(1);

    Ok(config)
}
