use crate::config::ExtractionSettings;
use crate::crop::{self, CropError};
use crate::detector::{DetectionError, FaceLocator};
use crate::video::{
    ChannelOrder, FrameSample, FrameSampler, VideoBackend, VideoError, reorder_channels,
};
use crate::writer;
use log::{debug, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a sampled frame produced no crop
#[derive(Debug, Error)]
pub enum FrameFailure {
    #[error(transparent)]
    Detection(#[from] DetectionError),
    #[error(transparent)]
    Crop(#[from] CropError),
    #[error("failed to write face crop {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    /// Another video already wrote this crop name during the run
    #[error("face crop {} was already written by another video", .0.display())]
    NameCollision(PathBuf),
}

/// Result of running detection on one sampled frame
#[derive(Debug)]
pub enum FrameOutcome {
    Saved(PathBuf),
    NoFace,
    Failed(FrameFailure),
}

/// Per-video counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VideoTally {
    pub frames_decoded: u64,
    pub empty_frames: u64,
    pub frames_sampled: u64,
    pub faces_saved: u64,
    pub no_face: u64,
    pub frame_failures: u64,
}

impl VideoTally {
    fn record(&mut self, outcome: &FrameOutcome) {
        self.frames_sampled += 1;
        match outcome {
            FrameOutcome::Saved(_) => self.faces_saved += 1,
            FrameOutcome::NoFace => self.no_face += 1,
            FrameOutcome::Failed(_) => self.frame_failures += 1,
        }
    }

    pub fn merge(&mut self, other: &VideoTally) {
        self.frames_decoded += other.frames_decoded;
        self.empty_frames += other.empty_frames;
        self.frames_sampled += other.frames_sampled;
        self.faces_saved += other.faces_saved;
        self.no_face += other.no_face;
        self.frame_failures += other.frame_failures;
    }
}

/// Result of one video pass
#[derive(Debug)]
pub enum VideoOutcome {
    Processed(VideoTally),
    Unopenable(VideoError),
}

impl VideoOutcome {
    pub fn faces_saved(&self) -> u64 {
        match self {
            VideoOutcome::Processed(tally) => tally.faces_saved,
            VideoOutcome::Unopenable(_) => 0,
        }
    }
}

/// Drives one video at a time through decode, detection, crop and write
pub struct FaceExtractor<B, L> {
    backend: B,
    locator: L,
    settings: ExtractionSettings,
    written: HashSet<PathBuf>,
}

impl<B: VideoBackend, L: FaceLocator> FaceExtractor<B, L> {
    pub fn new(backend: B, locator: L, settings: ExtractionSettings) -> Self {
        Self {
            backend,
            locator,
            settings,
            written: HashSet::new(),
        }
    }

    pub fn settings(&self) -> &ExtractionSettings {
        &self.settings
    }

    /// Extracts the first face of every sampled frame of `video` into `output_dir`.
    ///
    /// Never fails: an unopenable video is reported as such and per-frame
    /// failures are counted in the tally. A video that opens but yields no
    /// decodable frame is reported as unopenable too. The decode handle is
    /// dropped before returning on every path.
    pub fn process_video(&mut self, video: &Path, output_dir: &Path) -> VideoOutcome {
        let reader = match self.backend.open(video) {
            Ok(reader) => reader,
            Err(err) => {
                warn!("Skipping unreadable video {}: {}", video.display(), err);
                return VideoOutcome::Unopenable(err);
            }
        };

        let stem = writer::video_stem(video);
        let mut tally = VideoTally::default();

        for sample in FrameSampler::new(reader) {
            tally.frames_decoded += 1;
            if sample.is_empty() {
                tally.empty_frames += 1;
                continue;
            }
            if !sample.is_sample_point(self.settings.frame_rate) {
                continue;
            }

            let outcome = self.process_frame(&sample, &stem, output_dir);
            if let FrameOutcome::Failed(reason) = &outcome {
                debug!("{} frame {}: {}", video.display(), sample.index, reason);
            }
            tally.record(&outcome);
        }

        if tally.frames_decoded == 0 {
            let err = VideoError::NoFrames(video.to_path_buf());
            warn!("Skipping unreadable video {}: {}", video.display(), err);
            return VideoOutcome::Unopenable(err);
        }

        debug!("{}: {:?}", video.display(), tally);
        VideoOutcome::Processed(tally)
    }

    /// Detects, crops and saves the first face of one frame
    pub fn process_frame(
        &mut self,
        sample: &FrameSample,
        video_stem: &str,
        output_dir: &Path,
    ) -> FrameOutcome {
        match self.extract_face(sample, video_stem, output_dir) {
            Ok(Some(path)) => FrameOutcome::Saved(path),
            Ok(None) => FrameOutcome::NoFace,
            Err(failure) => FrameOutcome::Failed(failure),
        }
    }

    fn extract_face(
        &mut self,
        sample: &FrameSample,
        video_stem: &str,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>, FrameFailure> {
        let detector_order = self.locator.channel_order();
        let detector_input = reorder_channels(&sample.image, sample.order, detector_order);
        let faces = self.locator.locate(&detector_input, detector_order)?;

        // Only the highest ranked face is kept
        let Some(face) = faces.first() else {
            return Ok(None);
        };

        let area = crop::calculate_crop_area(*face, sample.image.width(), sample.image.height())?;
        let frame = reorder_channels(&sample.image, sample.order, ChannelOrder::Rgb);
        let face_crop = writer::create_face_crop(&frame, &area, self.settings.crop_size);

        let path = output_dir.join(writer::crop_file_name(video_stem, sample.index));
        if self.written.contains(&path) {
            return Err(FrameFailure::NameCollision(path));
        }
        writer::save_face_crop(&face_crop, &path).map_err(|source| FrameFailure::Write {
            path: path.clone(),
            source,
        })?;
        self.written.insert(path.clone());
        Ok(Some(path))
    }
}
