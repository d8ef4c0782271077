use crate::crop::FaceBox;
use crate::video::ChannelOrder;
use anyhow::Result;
use image::RgbImage;
use thiserror::Error;
use usls::{Config, Image, Model, Runtime, models::YOLO};

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("frame has zero area ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("detector expects {expected:?} channel order, got {actual:?}")]
    ChannelOrder {
        expected: ChannelOrder,
        actual: ChannelOrder,
    },
    #[error("face detector failed: {0}")]
    Backend(String),
}

/// Finds faces in a single frame
pub trait FaceLocator {
    /// Channel order the frames passed to [`FaceLocator::locate`] must be in
    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Rgb
    }

    /// Returns candidate faces, highest confidence first. No faces is an
    /// empty vector, not an error.
    fn locate(
        &mut self,
        frame: &RgbImage,
        order: ChannelOrder,
    ) -> Result<Vec<FaceBox>, DetectionError>;
}

/// Rejects frames a detector cannot run on
pub fn check_frame(
    frame: &RgbImage,
    order: ChannelOrder,
    expected: ChannelOrder,
) -> Result<(), DetectionError> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(DetectionError::EmptyFrame {
            width: frame.width(),
            height: frame.height(),
        });
    }
    if order != expected {
        return Err(DetectionError::ChannelOrder {
            expected,
            actual: order,
        });
    }
    Ok(())
}

/// A detection before ranking
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub face: FaceBox,
    pub confidence: f32,
    /// Class name reported by the model, if it names its classes
    pub class: Option<String>,
}

impl Candidate {
    fn is_class(&self, face_class: &str) -> bool {
        self.class
            .as_deref()
            .is_none_or(|class| class.eq_ignore_ascii_case(face_class))
    }
}

/// Drops candidates of another class or below `min_confidence` and orders the
/// rest by confidence, keeping detector order between equal scores.
/// Unnamed candidates come from single-class models and are kept.
pub fn rank_candidates(
    mut candidates: Vec<Candidate>,
    min_confidence: f32,
    face_class: &str,
) -> Vec<FaceBox> {
    candidates.retain(|c| c.confidence >= min_confidence && c.is_class(face_class));
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates.into_iter().map(|c| c.face).collect()
}

/// Face locator backed by a YOLO face model
pub struct YoloFaceLocator {
    model: Runtime<YOLO>,
    min_confidence: f32,
    face_class: String,
}

impl YoloFaceLocator {
    pub fn new(config: Config, min_confidence: f32, face_class: impl Into<String>) -> Result<Self> {
        Ok(Self {
            model: YOLO::new(config)?,
            min_confidence,
            face_class: face_class.into(),
        })
    }
}

impl FaceLocator for YoloFaceLocator {
    fn locate(
        &mut self,
        frame: &RgbImage,
        order: ChannelOrder,
    ) -> Result<Vec<FaceBox>, DetectionError> {
        check_frame(frame, order, self.channel_order())?;

        let xs = vec![Image::from(frame.clone())];
        let ys = self
            .model
            .forward(&xs)
            .map_err(|e| DetectionError::Backend(e.to_string()))?;

        let candidates = ys
            .first()
            .map(|y| y.hbbs())
            .map(|hbbs| {
                hbbs.iter()
                    .map(|hbb| Candidate {
                        face: FaceBox::new(
                            hbb.xmin().round() as i32,
                            hbb.ymin().round() as i32,
                            hbb.width().round() as i32,
                            hbb.height().round() as i32,
                        ),
                        confidence: hbb.confidence().unwrap_or(0.0),
                        class: hbb.name().map(str::to_string),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(rank_candidates(candidates, self.min_confidence, &self.face_class))
    }
}
