use thiserror::Error;

/// A face bounding box as reported by the detector, in source-frame pixels.
///
/// Detectors may report a box that starts slightly outside the frame, so
/// `x` and `y` can be negative until the box is [`normalized`](FaceBox::normalized).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Folds negative offsets back into the frame by taking their absolute value.
    pub fn normalized(self) -> Self {
        Self {
            x: self.x.saturating_abs(),
            y: self.y.saturating_abs(),
            ..self
        }
    }
}

/// The pixel region of a frame that becomes a face crop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropArea {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropArea {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CropError {
    #[error("face box {0:?} has no area")]
    Degenerate(FaceBox),
    #[error("face box {face:?} lies outside the {frame_width}x{frame_height} frame")]
    OutsideFrame {
        face: FaceBox,
        frame_width: u32,
        frame_height: u32,
    },
}

// Far edges are clipped to the frame; the near edges were already made
// non-negative by `FaceBox::normalized`.
fn clip_span(start: i32, length: i32, limit: u32) -> Option<(u32, u32)> {
    let start = i64::from(start);
    let end = (start + i64::from(length)).min(i64::from(limit));
    if start >= end {
        None
    } else {
        Some((start as u32, (end - start) as u32))
    }
}

/// Calculates the region of a `frame_width` x `frame_height` frame covered by `face`.
///
/// The box is normalized first, so a negative origin never reaches the
/// frame. A box that extends past the right or bottom edge is clipped
/// rather than rejected.
///
/// # Returns
/// The clipped crop area, or an error when nothing of the box remains inside the frame
pub fn calculate_crop_area(
    face: FaceBox,
    frame_width: u32,
    frame_height: u32,
) -> Result<CropArea, CropError> {
    let face = face.normalized();
    if face.width <= 0 || face.height <= 0 {
        return Err(CropError::Degenerate(face));
    }

    let outside = || CropError::OutsideFrame {
        face,
        frame_width,
        frame_height,
    };
    let (x, width) = clip_span(face.x, face.width, frame_width).ok_or_else(outside)?;
    let (y, height) = clip_span(face.y, face.height, frame_height).ok_or_else(outside)?;

    Ok(CropArea::new(x, y, width, height))
}
