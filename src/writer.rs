use crate::config::CropSize;
use crate::crop::CropArea;
use image::imageops::{self, FilterType};
use image::{ImageFormat, ImageResult, RgbImage};
use std::path::Path;

/// Cuts `area` out of `frame` and scales it to exactly `size`, ignoring the
/// aspect ratio of the detected box
pub fn create_face_crop(frame: &RgbImage, area: &CropArea, size: CropSize) -> RgbImage {
    let cropped = imageops::crop_imm(frame, area.x, area.y, area.width, area.height).to_image();
    if cropped.dimensions() == (size.width, size.height) {
        return cropped;
    }
    imageops::resize(&cropped, size.width, size.height, FilterType::Lanczos3)
}

/// Writes a face crop as a JPEG, whatever the extension of `path`
pub fn save_face_crop(face: &RgbImage, path: &Path) -> ImageResult<()> {
    face.save_with_format(path, ImageFormat::Jpeg)
}

/// Base name of a video up to its first dot, e.g. `clip.part1.mp4` -> `clip`
pub fn video_stem(video: &Path) -> String {
    let name = video
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    name.split('.').next().unwrap_or_default().to_string()
}

/// File name for the crop taken from `frame_index` of a video
pub fn crop_file_name(video_stem: &str, frame_index: u64) -> String {
    format!("{}_frame{}.jpg", video_stem, frame_index)
}
