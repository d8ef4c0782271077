//! Scripted decode and detection backends for unit tests.

use crate::crop::FaceBox;
use crate::detector::{DetectionError, FaceLocator};
use crate::video::{ChannelOrder, FrameRead, VideoBackend, VideoError, VideoReader};
use image::RgbImage;
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::rc::Rc;

/// `count` frames whose first pixel carries the frame position in its red channel
pub fn marked_frames(count: usize, width: u32, height: u32) -> Vec<FrameRead> {
    (0..count)
        .map(|position| {
            let mut frame = RgbImage::from_pixel(width, height, image::Rgb([90, 120, 150]));
            frame.put_pixel(0, 0, image::Rgb([position as u8, 0, 0]));
            FrameRead::Frame(frame)
        })
        .collect()
}

/// Serves pre-recorded frames keyed by file name. Unknown files fail to open.
pub struct ScriptedBackend {
    videos: HashMap<String, Vec<FrameRead>>,
    order: ChannelOrder,
    open_readers: Rc<Cell<usize>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            videos: HashMap::new(),
            order: ChannelOrder::Rgb,
            open_readers: Rc::new(Cell::new(0)),
        }
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_video(mut self, file_name: &str, frames: Vec<FrameRead>) -> Self {
        self.videos.insert(file_name.to_string(), frames);
        self
    }

    pub fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.order = order;
        self
    }

    /// Number of readers currently alive
    pub fn open_readers(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.open_readers)
    }
}

pub struct ScriptedReader {
    frames: VecDeque<FrameRead>,
    order: ChannelOrder,
    open_readers: Rc<Cell<usize>>,
}

impl VideoReader for ScriptedReader {
    fn read_frame(&mut self) -> FrameRead {
        self.frames.pop_front().unwrap_or(FrameRead::End)
    }

    fn channel_order(&self) -> ChannelOrder {
        self.order
    }
}

impl Drop for ScriptedReader {
    fn drop(&mut self) {
        self.open_readers.set(self.open_readers.get() - 1);
    }
}

impl VideoBackend for ScriptedBackend {
    type Reader = ScriptedReader;

    fn open(&self, path: &Path) -> Result<ScriptedReader, VideoError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let frames = self
            .videos
            .get(&name)
            .ok_or_else(|| VideoError::NotFound(path.to_path_buf()))?;

        self.open_readers.set(self.open_readers.get() + 1);
        Ok(ScriptedReader {
            frames: frames.iter().cloned().collect(),
            order: self.order,
            open_readers: Rc::clone(&self.open_readers),
        })
    }
}

type Respond = Box<dyn FnMut(u8) -> Result<Vec<FaceBox>, DetectionError>>;

/// Answers detection requests from a closure over the frame marker and
/// records every marker it was asked about
pub struct ScriptedLocator {
    respond: Respond,
    pub calls: Vec<u8>,
}

impl ScriptedLocator {
    pub fn new(respond: impl FnMut(u8) -> Result<Vec<FaceBox>, DetectionError> + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Vec::new(),
        }
    }

    pub fn always(faces: Vec<FaceBox>) -> Self {
        Self::new(move |_| Ok(faces.clone()))
    }
}

impl FaceLocator for ScriptedLocator {
    fn locate(
        &mut self,
        frame: &RgbImage,
        order: ChannelOrder,
    ) -> Result<Vec<FaceBox>, DetectionError> {
        crate::detector::check_frame(frame, order, self.channel_order())?;
        let marker = frame.get_pixel(0, 0).0[0];
        self.calls.push(marker);
        (self.respond)(marker)
    }
}
