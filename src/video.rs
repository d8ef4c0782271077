use anyhow::{Context, Result};
use image::RgbImage;
use log::debug;
use std::borrow::Cow;
use std::ffi::OsString;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use thiserror::Error;

/// Byte order of the three channels in a decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    fn ffmpeg_pix_fmt(self) -> &'static str {
        match self {
            ChannelOrder::Rgb => "rgb24",
            ChannelOrder::Bgr => "bgr24",
        }
    }
}

/// Returns `image` laid out in `to` order, borrowing it when no conversion is needed
pub fn reorder_channels(
    image: &RgbImage,
    from: ChannelOrder,
    to: ChannelOrder,
) -> Cow<'_, RgbImage> {
    if from == to {
        return Cow::Borrowed(image);
    }
    let mut swapped = image.clone();
    for pixel in swapped.pixels_mut() {
        pixel.0.swap(0, 2);
    }
    Cow::Owned(swapped)
}

/// Reasons a video cannot be opened for decoding
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("video file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },
    #[error("could not read the video stream of {}: {detail}", .path.display())]
    Stream { path: PathBuf, detail: String },
    #[error("no frame of {} could be decoded", .0.display())]
    NoFrames(PathBuf),
}

/// Result of reading one position of a video stream
#[derive(Debug, Clone)]
pub enum FrameRead {
    Frame(RgbImage),
    /// The position could not be decoded but the stream can continue
    Corrupt,
    End,
}

/// An open decode handle. Dropping it releases the underlying resources.
pub trait VideoReader {
    fn read_frame(&mut self) -> FrameRead;

    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Rgb
    }
}

/// Opens videos by path
pub trait VideoBackend {
    type Reader: VideoReader;

    fn open(&self, path: &Path) -> Result<Self::Reader, VideoError>;
}

/// One decoded frame and its position in the stream
#[derive(Debug, Clone)]
pub struct FrameSample {
    pub index: u64,
    pub image: RgbImage,
    pub order: ChannelOrder,
}

impl FrameSample {
    pub fn is_sample_point(&self, frame_rate: u64) -> bool {
        self.index % frame_rate == 0
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}

/// Numbers the frames of a reader from zero. Corrupt positions consume an
/// index and are skipped.
pub struct FrameSampler<R> {
    reader: R,
    next_index: u64,
    finished: bool,
}

impl<R: VideoReader> FrameSampler<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            next_index: 0,
            finished: false,
        }
    }
}

impl<R: VideoReader> Iterator for FrameSampler<R> {
    type Item = FrameSample;

    fn next(&mut self) -> Option<FrameSample> {
        while !self.finished {
            let index = self.next_index;
            match self.reader.read_frame() {
                FrameRead::Frame(image) => {
                    self.next_index += 1;
                    return Some(FrameSample {
                        index,
                        image,
                        order: self.reader.channel_order(),
                    });
                }
                FrameRead::Corrupt => {
                    debug!("frame {} could not be decoded, skipping", index);
                    self.next_index += 1;
                }
                FrameRead::End => self.finished = true,
            }
        }
        None
    }
}

/// Decodes videos by streaming raw frames out of the `ffmpeg` CLI
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    order: ChannelOrder,
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegBackend {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            order: ChannelOrder::Rgb,
        }
    }

    /// Checks that both ffmpeg and ffprobe are installed and runnable
    pub fn check_installed(&self) -> Result<()> {
        for tool in [&self.ffmpeg, &self.ffprobe] {
            let status = Command::new(tool)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .with_context(|| {
                    format!("Failed to execute {}. Is ffmpeg installed?", tool.display())
                })?;

            if !status.success() {
                anyhow::bail!("{} is not properly installed", tool.display());
            }
        }
        Ok(())
    }

    fn stream_dimensions(&self, path: &Path) -> Result<(u32, u32), VideoError> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "stream=width,height",
                "-of", "csv=p=0:s=x",
            ])
            .arg(path)
            .output()
            .map_err(|source| VideoError::Spawn {
                tool: self.ffprobe.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(VideoError::Stream {
                path: path.to_path_buf(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_dimensions(&stdout).ok_or_else(|| VideoError::Stream {
            path: path.to_path_buf(),
            detail: "no video stream with usable dimensions".to_string(),
        })
    }

    /// ffmpeg arguments that stream `path` as raw frames of exactly
    /// `width` x `height`. Auto-rotation is off and the scale filter pins the
    /// output size, so every frame matches the dimensions ffprobe reported.
    fn decode_args(&self, path: &Path, width: u32, height: u32) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-noautorotate", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(path.as_os_str().to_os_string());
        let scale = format!("scale={}:{}", width, height);
        let pix_fmt = self.order.ffmpeg_pix_fmt();
        let output = ["-an", "-sn", "-vf", &scale, "-f", "rawvideo", "-pix_fmt", pix_fmt, "pipe:1"];
        args.extend(output.into_iter().map(OsString::from));
        args
    }
}

/// Parses ffprobe's `WIDTHxHEIGHT` output, rejecting zero-sized streams
fn parse_dimensions(ffprobe_output: &str) -> Option<(u32, u32)> {
    let line = ffprobe_output.lines().map(str::trim).find(|line| !line.is_empty())?;
    let (width, height) = line.trim_end_matches('x').split_once('x')?;
    let width: u32 = width.trim().parse().ok()?;
    let height: u32 = height.trim().parse().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

impl VideoBackend for FfmpegBackend {
    type Reader = FfmpegReader;

    fn open(&self, path: &Path) -> Result<FfmpegReader, VideoError> {
        if !path.is_file() {
            return Err(VideoError::NotFound(path.to_path_buf()));
        }
        let (width, height) = self.stream_dimensions(path)?;

        let mut child = Command::new(&self.ffmpeg)
            .args(self.decode_args(path, width, height))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| VideoError::Spawn {
                tool: self.ffmpeg.display().to_string(),
                source,
            })?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(VideoError::Stream {
                path: path.to_path_buf(),
                detail: "ffmpeg produced no output pipe".to_string(),
            });
        };

        debug!("decoding {} ({}x{})", path.display(), width, height);
        Ok(FfmpegReader {
            child,
            stdout: BufReader::new(stdout),
            width,
            height,
            order: self.order,
        })
    }
}

/// A running ffmpeg decode. The process is killed and reaped on drop.
pub struct FfmpegReader {
    child: Child,
    stdout: BufReader<ChildStdout>,
    width: u32,
    height: u32,
    order: ChannelOrder,
}

impl VideoReader for FfmpegReader {
    fn read_frame(&mut self) -> FrameRead {
        let frame_len = self.width as usize * self.height as usize * 3;
        let mut buffer = vec![0u8; frame_len];
        match self.stdout.read_exact(&mut buffer) {
            Ok(()) => match RgbImage::from_raw(self.width, self.height, buffer) {
                Some(image) => FrameRead::Frame(image),
                None => FrameRead::Corrupt,
            },
            // A trailing partial frame is dropped along with the rest of the stream
            Err(err) => {
                if err.kind() != io::ErrorKind::UnexpectedEof {
                    debug!("ffmpeg pipe closed: {}", err);
                }
                FrameRead::End
            }
        }
    }

    fn channel_order(&self) -> ChannelOrder {
        self.order
    }
}

impl Drop for FfmpegReader {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
