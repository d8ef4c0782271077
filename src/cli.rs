use argh::FromArgs;

/// Extract face crops from labeled real/fake video folders
#[derive(FromArgs, Debug)]
pub struct Args {
    /// dataset root holding the default FaceForensics++ folder layout
    #[argh(option, default = "String::from(\"./videos\")")]
    pub video_root: String,

    /// folder of real videos; repeatable, replaces the default layout
    #[argh(option)]
    pub real: Vec<String>,

    /// folder of fake videos; repeatable, replaces the default layout
    #[argh(option)]
    pub fake: Vec<String>,

    /// output root for the real/ and fake/ crop folders (default: ./runs/<timestamp>)
    #[argh(option, default = "String::new()")]
    pub output: String,

    /// sample one frame out of every N
    #[argh(option, default = "30")]
    pub frame_rate: u64,

    /// side length in pixels of the saved square crops
    #[argh(option, default = "224")]
    pub crop_size: u32,

    /// video file extension to pick up
    #[argh(option, default = "String::from(\"mp4\")")]
    pub extension: String,

    /// face detection model file
    #[argh(option)]
    pub model: String,

    /// class name of face detections; boxes of other named classes are ignored
    #[argh(option, default = "String::from(\"face\")")]
    pub face_class: String,

    /// model task
    #[argh(option, default = "String::from(\"det\")")]
    pub task: String,

    /// model dtype
    #[argh(option, default = "String::from(\"auto\")")]
    pub dtype: String,

    /// version
    #[argh(option, default = "8.0")]
    pub ver: f32,

    /// device: cuda, cpu, mps
    #[argh(option, default = "String::from(\"cpu:0\")")]
    pub device: String,

    /// scale: n, s, m, l
    #[argh(option, default = "String::from(\"n\")")]
    pub scale: String,

    /// minimum confidence for a detection to count as a face
    #[argh(option, default = "0.5")]
    pub confidence: f32,

    /// ffmpeg binary used for decoding
    #[argh(option, default = "String::from(\"ffmpeg\")")]
    pub ffmpeg: String,

    /// ffprobe binary used for probing
    #[argh(option, default = "String::from(\"ffprobe\")")]
    pub ffprobe: String,

    /// disable progress bars
    #[argh(switch)]
    pub no_progress: bool,
}
