use anyhow::Result;
use facesift::batch::BatchDriver;
use facesift::config::{self, BatchConfig};
use facesift::detector::YoloFaceLocator;
use facesift::extractor::FaceExtractor;
use facesift::video::FfmpegBackend;
use facesift::{cli, init_logging};
use log::info;

fn main() -> Result<()> {
    let args: cli::Args = argh::from_env();
    init_logging();

    let output_root = config::create_output_dir(&args.output)?;
    let batch_config = BatchConfig::from_args(&args, &output_root)?;
    info!("Writing face crops under {}", output_root.display());

    let backend = FfmpegBackend::new(&args.ffmpeg, &args.ffprobe);
    backend.check_installed()?;

    let model_config = config::build_model_config(&args)?.commit()?;
    let locator = YoloFaceLocator::new(model_config, args.confidence, &args.face_class)?;

    let extractor = FaceExtractor::new(backend, locator, batch_config.settings.clone());
    let mut driver = BatchDriver::new(extractor, batch_config).with_progress(!args.no_progress);

    println!("--- Starting Preprocessing ---");
    let summary = driver.run()?;
    println!("\n{}", summary.report());

    Ok(())
}
