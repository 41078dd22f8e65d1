// Example runner for the `brickify` library: applies the brick-mosaic
// effect to a single still image. The image's luma becomes plane 0 of a
// 4:2:0 frame with neutral chroma, one full pipeline pass runs over it, and
// the bricked luma is written back out as a grayscale PNG.

use std::env;
use std::error::Error;

use image::ImageEncoder;

use brickify::pipeline::{
    Activation, BrickConfig, BrickPipeline, PixelFormat, Plane, VideoFrame,
};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt().init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        println!("Usage: brickify <input_image> <output_image> <texture_image> [brick_size]");
        return Ok(());
    }
    let input_path = &args[1];
    let output_path = &args[2];
    let brick_size = match args.get(4) {
        Some(raw) => raw.parse::<u32>()?,
        None => BrickConfig::default().brick_size,
    };

    // --- 2. Decode the input into a luma + neutral-chroma 4:2:0 frame ---
    let luma = image::open(input_path)?.into_luma8();
    let (width, height) = luma.dimensions();
    let cw = (width as usize).div_ceil(2);
    let ch = (height as usize).div_ceil(2);
    let chroma = || Plane {
        data: vec![128; cw * ch],
        stride: cw,
    };
    let frame = VideoFrame::from_planes(
        width,
        height,
        PixelFormat::Yuv420p,
        vec![
            Plane {
                data: luma.into_raw(),
                stride: width as usize,
            },
            chroma(),
            chroma(),
        ],
    )?;

    // --- 3. Pipeline Setup ---
    let config = BrickConfig {
        brick_size,
        texture_path: args[3].clone().into(),
    };
    let mut pipeline = BrickPipeline::new(config)?;
    pipeline.configure()?;
    pipeline.submit_frame(frame)?;

    // --- 4. Drive the stream to completion ---
    let mut bricked = None;
    loop {
        match pipeline.poll() {
            Activation::FrameEmitted(frame) => bricked = Some(frame),
            Activation::RequestUpstream => pipeline.end_of_stream(), // single image, no more input
            Activation::StreamFinished => break,
            Activation::StreamFailed(err) => return Err(err.into()),
        }
    }
    pipeline.shutdown();

    // --- 5. Encode plane 0 back out as a grayscale PNG ---
    let frame = bricked.ok_or("no frame came back from the pipeline")?;
    let plane = &frame.planes[0];
    let mut samples = Vec::with_capacity((width * height) as usize);
    for y in 0..height as usize {
        let row = y * plane.stride;
        samples.extend_from_slice(&plane.data[row..row + width as usize]);
    }
    let output = std::fs::File::create(output_path)?;
    let encoder = image::codecs::png::PngEncoder::new(output);
    encoder.write_image(&samples, width, height, image::ExtendedColorType::L8)?;

    println!("Wrote {output_path} ({width}x{height}, brick size {brick_size})");
    Ok(())
}
