// THEORY:
// The pipeline module is the top-level API for the brick engine. It owns the
// loaded texture and the stream state, and exposes the engine to a host
// scheduler as a small pull-driven state machine.
//
// The host drives it with four calls: `configure` (one-time setup, loads the
// texture), `submit_frame` (upstream delivery), `poll` (one activation tick)
// and `end_of_stream`. Every `poll` either fully processes one queued frame
// and emits it, asks the host for more input, or reports a terminal state.
// Nothing is carried across activations besides the queue itself, so the
// host may tear the pipeline down between any two calls.

use std::collections::VecDeque;
use std::path::PathBuf;

use tracing::{debug, error, info};

use crate::core_modules::brick;
use crate::error::{BrickError, Result};

// Re-export the data types a host needs to drive the pipeline.
pub use crate::core_modules::brick::{MAX_BRICK_SIZE, MIN_BRICK_SIZE};
pub use crate::core_modules::frame::{PixelFormat, Plane, VideoFrame};
pub use crate::core_modules::texture::{Texture, TextureError};

pub const DEFAULT_BRICK_SIZE: u32 = 16;

/// Configuration for a brick stream, fixed before the first frame.
#[derive(Debug, Clone)]
pub struct BrickConfig {
    /// Side length of the averaging/blend cells, in samples.
    pub brick_size: u32,
    /// Still-image file decoded into the tiling texture. Required.
    pub texture_path: PathBuf,
}

impl Default for BrickConfig {
    fn default() -> Self {
        Self {
            brick_size: DEFAULT_BRICK_SIZE,
            texture_path: PathBuf::new(),
        }
    }
}

impl BrickConfig {
    fn validate(&self) -> Result<()> {
        if !(MIN_BRICK_SIZE..=MAX_BRICK_SIZE).contains(&self.brick_size) {
            return Err(BrickError::Configuration(format!(
                "brick_size {} out of range {MIN_BRICK_SIZE}..={MAX_BRICK_SIZE}",
                self.brick_size
            )));
        }
        if self.texture_path.as_os_str().is_empty() {
            return Err(BrickError::Configuration(
                "texture_path is required".into(),
            ));
        }
        Ok(())
    }
}

/// Where the stream is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Configured but the texture has not been loaded yet.
    AwaitingTexture,
    /// Texture loaded; frames can be processed.
    Ready,
    /// Upstream end-of-stream has been forwarded; no further processing.
    Finished,
    /// A terminal error occurred.
    Failed,
}

/// The outcome of one activation tick.
#[derive(Debug)]
pub enum Activation {
    /// No input is queued; the host should request one frame upstream.
    RequestUpstream,
    /// One frame was processed and is handed downstream.
    FrameEmitted(VideoFrame),
    /// End-of-stream, forwarded downstream.
    StreamFinished,
    /// The stream failed. Reported once; later polls say `StreamFinished`.
    StreamFailed(BrickError),
}

/// A pull-driven brick-mosaic stream.
pub struct BrickPipeline {
    config: BrickConfig,
    texture: Option<Texture>,
    state: StreamState,
    input: VecDeque<VideoFrame>,
    eos: bool,
    failure: Option<BrickError>,
}

impl BrickPipeline {
    /// Validates the configuration and sets up an idle pipeline. No
    /// resources are acquired until `configure`.
    pub fn new(config: BrickConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            texture: None,
            state: StreamState::AwaitingTexture,
            input: VecDeque::new(),
            eos: false,
            failure: None,
        })
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// One-time stream setup: loads the brick texture synchronously. On
    /// failure the stream never starts and no frame is ever forwarded.
    /// Hosts that only ever call `poll` can skip this; the first poll in
    /// `AwaitingTexture` performs the same load.
    pub fn configure(&mut self) -> Result<()> {
        if self.state != StreamState::AwaitingTexture {
            return Err(BrickError::Configuration(
                "configure called on an already-configured stream".into(),
            ));
        }
        self.load_texture().map_err(|err| self.fail(err))
    }

    fn load_texture(&mut self) -> Result<()> {
        let texture = Texture::load(&self.config.texture_path)?;
        self.texture = Some(texture);
        self.state = StreamState::Ready;
        info!(brick_size = self.config.brick_size, "brick stream ready");
        Ok(())
    }

    /// Upstream frame delivery. Frames queue until the next `poll`; delivery
    /// before the texture is loaded is fatal to the stream and the frame is
    /// dropped. Frames delivered after the stream terminated are discarded.
    pub fn submit_frame(&mut self, frame: VideoFrame) -> Result<()> {
        match self.state {
            StreamState::Ready => {
                self.input.push_back(frame);
                Ok(())
            }
            StreamState::AwaitingTexture => Err(self.fail(BrickError::NotInitialized)),
            StreamState::Finished | StreamState::Failed => {
                debug!("frame delivered to a terminated stream, dropped");
                Ok(())
            }
        }
    }

    /// Upstream's permanent end-of-stream signal.
    pub fn end_of_stream(&mut self) {
        self.eos = true;
    }

    /// One activation tick. The first tick of an unconfigured stream loads
    /// the texture and, on success, immediately asks for upstream input.
    pub fn poll(&mut self) -> Activation {
        match self.state {
            StreamState::AwaitingTexture => match self.load_texture() {
                Ok(()) => Activation::RequestUpstream,
                Err(err) => self.fail_activation(err),
            },
            StreamState::Ready => {
                if let Some(mut frame) = self.input.pop_front() {
                    let Some(texture) = self.texture.as_ref() else {
                        return self.fail_activation(BrickError::NotInitialized);
                    };
                    match brick::apply(&mut frame, texture, self.config.brick_size) {
                        Ok(()) => Activation::FrameEmitted(frame),
                        Err(err) => self.fail_activation(err),
                    }
                } else if self.eos {
                    debug!("end of stream forwarded");
                    self.state = StreamState::Finished;
                    Activation::StreamFinished
                } else {
                    Activation::RequestUpstream
                }
            }
            StreamState::Finished => Activation::StreamFinished,
            StreamState::Failed => match self.failure.take() {
                Some(err) => Activation::StreamFailed(err),
                None => Activation::StreamFinished,
            },
        }
    }

    /// Releases the texture bitmap and any queued input. Safe to call at any
    /// point, including when loading never completed.
    pub fn shutdown(&mut self) {
        self.texture = None;
        self.input.clear();
        if self.state != StreamState::Failed {
            self.state = StreamState::Finished;
        }
        debug!("brick pipeline shut down");
    }

    /// Fails the stream and hands the error back to a `Result` surface; a
    /// copy is stored so the next `poll` reports the failure too.
    fn fail(&mut self, err: BrickError) -> BrickError {
        error!(%err, "brick stream failed");
        self.state = StreamState::Failed;
        self.failure = Some(err.clone());
        err
    }

    /// Fails the stream and reports the error through this activation. Not
    /// stored: the failure has been delivered, later polls say finished.
    fn fail_activation(&mut self, err: BrickError) -> Activation {
        error!(%err, "brick stream failed");
        self.state = StreamState::Failed;
        Activation::StreamFailed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageEncoder;
    use std::path::Path;

    fn write_texture_png(name: &str, width: u32, height: u32, value: u8) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let output = std::fs::File::create(&path).expect("Error creating fixture file.");
        let encoder = image::codecs::png::PngEncoder::new(output);
        encoder
            .write_image(
                &vec![value; (width * height) as usize],
                width,
                height,
                image::ExtendedColorType::L8,
            )
            .expect("Error encoding fixture PNG.");
        path
    }

    fn config(texture_path: impl AsRef<Path>) -> BrickConfig {
        BrickConfig {
            brick_size: 16,
            texture_path: texture_path.as_ref().to_path_buf(),
        }
    }

    fn uniform_frame(width: u32, height: u32, value: u8) -> VideoFrame {
        let mut frame = VideoFrame::new(width, height, PixelFormat::Yuv420p).unwrap();
        frame.planes[0].data.fill(value);
        frame
    }

    #[test]
    fn config_rejects_out_of_range_brick_size() {
        for brick_size in [0, 1, 129, u32::MAX] {
            let result = BrickPipeline::new(BrickConfig {
                brick_size,
                texture_path: "brick.png".into(),
            });
            assert!(matches!(result, Err(BrickError::Configuration(_))));
        }
    }

    #[test]
    fn config_requires_a_texture_path() {
        let result = BrickPipeline::new(BrickConfig::default());
        assert!(matches!(result, Err(BrickError::Configuration(_))));
    }

    #[test]
    fn default_config_uses_brick_size_16() {
        assert_eq!(BrickConfig::default().brick_size, DEFAULT_BRICK_SIZE);
    }

    #[test]
    fn first_poll_loads_the_texture_lazily() {
        let path = write_texture_png("brickify_pipe_lazy.png", 4, 4, 128);
        let mut pipeline = BrickPipeline::new(config(path)).unwrap();
        assert_eq!(pipeline.state(), StreamState::AwaitingTexture);

        // No configure call: the first activation performs the load and
        // asks for input.
        assert!(matches!(pipeline.poll(), Activation::RequestUpstream));
        assert_eq!(pipeline.state(), StreamState::Ready);
    }

    #[test]
    fn first_poll_reports_texture_load_failure() {
        let mut pipeline =
            BrickPipeline::new(config("/nonexistent/brickify-texture.png")).unwrap();
        assert!(matches!(
            pipeline.poll(),
            Activation::StreamFailed(BrickError::TextureLoad(_))
        ));
        assert!(matches!(pipeline.poll(), Activation::StreamFinished));
    }

    #[test]
    fn missing_texture_fails_setup_before_any_frame() {
        let mut pipeline =
            BrickPipeline::new(config("/nonexistent/brickify-texture.png")).unwrap();
        let result = pipeline.configure();
        assert!(matches!(
            result,
            Err(BrickError::TextureLoad(TextureError::NotFound { .. }))
        ));
        assert_eq!(pipeline.state(), StreamState::Failed);

        // The stored failure surfaces on the next poll, then the stream
        // reads as finished. No frame was ever emitted.
        assert!(matches!(pipeline.poll(), Activation::StreamFailed(_)));
        assert!(matches!(pipeline.poll(), Activation::StreamFinished));
    }

    #[test]
    fn frame_before_configure_is_fatal() {
        let path = write_texture_png("brickify_pipe_early.png", 4, 4, 128);
        let mut pipeline = BrickPipeline::new(config(path)).unwrap();
        let result = pipeline.submit_frame(uniform_frame(8, 8, 100));
        assert!(matches!(result, Err(BrickError::NotInitialized)));
        assert_eq!(pipeline.state(), StreamState::Failed);
    }

    #[test]
    fn stream_processes_and_forwards_frames_in_order() {
        let path = write_texture_png("brickify_pipe_flow.png", 8, 8, 200);
        let mut pipeline = BrickPipeline::new(config(path)).unwrap();
        pipeline.configure().unwrap();
        assert_eq!(pipeline.state(), StreamState::Ready);

        // No input queued yet: the stream pulls.
        assert!(matches!(pipeline.poll(), Activation::RequestUpstream));

        pipeline.submit_frame(uniform_frame(32, 32, 100)).unwrap();
        pipeline.submit_frame(uniform_frame(32, 32, 0)).unwrap();

        // One frame per activation, in delivery order.
        let Activation::FrameEmitted(first) = pipeline.poll() else {
            panic!("expected a frame");
        };
        assert_eq!(first.planes[0].data[0], 140); // round(100*0.6 + 200*0.4)
        let Activation::FrameEmitted(second) = pipeline.poll() else {
            panic!("expected a frame");
        };
        assert_eq!(second.planes[0].data[0], 80); // round(0*0.6 + 200*0.4)

        // Queue drained, no EOS yet: pull again.
        assert!(matches!(pipeline.poll(), Activation::RequestUpstream));

        pipeline.end_of_stream();
        assert!(matches!(pipeline.poll(), Activation::StreamFinished));
        assert_eq!(pipeline.state(), StreamState::Finished);
    }

    #[test]
    fn queued_frames_still_drain_after_eos_signal() {
        let path = write_texture_png("brickify_pipe_eos.png", 4, 4, 60);
        let mut pipeline = BrickPipeline::new(config(path)).unwrap();
        pipeline.configure().unwrap();

        pipeline.submit_frame(uniform_frame(16, 16, 120)).unwrap();
        pipeline.end_of_stream();

        assert!(matches!(pipeline.poll(), Activation::FrameEmitted(_)));
        assert!(matches!(pipeline.poll(), Activation::StreamFinished));
    }

    #[test]
    fn malformed_frame_is_fatal_mid_stream() {
        let path = write_texture_png("brickify_pipe_badframe.png", 4, 4, 60);
        let mut pipeline = BrickPipeline::new(config(path)).unwrap();
        pipeline.configure().unwrap();

        let mut frame = uniform_frame(16, 16, 120);
        frame.planes[0].data.truncate(4); // break the geometry invariant
        pipeline.submit_frame(frame).unwrap();

        assert!(matches!(
            pipeline.poll(),
            Activation::StreamFailed(BrickError::InvalidFrame(_))
        ));
        assert_eq!(pipeline.state(), StreamState::Failed);

        // Fatal means fatal: later deliveries are discarded, not processed.
        pipeline.submit_frame(uniform_frame(16, 16, 120)).unwrap();
        assert!(matches!(pipeline.poll(), Activation::StreamFinished));
    }

    #[test]
    fn shutdown_is_safe_before_and_after_setup() {
        let mut pipeline =
            BrickPipeline::new(config("/nonexistent/brickify-texture.png")).unwrap();
        pipeline.shutdown();
        assert_eq!(pipeline.state(), StreamState::Finished);

        let path = write_texture_png("brickify_pipe_shutdown.png", 4, 4, 60);
        let mut pipeline = BrickPipeline::new(config(path)).unwrap();
        pipeline.configure().unwrap();
        pipeline.submit_frame(uniform_frame(16, 16, 120)).unwrap();
        pipeline.shutdown();
        assert!(matches!(pipeline.poll(), Activation::StreamFinished));
    }

    #[test]
    fn configure_twice_is_an_error() {
        let path = write_texture_png("brickify_pipe_reconf.png", 4, 4, 60);
        let mut pipeline = BrickPipeline::new(config(path)).unwrap();
        pipeline.configure().unwrap();
        assert!(matches!(
            pipeline.configure(),
            Err(BrickError::Configuration(_))
        ));
    }
}
