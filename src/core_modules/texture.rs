// Brick texture loading. The texture is decoded once at stream setup from an
// external still-image file and kept as a private single-plane bitmap, so it
// outlives every decoder resource and stays immutable for the stream's life.

use std::io;
use std::path::{Path, PathBuf};

use image::ImageError;
use thiserror::Error;
use tracing::debug;

/// Failures while turning the texture file into a bitmap. All terminal for
/// the load call; the stream never starts without a texture.
#[derive(Error, Debug, Clone)]
pub enum TextureError {
    #[error("texture file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("texture file could not be read: {path}: {detail}")]
    Unreadable { path: PathBuf, detail: String },

    #[error("no decoder for texture file: {path}: {detail}")]
    UnsupportedFormat { path: PathBuf, detail: String },

    #[error("no frame could be decoded from texture file: {path}: {detail}")]
    DecodeFailed { path: PathBuf, detail: String },
}

/// The reference bitmap tiled across every brick cell: one 8-bit intensity
/// plane plus its dimensions and stride. Immutable after a successful load.
#[derive(Clone)]
pub struct Texture {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl Texture {
    /// Decodes the first frame of the image at `path` and copies its
    /// intensity plane into a standalone bitmap. Decoder state is dropped
    /// before returning, on every path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|err| match err {
            ImageError::IoError(source) if source.kind() == io::ErrorKind::NotFound => {
                TextureError::NotFound {
                    path: path.to_path_buf(),
                }
            }
            ImageError::IoError(source) => TextureError::Unreadable {
                path: path.to_path_buf(),
                detail: source.to_string(),
            },
            ImageError::Unsupported(source) => TextureError::UnsupportedFormat {
                path: path.to_path_buf(),
                detail: source.to_string(),
            },
            other => TextureError::DecodeFailed {
                path: path.to_path_buf(),
                detail: other.to_string(),
            },
        })?;

        let luma = decoded.into_luma8();
        let (width, height) = luma.dimensions();
        if width == 0 || height == 0 {
            return Err(TextureError::DecodeFailed {
                path: path.to_path_buf(),
                detail: "decoded image has no pixels".into(),
            });
        }
        debug!(width, height, path = %path.display(), "brick texture loaded");
        Ok(Self {
            width,
            height,
            stride: width as usize,
            data: luma.into_raw(),
        })
    }

    /// Builds a texture from raw intensity samples. Used by tests and by
    /// hosts that already hold a decoded bitmap.
    pub fn from_intensity(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || data.len() < (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            stride: width as usize,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Intensity sample at (x, y). Callers keep coordinates in bounds; the
    /// brick engine guarantees this by wrapping modulo the texture size.
    pub fn sample(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.stride + x as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageEncoder;

    fn write_png(name: &str, width: u32, height: u32, luma: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let output = std::fs::File::create(&path).expect("Error creating fixture file.");
        let encoder = image::codecs::png::PngEncoder::new(output);
        encoder
            .write_image(luma, width, height, image::ExtendedColorType::L8)
            .expect("Error encoding fixture PNG.");
        path
    }

    #[test]
    fn load_missing_file_reports_not_found() {
        let result = Texture::load("/nonexistent/brick-texture-fixture.png");
        assert!(matches!(result, Err(TextureError::NotFound { .. })));
    }

    #[test]
    fn load_undecodable_file_fails() {
        let path = std::env::temp_dir().join("brickify_not_an_image.png");
        std::fs::write(&path, b"this is not image data").unwrap();
        let result = Texture::load(&path);
        assert!(result.is_err());
    }

    #[test]
    fn load_round_trips_intensity_samples() {
        let samples: Vec<u8> = (0..8u8).map(|v| v * 30).collect();
        let path = write_png("brickify_gradient_texture.png", 4, 2, &samples);

        let texture = Texture::load(&path).expect("Error loading fixture texture.");
        assert_eq!(texture.width(), 4);
        assert_eq!(texture.height(), 2);
        for y in 0..2 {
            for x in 0..4 {
                assert_eq!(texture.sample(x, y), samples[(y * 4 + x) as usize]);
            }
        }
    }

    #[test]
    fn from_intensity_rejects_empty_or_short_buffers() {
        assert!(Texture::from_intensity(0, 4, vec![0; 16]).is_none());
        assert!(Texture::from_intensity(4, 4, vec![0; 15]).is_none());
        assert!(Texture::from_intensity(4, 4, vec![0; 16]).is_some());
    }
}
