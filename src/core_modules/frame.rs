// Raw frame container for the brick engine. Frames are produced by the
// upstream collaborator (decoder, capture source, test fixture), moved
// through the pipeline by value, and handed back mutated. Only plane 0 is
// ever read or written by the engine; every other plane rides along.

use crate::error::{BrickError, Result};

/// Pixel layouts the brick engine accepts. In all three, plane 0 carries an
/// 8-bit intensity-like channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 8-bit RGBA, one plane, 4 bytes per pixel.
    Rgba,
    /// Packed 8-bit RGB, one plane, 3 bytes per pixel.
    Rgb24,
    /// Planar YUV 4:2:0: a full-resolution luma plane and two
    /// half-resolution chroma planes.
    Yuv420p,
}

impl PixelFormat {
    pub fn plane_count(&self) -> usize {
        match self {
            PixelFormat::Rgba | PixelFormat::Rgb24 => 1,
            PixelFormat::Yuv420p => 3,
        }
    }
}

/// One plane of a frame: a byte buffer and its stride (bytes per row). The
/// stride may exceed the row payload when the producer pads rows.
#[derive(Debug, Clone)]
pub struct Plane {
    pub data: Vec<u8>,
    pub stride: usize,
}

/// A raw video frame or still image. Dimensions are fixed for the lifetime
/// of the frame.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub planes: Vec<Plane>,
}

impl VideoFrame {
    /// Allocates a zeroed frame with tightly packed planes.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BrickError::InvalidFrame(format!(
                "frame dimensions must be positive, got {width}x{height}"
            )));
        }
        let w = width as usize;
        let h = height as usize;
        let planes = match format {
            PixelFormat::Rgba => vec![Plane {
                data: vec![0; w * 4 * h],
                stride: w * 4,
            }],
            PixelFormat::Rgb24 => vec![Plane {
                data: vec![0; w * 3 * h],
                stride: w * 3,
            }],
            PixelFormat::Yuv420p => {
                let cw = w.div_ceil(2);
                let ch = h.div_ceil(2);
                let chroma = || Plane {
                    data: vec![0; cw * ch],
                    stride: cw,
                };
                vec![
                    Plane {
                        data: vec![0; w * h],
                        stride: w,
                    },
                    chroma(),
                    chroma(),
                ]
            }
        };
        Ok(Self {
            width,
            height,
            format,
            planes,
        })
    }

    /// Wraps caller-provided planes, checking the geometry the engine relies
    /// on: the right plane count, and a plane 0 large enough to address
    /// `height` rows of at least `width` samples each.
    pub fn from_planes(
        width: u32,
        height: u32,
        format: PixelFormat,
        planes: Vec<Plane>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BrickError::InvalidFrame(format!(
                "frame dimensions must be positive, got {width}x{height}"
            )));
        }
        if planes.len() != format.plane_count() {
            return Err(BrickError::InvalidFrame(format!(
                "{:?} frame needs {} planes, got {}",
                format,
                format.plane_count(),
                planes.len()
            )));
        }
        let frame = Self {
            width,
            height,
            format,
            planes,
        };
        frame.check_plane0_geometry()?;
        Ok(frame)
    }

    /// The invariant plane 0 must satisfy before the engine touches it:
    /// stride >= width, and enough bytes for the last addressed row.
    pub(crate) fn check_plane0_geometry(&self) -> Result<()> {
        let w = self.width as usize;
        let h = self.height as usize;
        if w == 0 || h == 0 {
            return Err(BrickError::InvalidFrame(format!(
                "frame dimensions must be positive, got {w}x{h}"
            )));
        }
        let plane = self
            .planes
            .first()
            .ok_or_else(|| BrickError::InvalidFrame("frame has no planes".into()))?;
        if plane.stride < w {
            return Err(BrickError::InvalidFrame(format!(
                "plane 0 stride {} is smaller than frame width {w}",
                plane.stride
            )));
        }
        let needed = plane.stride * (h - 1) + w;
        if plane.data.len() < needed {
            return Err(BrickError::InvalidFrame(format!(
                "plane 0 holds {} bytes, {needed} needed for {w}x{h} at stride {}",
                plane.data.len(),
                plane.stride
            )));
        }
        Ok(())
    }
}
