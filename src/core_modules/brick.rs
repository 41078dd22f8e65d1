// THEORY:
// The brick module is the core of the engine: it rewrites one frame so the
// image reads as a mosaic of uniform square cells ("bricks").
//
// Key architectural principles:
// 1.  **Spatial Pooling**: plane 0 is partitioned into a grid of
//     brick-sized cells. Each cell is flattened to a single averaged tone,
//     so a cell is the unit of work, not a pixel.
// 2.  **Clipped Boundary Cells**: when the frame dimensions are not an
//     exact multiple of the brick size, the last row/column of cells is
//     clipped to the frame. A cell is only visited when it contains at
//     least one in-bounds sample, so the per-cell sample count is never
//     zero.
// 3.  **Tiled Texture Sampling**: each cell-local coordinate is scaled into
//     texture space and wrapped modulo the texture dimensions. The texture
//     tiles seamlessly across every cell regardless of the relative sizes
//     of brick and texture.
// 4.  **Plane-0 Scope**: only plane 0 is read or written. Chroma planes of
//     planar formats, and the trailing bytes of packed rows, pass through
//     untouched. On packed color formats this alters a channel subset; that
//     is the engine's documented scope, not incidental.

use crate::core_modules::frame::VideoFrame;
use crate::core_modules::texture::Texture;
use crate::error::{BrickError, Result};

/// Smallest usable cell side. A 1-sample cell would make the average a
/// no-op.
pub const MIN_BRICK_SIZE: u32 = 2;
/// Largest accepted cell side.
pub const MAX_BRICK_SIZE: u32 = 128;

/// Weight of the cell average in the output blend; the texture sample
/// contributes the remainder.
const AVERAGE_WEIGHT: f32 = 0.6;
const TEXTURE_WEIGHT: f32 = 0.4;

/// Applies the brick effect to `frame`'s plane 0 in place.
///
/// Cells are scanned left-to-right, top-to-bottom. Each cell is averaged
/// over its in-bounds samples (integer truncation), then every sample is
/// overwritten with the average blended against a tiled texture sample.
/// Deterministic: identical inputs yield byte-identical output.
pub fn apply(frame: &mut VideoFrame, texture: &Texture, brick_size: u32) -> Result<()> {
    if !(MIN_BRICK_SIZE..=MAX_BRICK_SIZE).contains(&brick_size) {
        return Err(BrickError::Configuration(format!(
            "brick_size {brick_size} out of range {MIN_BRICK_SIZE}..={MAX_BRICK_SIZE}"
        )));
    }
    frame.check_plane0_geometry()?;

    let width = frame.width as usize;
    let height = frame.height as usize;
    let brick = brick_size as usize;
    let tex_width = texture.width() as usize;
    let tex_height = texture.height() as usize;

    let plane = &mut frame.planes[0];
    let stride = plane.stride;
    let data = &mut plane.data;

    let cells_x = width.div_ceil(brick);
    let cells_y = height.div_ceil(brick);

    for cell_index in 0..cells_x * cells_y {
        let cell_x = cell_index % cells_x;
        let cell_y = cell_index / cells_x;
        let x0 = cell_x * brick;
        let y0 = cell_y * brick;
        let x1 = (x0 + brick).min(width);
        let y1 = (y0 + brick).min(height);

        // Averaging pass over the in-bounds region of the cell.
        let mut sum: u64 = 0;
        let mut count: u64 = 0;
        for y in y0..y1 {
            let row = y * stride;
            for x in x0..x1 {
                sum += u64::from(data[row + x]);
                count += 1;
            }
        }
        // count >= 1: the grid only contains cells that overlap the frame.
        let average = (sum / count) as u8;

        // Blend pass: tile the texture across the cell and mix.
        for y in y0..y1 {
            let row = y * stride;
            let tex_y = texture_coord(y - y0, tex_height, brick);
            for x in x0..x1 {
                let tex_x = texture_coord(x - x0, tex_width, brick);
                let sample = texture.sample(tex_x as u32, tex_y as u32);
                data[row + x] = blend(average, sample);
            }
        }
    }
    Ok(())
}

/// Maps a cell-local offset into texture space: linear scale into the
/// texture's extent, then wraparound so the result is in bounds for any
/// brick/texture size combination.
fn texture_coord(local: usize, tex_dim: usize, brick: usize) -> usize {
    (local * tex_dim / brick) % tex_dim
}

fn blend(average: u8, sample: u8) -> u8 {
    (f32::from(average) * AVERAGE_WEIGHT + f32::from(sample) * TEXTURE_WEIGHT)
        .round()
        .clamp(0.0, 255.0) as u8
}
