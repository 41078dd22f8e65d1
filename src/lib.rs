// THEORY:
// This file is the main entry point for the `brickify` library crate. The
// public API a host needs lives in `pipeline`: `BrickConfig` to describe a
// stream, `BrickPipeline` to run it, and `Activation` to react to each tick.
// The internal modules (`core_modules`) hold the frame and texture data
// types and the block-averaging/blend algorithm itself.

pub mod core_modules;
pub mod error;
pub mod pipeline;
