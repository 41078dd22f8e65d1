pub mod brick;
pub mod frame;
pub mod texture;
