pub mod export;
pub mod raster;
pub mod surface;

pub use raster::{Rgba, RgbaBuffer};
pub use surface::{display_to_raster, Brush, DrawSurface};
