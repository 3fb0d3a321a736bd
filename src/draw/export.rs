use crate::draw::raster::RgbaBuffer;
use crate::draw::surface::encode_png;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

pub const EXPORT_SUBDIR: &str = "sketch_exports";

pub fn default_export_folder() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("resolve working directory")?;
    Ok(cwd.join(EXPORT_SUBDIR))
}

pub fn timestamped_stem(now: chrono::DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// Write the raster as a PNG file named after the current time, creating the
/// export folder if needed. Returns the path written.
pub fn export_raster(raster: &RgbaBuffer, folder: &Path) -> Result<PathBuf> {
    fs::create_dir_all(folder)
        .with_context(|| format!("create export folder {}", folder.display()))?;
    let path = folder.join(format!("{}_sketch.png", timestamped_stem(Local::now())));
    let png = encode_png(raster)?;
    fs::write(&path, png).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
