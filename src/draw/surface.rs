use crate::draw::raster::{Rgba, RgbaBuffer};
use anyhow::{Context, Result};
use base64::Engine;
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brush {
    pub color: Rgba,
    pub width: u32,
    pub eraser: bool,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            color: Rgba::BLACK,
            width: 4,
            eraser: false,
        }
    }
}

/// Raster drawing surface. Pointer input arrives as begin/extend/end calls;
/// each extend paints the segment from the previous anchor to the new point
/// and advances the anchor. Segments are consumed immediately by the raster
/// and never retained.
pub struct DrawSurface {
    raster: RgbaBuffer,
    background: Rgba,
    anchor: Option<(f32, f32)>,
    pub brush: Brush,
    dirty: bool,
}

impl DrawSurface {
    pub fn new(width: u32, height: u32, background: Rgba) -> Self {
        Self {
            raster: RgbaBuffer::new(width, height, background),
            background,
            anchor: None,
            brush: Brush::default(),
            dirty: true,
        }
    }

    pub fn raster(&self) -> &RgbaBuffer {
        &self.raster
    }

    pub fn background(&self) -> Rgba {
        self.background
    }

    pub fn stroke_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// Record the drag anchor. Does not touch the raster.
    pub fn begin_stroke(&mut self, point: (f32, f32)) {
        self.anchor = Some(point);
    }

    /// Paint the segment from the current anchor to `point` and advance the
    /// anchor. Ignored when no stroke is active (pointer moved without a
    /// preceding press); that is an expected event order, not an error.
    pub fn extend_stroke(&mut self, point: (f32, f32)) {
        let Some(anchor) = self.anchor else {
            return;
        };
        let color = if self.brush.eraser {
            self.background
        } else {
            self.brush.color
        };
        self.raster
            .stamp_segment(anchor, point, self.brush.width, color);
        self.anchor = Some(point);
        self.dirty = true;
    }

    /// Clear the drag anchor. Safe to call repeatedly.
    pub fn end_stroke(&mut self) {
        self.anchor = None;
    }

    /// Reset the whole raster to the background color.
    pub fn clear(&mut self) {
        self.raster.fill(self.background);
        self.anchor = None;
        self.dirty = true;
    }

    /// Encode the current raster as PNG. Reads a completed frame; the raster
    /// is only ever mutated between UI events on the same thread, so the
    /// snapshot can never observe a half-painted segment.
    pub fn snapshot_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.raster)
    }

    /// PNG snapshot as the base64 payload the analysis endpoints expect.
    pub fn snapshot_base64(&self) -> Result<String> {
        let png = self.snapshot_png()?;
        Ok(base64::engine::general_purpose::STANDARD.encode(png))
    }

    /// Replace the raster content with a previously saved PNG snapshot.
    /// Pixels outside the current raster bounds are dropped.
    pub fn restore_png(&mut self, png: &[u8]) -> Result<()> {
        let decoded = image::load_from_memory(png)
            .context("decode drawing snapshot")?
            .to_rgba8();
        self.raster.fill(self.background);
        let width = decoded.width().min(self.raster.width());
        let height = decoded.height().min(self.raster.height());
        for y in 0..height {
            for x in 0..width {
                let px = decoded.get_pixel(x, y);
                self.raster.set_pixel(
                    x,
                    y,
                    Rgba {
                        r: px[0],
                        g: px[1],
                        b: px[2],
                        a: px[3],
                    },
                );
            }
        }
        self.anchor = None;
        self.dirty = true;
        Ok(())
    }

    /// True once after any raster mutation; used to re-upload the display
    /// texture only when needed.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

pub fn encode_png(raster: &RgbaBuffer) -> Result<Vec<u8>> {
    let img = image::RgbaImage::from_raw(raster.width(), raster.height(), raster.pixels().to_vec())
        .context("raster buffer does not match its dimensions")?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png)
        .context("encode raster as PNG")?;
    Ok(out.into_inner())
}

/// Map a point in display space to raster space. The canvas widget may be
/// shown at a different size than the fixed raster resolution; without this
/// scaling, strokes drift away from the cursor.
pub fn display_to_raster(
    point: (f32, f32),
    display_size: (f32, f32),
    raster_size: (u32, u32),
) -> (f32, f32) {
    let sx = if display_size.0 > 0.0 {
        raster_size.0 as f32 / display_size.0
    } else {
        1.0
    };
    let sy = if display_size.1 > 0.0 {
        raster_size.1 as f32 / display_size.1
    } else {
        1.0
    };
    (point.0 * sx, point.1 * sy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_without_begin_is_ignored() {
        let mut surface = DrawSurface::new(8, 8, Rgba::WHITE);
        surface.extend_stroke((4.0, 4.0));
        assert_eq!(surface.raster().pixel(4, 4), Rgba::WHITE);
    }

    #[test]
    fn begin_does_not_paint() {
        let mut surface = DrawSurface::new(8, 8, Rgba::WHITE);
        surface.take_dirty();
        surface.begin_stroke((4.0, 4.0));
        assert!(!surface.take_dirty());
    }

    #[test]
    fn end_stroke_is_idempotent() {
        let mut surface = DrawSurface::new(8, 8, Rgba::WHITE);
        surface.begin_stroke((1.0, 1.0));
        surface.end_stroke();
        surface.end_stroke();
        assert!(!surface.stroke_active());
    }

    #[test]
    fn display_points_scale_per_axis() {
        let mapped = display_to_raster((100.0, 50.0), (200.0, 200.0), (800, 100));
        assert_eq!(mapped, (400.0, 25.0));
    }
}
