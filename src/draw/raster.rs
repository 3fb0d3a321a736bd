#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
        a: 255,
    };

    pub const BLACK: Self = Self {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// Fixed-size pixel buffer backing the drawing surface. This is the only
/// durable representation of drawn content; strokes are rasterized into it
/// immediately and not retained as vector geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RgbaBuffer {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        let mut buffer = Self {
            width,
            height,
            pixels: vec![0u8; (width as usize) * (height as usize) * 4],
        };
        buffer.fill(fill);
        buffer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn fill(&mut self, color: Rgba) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk[0] = color.r;
            chunk[1] = color.g;
            chunk[2] = color.b;
            chunk[3] = color.a;
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let idx = ((y * self.width + x) * 4) as usize;
        Rgba {
            r: self.pixels[idx],
            g: self.pixels[idx + 1],
            b: self.pixels[idx + 2],
            a: self.pixels[idx + 3],
        }
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = ((y * self.width + x) * 4) as usize;
        self.pixels[idx] = color.r;
        self.pixels[idx + 1] = color.g;
        self.pixels[idx + 2] = color.b;
        self.pixels[idx + 3] = color.a;
    }

    /// Paint a line segment with a round brush of the given width. Every
    /// pixel whose center lies within `width / 2` of the segment is set to
    /// `color`. Purely a function of its inputs, so repeated calls with the
    /// same arguments produce identical rasters.
    pub fn stamp_segment(&mut self, from: (f32, f32), to: (f32, f32), width: u32, color: Rgba) {
        let radius = (width.max(1) as f32) / 2.0;

        let min_x = (from.0.min(to.0) - radius).floor().max(0.0) as u32;
        let max_x = (from.0.max(to.0) + radius)
            .ceil()
            .min(self.width.saturating_sub(1) as f32) as u32;
        let min_y = (from.1.min(to.1) - radius).floor().max(0.0) as u32;
        let max_y = (from.1.max(to.1) + radius)
            .ceil()
            .min(self.height.saturating_sub(1) as f32) as u32;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let center = (x as f32 + 0.5, y as f32 + 0.5);
                if distance_to_segment(center, from, to) <= radius {
                    self.set_pixel(x, y, color);
                }
            }
        }
    }
}

fn distance_to_segment(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ap = (p.0 - a.0, p.1 - a.1);
    let len_sq = ab.0 * ab.0 + ab.1 * ab.1;
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        ((ap.0 * ab.0 + ap.1 * ab.1) / len_sq).clamp(0.0, 1.0)
    };
    let closest = (a.0 + ab.0 * t, a.1 + ab.1 * t);
    let d = (p.0 - closest.0, p.1 - closest.1);
    (d.0 * d.0 + d.1 * d.1).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_uniformly_filled() {
        let buffer = RgbaBuffer::new(4, 3, Rgba::rgb(10, 20, 30));
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(buffer.pixel(x, y), Rgba::rgb(10, 20, 30));
            }
        }
    }

    #[test]
    fn stamp_segment_marks_pixels_along_the_line() {
        let mut buffer = RgbaBuffer::new(16, 16, Rgba::WHITE);
        buffer.stamp_segment((2.0, 8.0), (13.0, 8.0), 2, Rgba::BLACK);
        for x in 3..=12 {
            assert_eq!(buffer.pixel(x, 8), Rgba::BLACK, "x = {x}");
        }
        assert_eq!(buffer.pixel(8, 1), Rgba::WHITE);
    }

    #[test]
    fn stamp_segment_ignores_out_of_bounds_pixels() {
        let mut buffer = RgbaBuffer::new(8, 8, Rgba::WHITE);
        buffer.stamp_segment((-5.0, -5.0), (20.0, 20.0), 4, Rgba::BLACK);
        // Diagonal crosses the buffer; corners away from it stay untouched.
        assert_eq!(buffer.pixel(0, 7), Rgba::WHITE);
        assert_eq!(buffer.pixel(7, 0), Rgba::WHITE);
        assert_eq!(buffer.pixel(4, 4), Rgba::BLACK);
    }

    #[test]
    fn zero_length_segment_stamps_a_dot() {
        let mut buffer = RgbaBuffer::new(8, 8, Rgba::WHITE);
        buffer.stamp_segment((4.0, 4.0), (4.0, 4.0), 3, Rgba::BLACK);
        assert_eq!(buffer.pixel(4, 4), Rgba::BLACK);
    }
}
