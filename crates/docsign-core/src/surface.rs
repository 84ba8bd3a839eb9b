//! RGBA raster the signature pad draws into

use crate::coords::Point;

pub type Rgba = [u8; 4];

#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Surface {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        let mut surface = Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        };
        surface.fill(fill);
        surface
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major RGBA bytes
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn fill(&mut self, color: Rgba) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Source-over blend of `color` at `coverage` (0..=1).
    fn blend(&mut self, x: i64, y: i64, color: Rgba, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let alpha = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let dst_alpha = self.pixels[i + 3] as f32 / 255.0;
        let out_alpha = alpha + dst_alpha * (1.0 - alpha);
        for c in 0..3 {
            let src = color[c] as f32;
            let dst = self.pixels[i + c] as f32;
            let value = if out_alpha > 0.0 {
                (src * alpha + dst * dst_alpha * (1.0 - alpha)) / out_alpha
            } else {
                0.0
            };
            self.pixels[i + c] = value.round().clamp(0.0, 255.0) as u8;
        }
        self.pixels[i + 3] = (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    /// Filled disc with a one-pixel soft edge.
    pub fn stamp_disc(&mut self, center: Point, radius: f32, color: Rgba) {
        let r = radius.max(0.5);
        let x0 = (center.x - r - 1.0).floor() as i64;
        let x1 = (center.x + r + 1.0).ceil() as i64;
        let y0 = (center.y - r - 1.0).floor() as i64;
        let y1 = (center.y + r + 1.0).ceil() as i64;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let d = Point::new(x as f32 + 0.5, y as f32 + 0.5).distance(&center);
                let coverage = r + 0.5 - d;
                if coverage > 0.0 {
                    self.blend(x, y, color, coverage.min(1.0));
                }
            }
        }
    }

    /// Thick segment with round caps, built from overlapping discs.
    pub fn draw_segment(&mut self, from: Point, to: Point, width: f32, color: Rgba) {
        let radius = width / 2.0;
        let length = from.distance(&to);
        let step = (radius * 0.5).max(0.5);
        let steps = (length / step).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let p = Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t);
            self.stamp_disc(p, radius, color);
        }
    }

    pub fn hline(&mut self, y: u32, x0: u32, x1: u32, color: Rgba) {
        for x in x0..x1.min(self.width) {
            self.blend(x as i64, y as i64, color, 1.0);
        }
    }

    /// PNG encoding of the raster.
    pub fn encode_png(&self) -> Result<Vec<u8>, png::EncodingError> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(out)
    }
}
