/// Software rasterizer for paint commands, plus PNG encode/decode.

use std::path::Path;

use log::debug;

use super::font;
use super::layout::{Ellipse, Rect};
use super::paint::{PaintCommand, Rgba};
use crate::quiz::Animal;
use crate::{Error, Result};

/// Largest width or height accepted when decoding artwork
pub const MAX_IMAGE_DIMENSION: u32 = 8192;

// 2x2 supersampling pattern for anti-aliased shape edges
const SAMPLES: [(f32, f32); 4] = [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];

/// An owned RGBA8 pixel buffer (straight alpha, row-major)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    /// Fully transparent image
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Image filled with a single color
    pub fn filled(width: u32, height: u32, rgba: Rgba) -> Self {
        let mut img = Self::new(width, height);
        for px in img.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[rgba.0, rgba.1, rgba.2, rgba.3]);
        }
        img
    }

    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(Error::Image(format!(
                "Expected {} bytes for {}x{} RGBA, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        (self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3])
    }

    fn pixel_f(&self, x: u32, y: u32) -> [f32; 4] {
        let (r, g, b, a) = self.pixel(x, y);
        [r as f32, g as f32, b as f32, a as f32]
    }

    /// Bilinear sample at continuous source coordinates (pixel centers at .5).
    fn sample_bilinear(&self, u: f32, v: f32) -> [f32; 4] {
        let max_x = self.width.saturating_sub(1) as f32;
        let max_y = self.height.saturating_sub(1) as f32;
        let fx = (u - 0.5).clamp(0.0, max_x);
        let fy = (v - 0.5).clamp(0.0, max_y);
        let x0 = fx.floor() as u32;
        let y0 = fy.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let p00 = self.pixel_f(x0, y0);
        let p10 = self.pixel_f(x1, y0);
        let p01 = self.pixel_f(x0, y1);
        let p11 = self.pixel_f(x1, y1);

        // Interpolate premultiplied so transparent neighbours don't bleed color
        let mut out = [0.0f32; 4];
        let weights = [(1.0 - tx) * (1.0 - ty), tx * (1.0 - ty), (1.0 - tx) * ty, tx * ty];
        let mut alpha = 0.0;
        for (p, w) in [p00, p10, p01, p11].iter().zip(weights) {
            let a = p[3] / 255.0;
            out[0] += p[0] * a * w;
            out[1] += p[1] * a * w;
            out[2] += p[2] * a * w;
            alpha += a * w;
        }
        if alpha > 0.0 {
            out[0] /= alpha;
            out[1] /= alpha;
            out[2] /= alpha;
        }
        out[3] = alpha * 255.0;
        out
    }
}

/// A drawing surface that executes [`PaintCommand`]s.
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width
    }

    pub fn height(&self) -> u32 {
        self.image.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        self.image.pixel(x, y)
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn execute(&mut self, commands: &[PaintCommand]) {
        for cmd in commands {
            match cmd {
                PaintCommand::LinearGradient { start, end, from, to } => {
                    self.fill_linear_gradient(*start, *end, *from, *to)
                }
                PaintCommand::RoundedRect { rect, radius, rgba } => self.fill_rounded_rect(*rect, *radius, *rgba),
                PaintCommand::Ellipse { shape, rgba } => self.fill_ellipse(*shape, *rgba),
                PaintCommand::Text {
                    x,
                    y,
                    text,
                    scale,
                    bold,
                    rgba,
                } => self.draw_text(*x as i32, *y as i32, text, *scale, *bold, *rgba),
                PaintCommand::Image { rect, source } => self.draw_image(source, *rect),
            }
        }
    }

    /// Source-over composite of `src` (straight alpha, 0-255 floats) scaled by `coverage`.
    fn blend(&mut self, x: u32, y: u32, src: [f32; 4], coverage: f32) {
        let sa = src[3] / 255.0 * coverage;
        if sa <= 0.0 {
            return;
        }
        let i = (y as usize * self.image.width as usize + x as usize) * 4;
        let dst = &mut self.image.pixels[i..i + 4];
        let da = dst[3] as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        for c in 0..3 {
            let v = (src[c] * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
            dst[c] = v.round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }

    fn blend_rgba(&mut self, x: u32, y: u32, rgba: Rgba, coverage: f32) {
        self.blend(x, y, [rgba.0 as f32, rgba.1 as f32, rgba.2 as f32, rgba.3 as f32], coverage);
    }

    /// Clip a float bounding box to pixel ranges on this canvas.
    fn pixel_span(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> Option<(u32, u32, u32, u32)> {
        let px0 = x0.floor().max(0.0) as u32;
        let py0 = y0.floor().max(0.0) as u32;
        let px1 = (x1.ceil().max(0.0) as u32).min(self.image.width);
        let py1 = (y1.ceil().max(0.0) as u32).min(self.image.height);
        (px0 < px1 && py0 < py1).then_some((px0, py0, px1, py1))
    }

    /// Fill using an inside test, supersampling pixels that straddle the edge.
    fn fill_shape<F>(&mut self, bounds: (f32, f32, f32, f32), rgba: Rgba, inside: F)
    where
        F: Fn(f32, f32) -> bool,
    {
        let Some((x0, y0, x1, y1)) = self.pixel_span(bounds.0, bounds.1, bounds.2, bounds.3) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let hits = SAMPLES
                    .iter()
                    .filter(|(dx, dy)| inside(x as f32 + dx, y as f32 + dy))
                    .count();
                if hits > 0 {
                    self.blend_rgba(x, y, rgba, hits as f32 / SAMPLES.len() as f32);
                }
            }
        }
    }

    pub fn fill_linear_gradient(&mut self, start: (f32, f32), end: (f32, f32), from: Rgba, to: Rgba) {
        let (dx, dy) = (end.0 - start.0, end.1 - start.1);
        let len2 = dx * dx + dy * dy;
        let lerp = |a: u8, b: u8, t: f32| a as f32 + (b as f32 - a as f32) * t;
        for y in 0..self.image.height {
            for x in 0..self.image.width {
                let t = if len2 > 0.0 {
                    (((x as f32 + 0.5 - start.0) * dx + (y as f32 + 0.5 - start.1) * dy) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let color = [
                    lerp(from.0, to.0, t),
                    lerp(from.1, to.1, t),
                    lerp(from.2, to.2, t),
                    lerp(from.3, to.3, t),
                ];
                self.blend(x, y, color, 1.0);
            }
        }
    }

    pub fn fill_rounded_rect(&mut self, rect: Rect, radius: f32, rgba: Rgba) {
        let r = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
        let (ix0, iy0) = (rect.x + r, rect.y + r);
        let (ix1, iy1) = (rect.right() - r, rect.bottom() - r);
        self.fill_shape((rect.x, rect.y, rect.right(), rect.bottom()), rgba, |px, py| {
            if px < rect.x || px > rect.right() || py < rect.y || py > rect.bottom() {
                return false;
            }
            let dx = px - px.clamp(ix0, ix1);
            let dy = py - py.clamp(iy0, iy1);
            dx * dx + dy * dy <= r * r
        });
    }

    pub fn fill_ellipse(&mut self, e: Ellipse, rgba: Rgba) {
        if e.rx <= 0.0 || e.ry <= 0.0 {
            return;
        }
        self.fill_shape((e.cx - e.rx, e.cy - e.ry, e.cx + e.rx, e.cy + e.ry), rgba, |px, py| {
            let nx = (px - e.cx) / e.rx;
            let ny = (py - e.cy) / e.ry;
            nx * nx + ny * ny <= 1.0
        });
    }

    fn fill_block(&mut self, x: i32, y: i32, w: u32, h: u32, rgba: Rgba) {
        if let Some((x0, y0, x1, y1)) =
            self.pixel_span(x as f32, y as f32, x as f32 + w as f32, y as f32 + h as f32)
        {
            for py in y0..y1 {
                for px in x0..x1 {
                    self.blend_rgba(px, py, rgba, 1.0);
                }
            }
        }
    }

    /// Draw bitmap text with its top-left corner at (x, y).
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, scale: u32, bold: bool, rgba: Rgba) {
        let scale = scale.max(1);
        let advance = (font::GLYPH_SIZE * scale) as i32;
        // Bold widens each lit cell instead of stamping twice so alpha doesn't double up
        let cell_w = scale + if bold { font::bold_offset(scale) } else { 0 };
        for (i, c) in text.chars().enumerate() {
            let gx = x + i as i32 * advance;
            for (row, bits) in font::glyph(c).iter().enumerate() {
                let mut col = 0u32;
                while col < font::GLYPH_SIZE {
                    if bits & (1 << col) == 0 {
                        col += 1;
                        continue;
                    }
                    // Merge horizontal runs into one block
                    let start = col;
                    while col < font::GLYPH_SIZE && bits & (1 << col) != 0 {
                        col += 1;
                    }
                    let run = col - start;
                    self.fill_block(
                        gx + (start * scale) as i32,
                        y + (row as u32 * scale) as i32,
                        run * scale + (cell_w - scale),
                        scale,
                        rgba,
                    );
                }
            }
        }
    }

    /// Draw `src` scaled into `rect` with bilinear filtering.
    pub fn draw_image(&mut self, src: &RgbaImage, rect: Rect) {
        if src.width == 0 || src.height == 0 || rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let Some((x0, y0, x1, y1)) = self.pixel_span(rect.x, rect.y, rect.right(), rect.bottom()) else {
            return;
        };
        let sx = src.width as f32 / rect.width;
        let sy = src.height as f32 / rect.height;
        for y in y0..y1 {
            let cy = y as f32 + 0.5;
            if cy < rect.y || cy > rect.bottom() {
                continue;
            }
            for x in x0..x1 {
                let cx = x as f32 + 0.5;
                if cx < rect.x || cx > rect.right() {
                    continue;
                }
                let color = src.sample_bilinear((cx - rect.x) * sx, (cy - rect.y) * sy);
                self.blend(x, y, color, 1.0);
            }
        }
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, image.width, image.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.pixels)?;
        writer.finish()?;
    }
    Ok(out)
}

/// Decode any 8- or 16-bit PNG into RGBA8.
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage> {
    let mut decoder = png::Decoder::new(bytes);
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    {
        let info = reader.info();
        if info.width > MAX_IMAGE_DIMENSION || info.height > MAX_IMAGE_DIMENSION {
            return Err(Error::Image(format!(
                "Image {}x{} exceeds the {}px limit",
                info.width, info.height, MAX_IMAGE_DIMENSION
            )));
        }
    }
    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf)?;
    let data = &buf[..frame.buffer_size()];
    if frame.bit_depth != png::BitDepth::Eight {
        return Err(Error::Image(format!("Unsupported bit depth {:?}", frame.bit_depth)));
    }

    let pixel_count = frame.width as usize * frame.height as usize;
    let mut pixels = Vec::with_capacity(pixel_count * 4);
    match frame.color_type {
        png::ColorType::Rgba => pixels.extend_from_slice(data),
        png::ColorType::Rgb => {
            for px in data.chunks_exact(3) {
                pixels.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
        }
        png::ColorType::GrayscaleAlpha => {
            for px in data.chunks_exact(2) {
                pixels.extend_from_slice(&[px[0], px[0], px[0], px[1]]);
            }
        }
        png::ColorType::Grayscale => {
            for g in data {
                pixels.extend_from_slice(&[*g, *g, *g, 255]);
            }
        }
        png::ColorType::Indexed => {
            return Err(Error::Image("Indexed PNG was not expanded".into()));
        }
    }
    RgbaImage::from_raw(frame.width, frame.height, pixels)
}

/// Load `{dir}/{Animal}.png`.
pub fn load_animal_image(dir: &Path, animal: Animal) -> Result<RgbaImage> {
    let path = dir.join(animal.asset_file_name());
    debug!("loading animal artwork from {}", path.display());
    let bytes = std::fs::read(&path)
        .map_err(|e| Error::Image(format!("Failed to read {}: {}", path.display(), e)))?;
    decode_png(&bytes)
}
