//! 8x8 bitmap glyphs scaled up to canvas font sizes.

use font8x8::{UnicodeFonts, BASIC_FONTS, LATIN_FONTS};

/// Glyph cell size in font units (pixels at scale 1)
pub const GLYPH_SIZE: u32 = 8;

/// Row that sits on the alphabetic baseline; descenders use the row below.
pub const BASELINE_ROW: u32 = 7;

/// Bitmap rows for `c`, LSB is the leftmost pixel.
pub fn glyph(c: char) -> [u8; 8] {
    let c = match c {
        '\u{2012}'..='\u{2015}' => '-',
        '\u{2018}' | '\u{2019}' => '\'',
        '\u{201C}' | '\u{201D}' => '"',
        _ => c,
    };
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

/// Integer scale that best approximates a CSS pixel size.
pub fn scale_for_px(px: f32) -> u32 {
    ((px / GLYPH_SIZE as f32).round() as u32).max(1)
}

/// Advance width of `text` at `scale`, bold adds one stroke to the last glyph.
pub fn text_width(text: &str, scale: u32, bold: bool) -> u32 {
    let n = text.chars().count() as u32;
    if n == 0 {
        return 0;
    }
    n * GLYPH_SIZE * scale + if bold { bold_offset(scale) } else { 0 }
}

/// Horizontal offset of the second stamp used to embolden glyphs.
pub fn bold_offset(scale: u32) -> u32 {
    (scale / 3).max(1)
}

/// Largest scale not above `preferred` whose rendering fits in `max_width`.
pub fn fit_scale(text: &str, preferred: u32, max_width: u32, bold: bool) -> u32 {
    let mut scale = preferred.max(1);
    while scale > 1 && text_width(text, scale, bold) > max_width {
        scale -= 1;
    }
    scale
}
