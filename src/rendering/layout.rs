/// Card layout math: fixed card geometry plus the fit-contained image box.

use crate::{CardSize, Error, Result};

pub const MARGIN: f32 = 40.0;
pub const HEADER_HEIGHT: f32 = 160.0;
pub const FOOTER_HEIGHT: f32 = 100.0;
pub const CARD_RADIUS: f32 = 32.0;
/// Distance from the card top to the title's top edge
pub const TITLE_OFFSET: f32 = 36.0;
/// Distance from the bottom margin up to the date baseline
pub const DATE_OFFSET: f32 = 36.0;
/// Horizontal padding between the card edge and the image box
pub const IMAGE_INSET: f32 = 80.0;
/// Vertical space reserved below the image box for the shadow
pub const SHADOW_ROOM: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipse {
    pub cx: f32,
    pub cy: f32,
    pub rx: f32,
    pub ry: f32,
}

/// Scale `src` to fit inside `max` preserving aspect ratio, rounding to whole pixels.
pub fn fit_contain(src_w: u32, src_h: u32, max_w: f32, max_h: f32) -> (u32, u32) {
    if src_w == 0 || src_h == 0 {
        return (0, 0);
    }
    let ratio = (max_w / src_w as f32).min(max_h / src_h as f32);
    let w = (src_w as f32 * ratio).round().max(0.0) as u32;
    let h = (src_h as f32 * ratio).round().max(0.0) as u32;
    (w, h)
}

/// Resolved geometry for every element of the result card
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    pub size: CardSize,
    pub card: Rect,
    pub radius: f32,
    pub center_x: f32,
    pub title_top: f32,
    /// Maximum area available to the image
    pub image_box: Rect,
    /// Where the image is actually drawn
    pub image: Rect,
    pub shadow: Ellipse,
    pub date_baseline: f32,
}

impl CardLayout {
    pub fn compute(size: CardSize, image_w: u32, image_h: u32) -> Result<Self> {
        if image_w == 0 || image_h == 0 {
            return Err(Error::RenderError("Animal image has no pixels".into()));
        }
        let width = size.width as f32;
        let height = size.height as f32;
        let card = Rect {
            x: MARGIN,
            y: MARGIN,
            width: width - MARGIN * 2.0,
            height: height - MARGIN * 2.0,
        };
        if card.width <= IMAGE_INSET || card.height <= HEADER_HEIGHT + FOOTER_HEIGHT {
            return Err(Error::RenderError(format!(
                "Card size {}x{} is too small",
                size.width, size.height
            )));
        }

        let max_w = card.width - IMAGE_INSET;
        let max_h = height - HEADER_HEIGHT - FOOTER_HEIGHT - MARGIN * 2.0 - SHADOW_ROOM;
        let (draw_w, draw_h) = fit_contain(image_w, image_h, max_w, max_h);
        let (draw_w, draw_h) = (draw_w as f32, draw_h as f32);
        let center_x = width / 2.0;

        let image_box = Rect {
            x: center_x - max_w / 2.0,
            y: card.y + HEADER_HEIGHT,
            width: max_w,
            height: max_h,
        };
        let image = Rect {
            x: center_x - draw_w / 2.0,
            y: card.y + HEADER_HEIGHT + (max_h - draw_h) / 2.0,
            width: draw_w,
            height: draw_h,
        };
        let shadow = Ellipse {
            cx: center_x,
            cy: image.bottom() + 30.0,
            rx: draw_w * 0.35,
            ry: 20.0,
        };

        Ok(Self {
            size,
            card,
            radius: CARD_RADIUS,
            center_x,
            title_top: card.y + TITLE_OFFSET,
            image_box,
            image,
            shadow,
            date_baseline: height - MARGIN - DATE_OFFSET,
        })
    }
}
