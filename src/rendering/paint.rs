/// Paint command set for the result card

use std::sync::Arc;

use super::font;
use super::layout::{CardLayout, Ellipse, Rect};
use super::raster::RgbaImage;

/// Straight (non-premultiplied) RGBA
pub type Rgba = (u8, u8, u8, u8);

pub const BACKGROUND_FROM: Rgba = (0xfd, 0xe2, 0xe4, 255);
pub const BACKGROUND_TO: Rgba = (0xe0, 0xe7, 0xff, 255);
/// rgba(255,255,255,0.95)
pub const CARD_FILL: Rgba = (255, 255, 255, 242);
pub const TITLE_COLOR: Rgba = (0x43, 0x38, 0xca, 255);
/// #6366f1 at globalAlpha 0.12
pub const SHADOW_COLOR: Rgba = (0x63, 0x66, 0xf1, 31);
pub const DATE_COLOR: Rgba = (0x4b, 0x55, 0x63, 255);

pub const TITLE_PX: f32 = 56.0;
pub const DATE_PX: f32 = 36.0;

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    /// Fill the whole canvas with a gradient running from `start` to `end`
    LinearGradient {
        start: (f32, f32),
        end: (f32, f32),
        from: Rgba,
        to: Rgba,
    },
    RoundedRect {
        rect: Rect,
        radius: f32,
        rgba: Rgba,
    },
    Ellipse {
        shape: Ellipse,
        rgba: Rgba,
    },
    /// Text whose top-left corner is at (x, y)
    Text {
        x: f32,
        y: f32,
        text: String,
        scale: u32,
        bold: bool,
        rgba: Rgba,
    },
    Image {
        rect: Rect,
        source: Arc<RgbaImage>,
    },
}

/// Strings drawn on the card
#[derive(Debug, Clone, PartialEq)]
pub struct CardText {
    pub user_name: String,
    pub animal: String,
    pub date: String,
}

impl CardText {
    pub fn title(&self) -> String {
        format!("{}'s Soulpet \u{2014} {}", self.user_name, self.animal)
    }
}

/// Emit the card's drawing sequence in painter's order.
pub fn build_display_list(layout: &CardLayout, text: &CardText, image: Arc<RgbaImage>) -> Vec<PaintCommand> {
    let width = layout.size.width as f32;
    let height = layout.size.height as f32;
    let mut cmds = Vec::with_capacity(6);

    cmds.push(PaintCommand::LinearGradient {
        start: (0.0, 0.0),
        end: (width, height),
        from: BACKGROUND_FROM,
        to: BACKGROUND_TO,
    });

    cmds.push(PaintCommand::RoundedRect {
        rect: layout.card,
        radius: layout.radius,
        rgba: CARD_FILL,
    });

    let title = text.title();
    let max_title_w = (layout.card.width - 2.0 * layout.radius).max(0.0) as u32;
    let title_scale = font::fit_scale(&title, font::scale_for_px(TITLE_PX), max_title_w, true);
    cmds.push(centered_text(layout.center_x, layout.title_top, title, title_scale, true, TITLE_COLOR));

    if layout.shadow.rx > 0.0 {
        cmds.push(PaintCommand::Ellipse {
            shape: layout.shadow,
            rgba: SHADOW_COLOR,
        });
    }

    cmds.push(PaintCommand::Image {
        rect: layout.image,
        source: image,
    });

    let date_scale = font::scale_for_px(DATE_PX);
    let date_top = layout.date_baseline - (font::BASELINE_ROW * date_scale) as f32;
    cmds.push(centered_text(
        layout.center_x,
        date_top,
        text.date.clone(),
        date_scale,
        false,
        DATE_COLOR,
    ));

    cmds
}

fn centered_text(center_x: f32, top: f32, text: String, scale: u32, bold: bool, rgba: Rgba) -> PaintCommand {
    let w = font::text_width(&text, scale, bold) as f32;
    PaintCommand::Text {
        x: (center_x - w / 2.0).round(),
        y: top.round(),
        text,
        scale,
        bold,
        rgba,
    }
}
