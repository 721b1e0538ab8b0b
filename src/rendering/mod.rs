//! Result card rendering
//!
//! The card is composed in three steps: `layout` resolves geometry,
//! `paint` turns it into a display list, and `raster` executes the list into
//! an RGBA buffer that is finally encoded as PNG.

pub mod font;
pub mod layout;
pub mod paint;
pub mod raster;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as Base64Engine;
use log::info;
use sha2::{Digest, Sha256};

use crate::quiz::Animal;
use crate::{CardSize, Error, Result};
use layout::CardLayout;
use paint::CardText;
use raster::{Canvas, RgbaImage};

/// A rendered result card
#[derive(Debug, Clone)]
pub struct ResultImage {
    pub width: u32,
    pub height: u32,
    pub png_data: Vec<u8>,
}

impl ResultImage {
    /// `data:image/png;base64,...`, the form the upload route accepts
    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&self.png_data)
        )
    }

    /// Hex SHA-256 of the PNG bytes
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.png_data))
    }

    /// Download name, e.g. `Soulpet-Mina-Owl.png`
    pub fn file_name(user_name: &str, animal: Animal) -> String {
        format!("Soulpet-{}-{}.png", user_name, animal)
    }
}

/// Decode the PNG payload of a `data:image/png;base64,` URL.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>> {
    let (header, payload) = data_url
        .split_once(',')
        .ok_or_else(|| Error::Validation("Malformed data URL".into()))?;
    if !header.starts_with("data:image/") || !header.ends_with(";base64") {
        return Err(Error::Validation("Expected a base64 image data URL".into()));
    }
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::Validation(format!("Invalid base64 image data: {}", e)))
}

/// Today's date in UTC as `YYYY-MM-DD`
pub fn today_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Everything needed to draw one card
#[derive(Debug, Clone)]
pub struct CardSpec {
    pub user_name: String,
    pub animal: Animal,
    /// Footer date stamp, `YYYY-MM-DD`
    pub date: String,
    pub image: Arc<RgbaImage>,
    pub size: CardSize,
}

impl CardSpec {
    pub fn new(user_name: &str, animal: Animal, image: RgbaImage) -> Self {
        Self {
            user_name: user_name.trim().to_string(),
            animal,
            date: today_utc(),
            image: Arc::new(image),
            size: CardSize::default(),
        }
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }
}

/// Render the result card to PNG.
pub fn render_result_card(spec: &CardSpec) -> Result<ResultImage> {
    if spec.user_name.is_empty() {
        return Err(Error::Validation("userName is required".into()));
    }
    let layout = CardLayout::compute(spec.size, spec.image.width, spec.image.height)?;
    let text = CardText {
        user_name: spec.user_name.clone(),
        animal: spec.animal.to_string(),
        date: spec.date.clone(),
    };
    let commands = paint::build_display_list(&layout, &text, spec.image.clone());

    let mut canvas = Canvas::new(spec.size.width, spec.size.height);
    canvas.execute(&commands);
    let png_data = canvas.encode_png()?;

    Ok(ResultImage {
        width: spec.size.width,
        height: spec.size.height,
        png_data,
    })
}

/// Renders cards using artwork from an assets directory.
#[derive(Debug, Clone)]
pub struct CardRenderer {
    assets_dir: PathBuf,
}

impl CardRenderer {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Render with today's date when `date` is `None`.
    pub fn render(&self, user_name: &str, animal: Animal, date: Option<&str>) -> Result<ResultImage> {
        let image = raster::load_animal_image(&self.assets_dir, animal)?;
        let mut spec = CardSpec::new(user_name, animal, image);
        if let Some(d) = date {
            spec = spec.with_date(d);
        }
        let out = render_result_card(&spec)?;
        info!(
            "rendered {} card for '{}' ({} bytes)",
            animal,
            spec.user_name,
            out.png_data.len()
        );
        Ok(out)
    }
}
