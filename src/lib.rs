//! Soulpet
//!
//! A spirit-animal quiz service. Users answer eight fixed questions, the
//! answers are scored into one of eight animals, and the result is rendered
//! into a shareable 900x1200 PNG card. The card can optionally be minted as an
//! NFT through the Lootex project-wallet API after being hosted on Cloudinary.
//!
//! # Features
//!
//! - **Quiz engine**: fixed question table and `sum(answers) % 8` scoring
//! - **Result renderer**: pure-Rust rasterizer producing PNG bytes or a data URL
//! - **API proxy** (`server` feature, default): tiny_http routes that forward
//!   JSON payloads to Lootex and Cloudinary with the configured credentials
//!
//! # Example
//!
//! ```
//! use soulpet::quiz::{score_indices, Animal};
//!
//! # fn main() -> soulpet::Result<()> {
//! let animal = score_indices(&[0, 1, 2, 3, 0, 1, 2, 3])?;
//! // 12 % 8 = 4
//! assert_eq!(animal, Animal::Owl);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

pub mod quiz;

// Result card composition (layout -> paint commands -> raster -> PNG)
pub mod rendering;

// Upstream HTTP clients
pub mod cloudinary;
pub mod lootex;

// Transport-independent route handlers
pub mod api;

// Client-side mint flow over a pluggable transport
pub mod mint;

// Embedded HTTP server
#[cfg(feature = "server")]
pub mod server;

pub use api::{ApiReply, RequestContext, Router};
pub use quiz::{Animal, AnswerSet, QUESTIONS};
pub use rendering::{render_result_card, CardSpec, ResultImage};

/// Default chain used by the Lootex project wallet (Soneium).
pub const DEFAULT_CHAIN_ID: u64 = 1868;

/// Service configuration
///
/// The defaults are safe for local development: the server binds to loopback
/// and no upstream credentials are set, so every proxy route answers with a
/// "Server misconfigured" error until the secrets are provided.
///
/// # Examples
///
/// ```
/// let cfg = soulpet::ServiceConfig::default();
/// assert_eq!(cfg.lootex.chain_id, 1868);
/// assert!(cfg.lootex.secret_key.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server listens on
    pub bind: String,
    /// Number of request worker threads
    pub workers: usize,
    /// Directory holding `{Animal}.png` artwork
    pub assets_dir: PathBuf,
    /// Root used to resolve relative `filePathOverride` values
    pub project_root: PathBuf,
    /// Public base URL used when request headers carry no host
    pub public_url: Option<String>,
    /// Upstream request timeout in milliseconds
    pub timeout_ms: u64,
    /// Lootex project-wallet settings
    pub lootex: LootexConfig,
    /// Cloudinary upload settings
    pub cloudinary: CloudinaryConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            workers: default_workers(),
            assets_dir: PathBuf::from("public/assets/animals"),
            project_root: PathBuf::from("."),
            public_url: None,
            timeout_ms: 30000,
            lootex: LootexConfig::default(),
            cloudinary: CloudinaryConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Build a configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Self::default();

        if let Some(bind) = get("SOULPET_BIND") {
            cfg.bind = bind;
        }
        if let Some(workers) = get("SOULPET_WORKERS") {
            cfg.workers = parse_number("SOULPET_WORKERS", &workers)?;
            if cfg.workers == 0 {
                return Err(Error::ConfigError("SOULPET_WORKERS must be at least 1".into()));
            }
        }
        if let Some(dir) = get("SOULPET_ASSETS_DIR") {
            cfg.assets_dir = PathBuf::from(dir);
        }
        if let Some(root) = get("SOULPET_PROJECT_ROOT") {
            cfg.project_root = PathBuf::from(root);
        }
        cfg.public_url = get("SOULPET_PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string());
        if let Some(timeout) = get("SOULPET_TIMEOUT_MS") {
            cfg.timeout_ms = parse_number("SOULPET_TIMEOUT_MS", &timeout)?;
        }

        cfg.lootex.secret_key = get("LOOTEX_SECRET_KEY");
        if let Some(base) = get("LOOTEX_API_BASE") {
            cfg.lootex.api_base = base.trim_end_matches('/').to_string();
        }
        cfg.lootex.contract_address = get("LOOTEX_CONTRACT_ADDRESS");
        cfg.lootex.contract_id = get("LOOTEX_CONTRACT_ID");
        if let Some(chain) = get("LOOTEX_CHAIN_ID") {
            cfg.lootex.chain_id = parse_number("LOOTEX_CHAIN_ID", &chain)?;
        }

        cfg.cloudinary.cloud_name = get("CLOUDINARY_CLOUD_NAME");
        cfg.cloudinary.api_key = get("CLOUDINARY_API_KEY");
        cfg.cloudinary.api_secret = get("CLOUDINARY_API_SECRET");
        if let Some(base) = get("CLOUDINARY_API_BASE") {
            cfg.cloudinary.api_base = base.trim_end_matches('/').to_string();
        }

        Ok(cfg)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::ConfigError(format!("{} must be a number, got '{}'", key, value)))
}

#[cfg(feature = "server")]
fn default_workers() -> usize {
    num_cpus::get().max(1)
}

#[cfg(not(feature = "server"))]
fn default_workers() -> usize {
    1
}

/// Lootex project-wallet settings
#[derive(Debug, Clone)]
pub struct LootexConfig {
    /// Bearer token for the project wallet
    pub secret_key: Option<String>,
    /// API base URL (no trailing slash)
    pub api_base: String,
    /// Drop contract used when a request does not name one
    pub contract_address: Option<String>,
    /// Deploy-drop contract id; enables lazy-mint before `/api/mint`
    pub contract_id: Option<String>,
    /// Chain id sent with every payload
    pub chain_id: u64,
}

impl Default for LootexConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            api_base: "https://api.lootexplus.com".to_string(),
            contract_address: None,
            contract_id: None,
            chain_id: DEFAULT_CHAIN_ID,
        }
    }
}

/// Cloudinary upload settings
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    /// Folder uploads are placed in
    pub folder: String,
    /// Upload API base URL (no trailing slash)
    pub api_base: String,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            api_key: None,
            api_secret: None,
            folder: "soulpet".to_string(),
            api_base: "https://api.cloudinary.com".to_string(),
        }
    }
}

/// Result card dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CardSize {
    fn default() -> Self {
        // 3:4 portrait
        Self {
            width: 900,
            height: 1200,
        }
    }
}
