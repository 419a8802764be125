use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::OrderBy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LibraryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:41595".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8081".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GalleryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub order_by: OrderBy,
    #[serde(default)]
    pub descending: bool,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            order_by: OrderBy::default(),
            descending: false,
        }
    }
}

fn default_page_size() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TemplatesConfig {
    /// Directory holding `gallery.html` and `items.html`. Embedded templates
    /// are used when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub watch: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_annotation")]
    pub annotation: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            max_bytes: default_max_bytes(),
            annotation: default_annotation(),
        }
    }
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}
fn default_max_bytes() -> usize {
    32 * 1024 * 1024
}
fn default_annotation() -> String {
    "Uploaded Remotely".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    Ok(config)
}

/// Loads the config file if one was given, otherwise starts from defaults,
/// then applies environment overrides and validates the result.
pub fn resolve_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) => load_config(p)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Applies `EAGLE_BASE_URL`, `GALLERY_BIND` and `GALLERY_PAGE_SIZE`.
///
/// The lookup is injected so tests don't have to touch the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("EAGLE_BASE_URL") {
        config.library.base_url = url;
    }
    if let Some(bind) = lookup("GALLERY_BIND") {
        config.server.bind = bind;
    }
    if let Some(size) = lookup("GALLERY_PAGE_SIZE") {
        config.gallery.page_size = size
            .trim()
            .parse()
            .with_context(|| format!("GALLERY_PAGE_SIZE is not a positive integer: {}", size))?;
    }
    Ok(())
}

pub fn validate(config: &Config) -> Result<()> {
    if config.gallery.page_size == 0 {
        anyhow::bail!("gallery.page_size must be > 0");
    }

    if config.library.timeout_secs == 0 {
        anyhow::bail!("library.timeout_secs must be > 0");
    }

    let url = &config.library.base_url;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("library.base_url must be an http(s) URL, got '{}'", url);
    }

    if config.upload.max_bytes == 0 {
        anyhow::bail!("upload.max_bytes must be > 0");
    }

    if config.templates.watch && config.templates.dir.is_none() {
        anyhow::bail!("templates.watch requires templates.dir to be set");
    }

    Ok(())
}
