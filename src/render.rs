//! Template rendering for the gallery page and the items fragment.
//!
//! Templates are [Tera](https://keats.github.io/tera/) files. Release builds
//! use the copies embedded at compile time; pointing `[templates].dir` at a
//! directory loads them from disk instead, which together with
//! [`crate::reload`] gives live editing.
//!
//! Handlers never hold a template set across requests. [`TemplateStore`]
//! keeps the current immutable snapshot and a reload swaps in a whole new one,
//! so a request always renders against one consistent set.

use anyhow::Context as _;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tera::{Context, Tera};

use crate::error::Result;
use crate::models::GalleryData;

/// Template file names, in load order.
pub const TEMPLATE_NAMES: [&str; 3] = ["macros.html", "items.html", "gallery.html"];

const EMBEDDED: [(&str, &str); 3] = [
    ("macros.html", include_str!("../templates/macros.html")),
    ("items.html", include_str!("../templates/items.html")),
    ("gallery.html", include_str!("../templates/gallery.html")),
];

/// Which template a request renders.
///
/// The choice is made by the route alone: the gallery endpoint draws the full
/// page, the items endpoint only appends tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTarget {
    FullGallery,
    ItemsFragment,
}

impl RenderTarget {
    pub fn template_name(self) -> &'static str {
        match self {
            RenderTarget::FullGallery => "gallery.html",
            RenderTarget::ItemsFragment => "items.html",
        }
    }
}

/// Renders `data` with the template selected by `target`.
pub fn render(templates: &Tera, target: RenderTarget, data: &GalleryData) -> Result<String> {
    let context = Context::from_serialize(data)?;
    Ok(templates.render(target.template_name(), &context)?)
}

pub fn embedded_templates() -> anyhow::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(EMBEDDED.to_vec())
        .context("Failed to parse embedded templates")?;
    Ok(tera)
}

/// Loads the templates from `dir`. Every file must be present and parse.
pub fn load_templates(dir: &Path) -> anyhow::Result<Tera> {
    let mut sources = Vec::with_capacity(TEMPLATE_NAMES.len());
    for name in TEMPLATE_NAMES {
        let path = dir.join(name);
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template: {}", path.display()))?;
        sources.push((name, source));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(sources)
        .with_context(|| format!("Failed to parse templates in {}", dir.display()))?;
    Ok(tera)
}

/// Holder of the current template snapshot.
pub struct TemplateStore {
    current: RwLock<Arc<Tera>>,
}

impl TemplateStore {
    pub fn new(tera: Tera) -> Self {
        Self {
            current: RwLock::new(Arc::new(tera)),
        }
    }

    /// The snapshot to render the current request with.
    pub fn snapshot(&self) -> Arc<Tera> {
        self.current.read().clone()
    }

    /// Replaces the snapshot. In-flight renders keep the one they took.
    pub fn publish(&self, tera: Tera) {
        *self.current.write() = Arc::new(tera);
    }
}
