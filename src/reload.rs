//! Live template reloading for development.
//!
//! Watches the template directory and publishes a freshly parsed template set
//! into the [`TemplateStore`] whenever one of the template files changes. A
//! set that fails to parse is logged and dropped; the previous snapshot keeps
//! serving.

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::render::{load_templates, TemplateStore, TEMPLATE_NAMES};

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Keeps the watcher alive. Dropping it stops reloading.
pub struct TemplateWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    dir: PathBuf,
}

impl TemplateWatcher {
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Starts watching `dir` and reloading into `store`.
pub fn spawn_template_watcher(
    dir: PathBuf,
    store: Arc<TemplateStore>,
) -> anyhow::Result<TemplateWatcher> {
    let reload_dir = dir.clone();
    let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| match result {
        Ok(events) => {
            if events.iter().any(|e| is_template(&e.path)) {
                reload_from(&reload_dir, &store);
            }
        }
        Err(e) => tracing::warn!("Template watcher error: {:?}", e),
    })?;

    debouncer
        .watcher()
        .watch(&dir, RecursiveMode::NonRecursive)?;
    tracing::info!("Watching templates in {}", dir.display());

    Ok(TemplateWatcher {
        _debouncer: debouncer,
        dir,
    })
}

/// Re-parses the templates and publishes them. Returns whether it did.
pub fn reload_from(dir: &Path, store: &TemplateStore) -> bool {
    match load_templates(dir) {
        Ok(tera) => {
            store.publish(tera);
            tracing::info!("Templates reloaded from {}", dir.display());
            true
        }
        Err(e) => {
            tracing::warn!("Failed to reload templates: {:#}", e);
            false
        }
    }
}

fn is_template(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| TEMPLATE_NAMES.contains(&n))
        .unwrap_or(false)
}
