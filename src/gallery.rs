//! Gallery assembly: fetches items and taxonomy, builds the render model.

use crate::error::Result;
use crate::library::LibraryClient;
use crate::models::{GalleryData, ItemListOptions};

/// Fetches items, folders and tags for one page and merges them into a
/// [`GalleryData`].
///
/// Fetches run in sequence and the first failure is returned as is; there is
/// no partial render and no retry. Tags and folders are only kept for page 0.
/// `page_index` is passed through untouched.
pub async fn assemble_gallery(
    client: &dyn LibraryClient,
    filter: ItemListOptions,
    page_index: usize,
) -> Result<GalleryData> {
    let items = client.list_items(&filter).await?;
    let folders = client.list_folders().await?;
    let tags = client.list_tags().await?;

    let (all_tags, all_folders) = if page_index == 0 {
        (tags.into_iter().map(|t| t.name).collect(), folders)
    } else {
        (Vec::new(), Vec::new())
    };

    tracing::debug!(
        page = page_index,
        items = items.len(),
        tags = all_tags.len(),
        folders = all_folders.len(),
        "assembled gallery"
    );

    Ok(GalleryData {
        items,
        page: page_index,
        all_tags,
        all_folders,
        filter,
    })
}
