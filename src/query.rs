//! Translates raw HTTP query parameters into an [`ItemListOptions`].
//!
//! Page size and ordering come from configuration; the client only controls
//! the offset and the free-text filters. Filters are copied verbatim and
//! encoded later by the library client when it builds its own request.
//!
//! Parameters arrive as ordered pairs. When a key repeats, the first value
//! wins.

use crate::config::GalleryConfig;
use crate::models::ItemListOptions;

/// Builds the filter for one request. Never fails.
///
/// A missing, malformed or negative `offset` means the first page.
pub fn build_filter(raw: &[(String, String)], settings: &GalleryConfig) -> ItemListOptions {
    let field = |key: &str| first_value(raw, key).unwrap_or_default().to_string();

    ItemListOptions {
        limit: settings.page_size,
        offset: parse_offset(first_value(raw, "offset")),
        order_by: settings.order_by,
        descending: settings.descending,
        keyword: field("keyword"),
        ext: String::new(),
        tags: field("tags"),
        folders: field("folders"),
    }
}

/// The first value given for `key`, if any.
pub fn first_value<'a>(raw: &'a [(String, String)], key: &str) -> Option<&'a str> {
    raw.iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn parse_offset(raw: Option<&str>) -> usize {
    match raw.map(str::parse::<i64>) {
        Some(Ok(n)) if n >= 0 => usize::try_from(n).unwrap_or(0),
        _ => 0,
    }
}
