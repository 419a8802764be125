//! Error taxonomy shared by the resolver, assembler, renderer and upload path.
//!
//! Every variant carries a human-readable message. Its `Display` output is
//! what ends up in the HTTP response body, so messages are written for the
//! person looking at the browser, not for a log parser.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    /// The library service was unreachable, timed out, or answered with an error.
    #[error("{0}")]
    Upstream(String),

    /// A path returned by the library service had malformed percent-encoding.
    #[error("error cleaning thumbnail path: {0}")]
    PathDecode(String),

    /// A file the library service pointed at is missing on disk.
    #[error("file not found: {0}")]
    NotFound(String),

    /// Template execution failed against a well-formed model.
    #[error("render failed: {0}")]
    Render(String),

    /// An upload was rejected after content sniffing.
    #[error("{0}")]
    UnsupportedMedia(String),

    /// An upload could not be read, processed or forwarded.
    #[error("{0}")]
    Upload(String),
}

impl GalleryError {
    pub fn upstream(context: &str, err: impl std::fmt::Display) -> Self {
        GalleryError::Upstream(format!("{}: {}", context, err))
    }

    /// Short machine-readable code used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            GalleryError::Upstream(_) => "upstream",
            GalleryError::PathDecode(_) => "path_decode",
            GalleryError::NotFound(_) => "not_found",
            GalleryError::Render(_) => "render",
            GalleryError::UnsupportedMedia(_) => "unsupported_media",
            GalleryError::Upload(_) => "upload",
        }
    }

    /// Render errors are template/model mismatches, i.e. programming defects.
    pub fn is_defect(&self) -> bool {
        matches!(self, GalleryError::Render(_))
    }
}

impl From<tera::Error> for GalleryError {
    fn from(e: tera::Error) -> Self {
        // Tera nests the useful part in the source chain.
        let mut msg = e.to_string();
        let mut source = std::error::Error::source(&e);
        while let Some(inner) = source {
            msg.push_str(": ");
            msg.push_str(&inner.to_string());
            source = inner.source();
        }
        GalleryError::Render(msg)
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;
