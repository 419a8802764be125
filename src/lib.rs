//! # Eagle Gallery
//!
//! A local web front-end for browsing, filtering, paginating and uploading
//! items of an [Eagle](https://eagle.cool) library through its local HTTP API.
//!
//! The gallery keeps no state of its own. Every request is turned into a
//! filter, answered by the library service and rendered from scratch.
//!
//! ## Architecture
//!
//! ```text
//! GET /gallery, /items                 GET /img/{id}
//!        │                                   │
//!        ▼                                   ▼
//! ┌─────────────┐   ┌──────────────┐   ┌───────────┐
//! │ query       │──▶│ gallery      │   │ resolve   │
//! │ build_filter│   │ assemble     │   │ thumbnail │
//! └─────────────┘   └──────┬───────┘   └─────┬─────┘
//!                          │                 │
//!                          ▼                 ▼
//!                   ┌──────────────────────────────┐
//!                   │ library (Eagle local API)    │
//!                   └──────────────────────────────┘
//!                          │
//!                          ▼
//!                   ┌──────────────┐
//!                   │ render       │  full page / items fragment
//!                   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and env overrides |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Items, folders, tags, filters, render model |
//! | [`library`] | Library service client |
//! | [`resolve`] | Thumbnail / full-resolution path resolution |
//! | [`query`] | Query parameters to filter |
//! | [`gallery`] | Render model assembly |
//! | [`render`] | Template selection and rendering |
//! | [`reload`] | Live template reloading |
//! | [`upload`] | PNG upload forwarding |
//! | [`server`] | HTTP server |

pub mod config;
pub mod error;
pub mod gallery;
pub mod library;
pub mod logging;
pub mod models;
pub mod query;
pub mod reload;
pub mod render;
pub mod resolve;
pub mod server;
pub mod upload;
