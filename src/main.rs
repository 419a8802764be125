//! # Eagle Gallery CLI (`eagle-gallery`)
//!
//! Serves a browsable web gallery on top of a running Eagle library.
//!
//! ## Usage
//!
//! ```bash
//! eagle-gallery [--config ./config/gallery.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `eagle-gallery serve` | Start the web gallery |
//! | `eagle-gallery resolve <id>` | Print the file path served for an item |
//! | `eagle-gallery check` | Check that the library service answers |
//!
//! ## Examples
//!
//! ```bash
//! # Serve on the default address (0.0.0.0:8081)
//! eagle-gallery serve
//!
//! # Edit templates live
//! eagle-gallery serve --templates ./templates --watch
//!
//! # Which file does ?fq=true serve for an item?
//! eagle-gallery resolve LR3BOAD1C9ZGC --full-quality
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use eagle_gallery::config;
use eagle_gallery::library::{EagleClient, LibraryClient};
use eagle_gallery::logging::init_logging;
use eagle_gallery::resolve::resolve_display_path;
use eagle_gallery::server;

/// Eagle Gallery: browse, filter and upload to an Eagle library from a browser.
///
/// Settings come from an optional TOML file, then from `EAGLE_BASE_URL`,
/// `GALLERY_BIND` and `GALLERY_PAGE_SIZE`, then from command-line flags.
#[derive(Parser)]
#[command(name = "eagle-gallery", version)]
struct Cli {
    /// Path to configuration file (TOML). Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the web gallery.
    Serve {
        /// Address to bind, overriding `[server].bind`.
        #[arg(long)]
        bind: Option<String>,

        /// Load templates from this directory instead of the embedded ones.
        #[arg(long)]
        templates: Option<PathBuf>,

        /// Reload templates when they change on disk (needs a template directory).
        #[arg(long)]
        watch: bool,
    },

    /// Resolve the file that `/img/<id>` would serve.
    Resolve {
        /// Library item id.
        item_id: String,

        /// Look for the full-resolution original instead of the thumbnail.
        #[arg(long)]
        full_quality: bool,
    },

    /// Check that the library service is reachable.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut cfg = config::resolve_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve {
            bind,
            templates,
            watch,
        } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            if let Some(dir) = templates {
                cfg.templates.dir = Some(dir);
            }
            cfg.templates.watch |= watch;
            config::validate(&cfg)?;
            server::run_server(&cfg).await?;
        }
        Commands::Resolve {
            item_id,
            full_quality,
        } => {
            let client = EagleClient::new(&cfg.library)?;
            let path = resolve_display_path(&client, &item_id, full_quality).await?;
            println!("{}", path.display());
        }
        Commands::Check => {
            let client = EagleClient::new(&cfg.library)?;
            let info = client.application_info().await?;
            println!("library service: {}", client.base_url());
            println!("version:         {} (build {})", info.version, info.build_version);
            println!("platform:        {}", info.platform);
        }
    }

    Ok(())
}
