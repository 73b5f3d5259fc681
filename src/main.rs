//! spcview - a terminal viewer for SPC convective outlooks
//!
//! spcview lists the Storm Prediction Center convective outlooks issued on
//! a day, then shows the selected outlook's text discussion next to its
//! categorical map.
//!
//! # Quick Start
//!
//! ```text
//! spcview                 # Today's outlooks (UTC)
//! spcview -d 20240501     # Outlooks issued on 1 May 2024
//! spcview --no-image      # Never draw map images
//! ```
//!
//! # Keybindings
//!
//! | Key | Action |
//! |-----|--------|
//! | 1-4 | Select outlook day |
//! | j/k | Scroll forecast one line |
//! | Ctrl+D/Ctrl+U | Scroll forecast half a page |
//! | f | Show/hide forecast panel |
//! | o | Show/hide outlook panel |
//! | q, Ctrl+C | Quit |

mod app;
mod config;
mod source;
mod ui;

use std::env;
use std::sync::Arc;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use crossterm::event::EventStream;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::app::{App, AppOptions};
use crate::config::{Config, ImageMode};
use crate::source::{menu_entries, MenuEntry, OutlookSource, SpcClient};
use crate::ui::Surface;

/// Command line options
#[derive(Default)]
struct Args {
    /// Listing date, today (UTC) when unset
    date: Option<NaiveDate>,
    no_image: bool,
    url: Option<String>,
}

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_version() {
    eprintln!("spcview {}", VERSION);
}

fn print_help() {
    eprintln!("spcview {} - A terminal viewer for SPC convective outlooks", VERSION);
    eprintln!();
    eprintln!("Usage: spcview [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -d, --date <YYYYMMDD>  Show outlooks issued on this date (default: today, UTC)");
    eprintln!("  --url <URL>            SPC website base URL (default: {})", source::spc::DEFAULT_SPC_URL);
    eprintln!("  --no-image             Show the map URL instead of the map");
    eprintln!("  -v, --version          Show version");
    eprintln!("  -h, --help             Show this help");
    eprintln!();
    eprintln!("Keys:");
    eprintln!("  1-4                    Select outlook day");
    eprintln!("  j/k, Down/Up           Scroll forecast one line");
    eprintln!("  Ctrl+D, Ctrl+U         Scroll forecast half a page");
    eprintln!("  f                      Show/hide forecast panel");
    eprintln!("  o                      Show/hide outlook panel");
    eprintln!("  q, Ctrl+C              Quit");
    eprintln!();
    eprintln!("Configuration: ~/.spcview/config.toml");
    eprintln!("Log file:      ~/.spcview/spcview.log");
}

/// Parse command line arguments
fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-d" | "--date" => {
                i += 1;
                let value = args.get(i).ok_or("Missing date argument")?;
                let date = NaiveDate::parse_from_str(value, "%Y%m%d")
                    .map_err(|_| format!("Invalid date: {} (expected YYYYMMDD)", value))?;
                parsed.date = Some(date);
            }
            "--url" => {
                i += 1;
                let value = args.get(i).ok_or("Missing URL argument")?;
                parsed.url = Some(value.clone());
            }
            "--no-image" => {
                parsed.no_image = true;
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(parsed)
}

/// Log to `~/.spcview/spcview.log`; stdout belongs to the viewer
fn init_logging(level: &str) {
    let log_path = Config::data_dir()
        .map(|dir| dir.join("spcview.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("spcview.log"));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    // Logging is configured by the config file, so load errors are
    // reported once the subscriber is up
    let (mut config, config_error) = match Config::load() {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_logging(&config.log_level);
    info!("spcview {} starting...", VERSION);
    if let Some(e) = config_error {
        warn!(error = %e, "using default configuration");
    }

    if let Some(url) = args.url {
        config.spc_url = url;
    }
    if args.no_image {
        config.image_mode = ImageMode::Off;
    }

    let source: Arc<dyn OutlookSource> = Arc::new(
        SpcClient::new(&config.spc_url)
            .with_context(|| format!("invalid SPC URL: {}", config.spc_url))?,
    );
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    println!("Loading SPC Outlooks...");
    let entries = match runtime.block_on(load_entries(source.as_ref(), date)) {
        Ok(entries) if !entries.is_empty() => entries,
        Ok(_) => {
            error!(%date, "no outlooks listed");
            eprintln!("Failed to load");
            std::process::exit(1);
        }
        Err(e) => {
            error!(%date, error = %e, "listing failed");
            eprintln!("Failed to load");
            std::process::exit(1);
        }
    };
    info!(%date, days = entries.len(), "outlooks loaded");

    runtime.block_on(run_viewer(&config, source, entries))?;
    info!("spcview exiting");
    Ok(())
}

async fn load_entries(
    source: &dyn OutlookSource,
    date: NaiveDate,
) -> anyhow::Result<Vec<MenuEntry>> {
    let ids = source.list_outlooks(date).await?;
    Ok(menu_entries(&ids))
}

/// Take over the terminal until the user quits
async fn run_viewer(
    config: &Config,
    source: Arc<dyn OutlookSource>,
    entries: Vec<MenuEntry>,
) -> anyhow::Result<()> {
    let term_program = env::var("TERM_PROGRAM").ok();
    let map = config.image_mode.display(term_program.as_deref());
    info!(?map, term_program = ?term_program, "map display selected");

    let mut surface = Surface::stdout();
    surface.init().context("failed to initialize terminal")?;
    let lock = surface.into_lock();

    let options = AppOptions {
        layout: config.layout.clone(),
        theme: config.theme(),
        map,
    };
    let (mut app, updates) = App::new(source, map.renderer(), Arc::clone(&lock), entries, options);

    let result = async {
        let (cols, rows) = Surface::size()?;
        app.start(cols, rows).await?;
        app.run(EventStream::new(), updates).await
    }
    .await;

    // Restore the terminal before reporting any error
    lock.lock().await.cleanup()?;
    info!(
        selected = app.selected_index(),
        fetches = app.generation(),
        "viewer closed"
    );
    if let Err(e) = &result {
        error!(error = %e, "viewer failed");
    }
    result.context("terminal I/O failed")
}
