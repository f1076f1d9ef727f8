use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;

mod config;
mod dropbox_api;
mod error;
mod logging;
mod sync;
mod util;

use dropbox_api::DropboxClient;
use error::SyncError;
use sync::filter::FilterCriteria;
use sync::store::RemoteStore;
use sync::{Direction, SyncEngine, SyncReport, SyncSettings};

#[derive(Parser)]
#[command(
    name = "cloudsync",
    version,
    about = "One-way mirroring between a local directory tree and a Dropbox folder"
)]
struct Cli {
    /// Local directory
    #[arg(long)]
    localdir: PathBuf,

    /// Dropbox folder ("/" or "" for the Dropbox root)
    #[arg(long)]
    dropboxdir: String,

    /// Which side is mirrored onto the other
    #[arg(long, value_enum)]
    direction: Direction,

    /// Dropbox access token
    #[arg(long, env = "DROPBOX_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Only sync files modified less than this many days ago
    #[arg(long)]
    match_days: Option<u32>,

    /// Only sync files smaller than this many bytes
    #[arg(long)]
    max_size: Option<u64>,

    /// Leave out files whose name matches this mask (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Path to config file [default: ~/.config/cloudsync/config.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file [default: <tmp dir>/cloudsync.log]
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Level for this crate: config or the interactive default, raised by `-v`.
fn log_level(verbose: u8, interactive: bool, configured: Option<&str>) -> String {
    match verbose {
        0 => configured
            .map(str::to_string)
            .unwrap_or_else(|| if interactive { "debug" } else { "info" }.to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match config::load_config(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("cloudsync: {e:#}");
            return ExitCode::from(2);
        }
    };

    let interactive = std::io::stdin().is_terminal();
    let log_settings = logging::LogSettings {
        level: log_level(cli.verbose, interactive, cfg.general.log_level.as_deref()),
        console: interactive,
        file: cli
            .log_file
            .clone()
            .or_else(|| cfg.general.log_file.clone())
            .unwrap_or_else(logging::default_log_file),
        max_bytes: cfg.general.log_max_bytes,
        backups: cfg.general.log_backups,
    };
    if let Err(e) = logging::init(&log_settings) {
        tracing::warn!(error = %e, "file logging disabled");
        if !interactive {
            eprintln!("cloudsync: {e}");
        }
    }

    match run(cli, cfg).await {
        Ok(report) if report.is_clean() => ExitCode::SUCCESS,
        Ok(report) => {
            tracing::warn!(
                failures = report.failures,
                failed_directories = report.failed_directories,
                "sync finished with errors"
            );
            ExitCode::from(1)
        }
        Err(SyncError::Config(msg)) => {
            tracing::error!("{msg}");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!(error = %e, "sync failed");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli, cfg: config::Config) -> Result<SyncReport, SyncError> {
    let token = cli
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| SyncError::Config("--token is mandatory".into()))?;

    let match_days = cli.match_days.or(cfg.filter.match_days);
    if match_days == Some(0) {
        return Err(SyncError::Config("--match-days must be at least 1".into()));
    }

    let remote_root = util::path::normalize_remote_root(&cli.dropboxdir);
    tracing::info!(
        "--- Mode: {} local={} dropbox={}",
        cli.direction,
        cli.localdir.display(),
        if remote_root.is_empty() { "/" } else { remote_root.as_str() }
    );

    let client = Arc::new(DropboxClient::new(token)?);
    let account = client.current_account().await?;
    tracing::debug!(
        name = %account.display_name,
        email = %account.email,
        country = account.country.as_deref().unwrap_or("-"),
        locale = %account.locale,
        "Dropbox account"
    );

    let mut exclude = cfg.filter.exclude;
    exclude.extend(cli.exclude);
    let filter = FilterCriteria::new(Utc::now())
        .with_max_age_days(match_days)
        .with_max_size_bytes(cli.max_size.or(cfg.filter.max_size_bytes))
        .with_exclude(exclude);

    let settings = SyncSettings {
        local_root: cli.localdir,
        remote_root,
        direction: cli.direction,
        filter,
        on_listing_failure: cfg.general.on_listing_failure,
    };

    SyncEngine::new(client, settings).run().await
}
