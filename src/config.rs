//! Runtime configuration.
//!
//! Everything is read once at start-up (environment, optionally seeded from a
//! `.env` file, with command-line overrides) into a [`Settings`] value that is
//! handed to each component. Nothing reads the environment after that.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use serde::Serialize;

/// Default database location, relative to the working directory.
pub const DEFAULT_DATABASE_PATH: &str = "./data/thaigl.db";

/// Default bind address for the web server.
pub const DEFAULT_BIND: &str = "0.0.0.0:8963";

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Error descriptions that mean the probed message no longer exists.
pub const DEFAULT_GONE_SIGNATURES: &[&str] = &["message to copy not found", "MESSAGE_ID_INVALID"];

/// Command-line / environment configuration surface.
///
/// Converted into [`Settings`] with [`Settings::from_args`].
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Telegram bot token
    #[arg(long, env = "TG_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Chat id of the group whose documents make up the library
    #[arg(long, env = "TG_BOOK_CHAT_ID", allow_negative_numbers = true)]
    pub book_chat_id: Option<String>,

    /// Chat id the cleanup worker copies probe messages into
    #[arg(long, env = "TG_MAINT_CHAT_ID", allow_negative_numbers = true)]
    pub maint_chat_id: Option<String>,

    /// Bot API base URL
    #[arg(long, env = "TG_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Seconds between update polls
    #[arg(long, env = "TG_POLL_INTERVAL", default_value = "2.0", value_parser = parse_seconds)]
    pub poll_interval: Duration,

    /// Long-poll timeout handed to getUpdates, in seconds
    #[arg(long, env = "TG_POLL_TIMEOUT", default_value = "10")]
    pub poll_timeout: u64,

    /// Seconds between cleanup passes (0 disables cleanup)
    #[arg(long, env = "TG_CLEANUP_INTERVAL", default_value = "0", value_parser = parse_seconds)]
    pub cleanup_interval: Duration,

    /// Seconds to wait between two cleanup probes
    #[arg(long, env = "TG_CLEANUP_PROBE_DELAY", default_value = "0.2", value_parser = parse_seconds)]
    pub probe_delay: Duration,

    /// Upper bound on a single cleanup probe, in seconds
    #[arg(long, env = "TG_CLEANUP_PROBE_TIMEOUT", default_value = "30", value_parser = parse_seconds)]
    pub probe_timeout: Duration,

    /// Comma separated error fragments that confirm a message is gone
    #[arg(long, env = "TG_CLEANUP_GONE_ERRORS", value_delimiter = ',')]
    pub gone_errors: Vec<String>,

    /// Delete the copies left in the maintenance chat by successful probes
    #[arg(
        long,
        env = "TG_CLEANUP_PURGE_COPIES",
        default_value = "false",
        action = clap::ArgAction::Set,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub purge_probe_copies: bool,

    /// SQLite database file
    #[arg(long, env = "THAIGL_DB_PATH", default_value = DEFAULT_DATABASE_PATH)]
    pub db_path: PathBuf,

    /// Directory for cached cover thumbnails (defaults next to the database)
    #[arg(long, env = "THAIGL_COVER_CACHE_DIR")]
    pub cover_cache_dir: Option<PathBuf>,

    /// Built frontend to serve at the site root
    #[arg(long, env = "FRONTEND_DIST")]
    pub frontend_dist: Option<PathBuf>,

    /// Shared secret for admin operations (unset leaves them open)
    #[arg(long, env = "THAIGL_ADMIN_KEY", hide_env_values = true)]
    pub admin_key: Option<String>,

    /// Source label used when a caption names no source and the sender has no handle
    #[arg(long, env = "THAIGL_DEFAULT_SOURCE", default_value = "telegram")]
    pub default_source: String,

    #[command(flatten)]
    pub branding: BrandingArgs,
}

/// Branding strings exposed to the frontend.
#[derive(Debug, Clone, Args)]
pub struct BrandingArgs {
    #[arg(long, env = "THAIGL_SITE_NAME", default_value = "ThaiGL Library")]
    pub site_name: String,
    #[arg(long, env = "THAIGL_HEADER_NAME")]
    pub header_name: Option<String>,
    #[arg(long, env = "THAIGL_APP_ICON")]
    pub app_icon: Option<String>,
    #[arg(long, env = "THAIGL_APPLE_ICON")]
    pub apple_icon: Option<String>,
    #[arg(long, env = "THAIGL_LOGO")]
    pub logo: Option<String>,
    #[arg(long, env = "THAIGL_DEFAULT_COVER")]
    pub default_cover: Option<String>,
    #[arg(long, env = "THAIGL_FOOTER_TEXT")]
    pub footer_text: Option<String>,
}

/// Parse a non-negative, possibly fractional, number of seconds.
pub fn parse_seconds(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of seconds", raw))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| format!("'{}' must be a finite, non-negative number of seconds", raw))
}

/// Bot API access.
#[derive(Debug, Clone)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    pub book_chat_id: Option<String>,
    pub maint_chat_id: Option<String>,
    pub api_base: String,
}

/// Update polling.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub poll_interval: Duration,
    pub poll_timeout_secs: u64,
}

/// Stale record reconciliation.
#[derive(Debug, Clone)]
pub struct CleanupSettings {
    /// Start-to-start spacing of passes. Zero disables the worker.
    pub interval: Duration,
    pub probe_delay: Duration,
    pub probe_timeout: Duration,
    /// Error fragments that confirm a probed message is gone.
    pub gone_signatures: Vec<String>,
    pub purge_probe_copies: bool,
}

/// Branding strings with their fallbacks applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branding {
    pub site_name: String,
    pub header_name: String,
    pub app_icon: String,
    pub apple_icon: String,
    pub logo: String,
    pub default_cover: String,
    pub footer_text: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self::from_args(BrandingArgs {
            site_name: "ThaiGL Library".to_string(),
            header_name: None,
            app_icon: None,
            apple_icon: None,
            logo: None,
            default_cover: None,
            footer_text: None,
        })
    }
}

impl Branding {
    /// Resolve fallbacks: the apple icon falls back to the logo then the app
    /// icon, the logo to the app icon, and the header to the site name.
    pub fn from_args(args: BrandingArgs) -> Self {
        let app_icon = non_blank(args.app_icon).unwrap_or_default();
        let logo = non_blank(args.logo).unwrap_or_else(|| app_icon.clone());
        let apple_icon = non_blank(args.apple_icon).unwrap_or_else(|| logo.clone());
        let header_name = non_blank(args.header_name).unwrap_or_else(|| args.site_name.clone());

        Self {
            site_name: args.site_name,
            header_name,
            app_icon,
            apple_icon,
            logo,
            default_cover: non_blank(args.default_cover).unwrap_or_default(),
            footer_text: non_blank(args.footer_text).unwrap_or_default(),
        }
    }
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub sync: SyncSettings,
    pub cleanup: CleanupSettings,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Cached cover thumbnails.
    pub cover_cache_dir: PathBuf,
    pub frontend_dist: Option<PathBuf>,
    pub admin_key: Option<String>,
    pub default_source: String,
    pub branding: Branding,
}

impl Default for Settings {
    fn default() -> Self {
        let database_path = PathBuf::from(DEFAULT_DATABASE_PATH);
        Self {
            telegram: TelegramSettings {
                bot_token: None,
                book_chat_id: None,
                maint_chat_id: None,
                api_base: DEFAULT_API_BASE.to_string(),
            },
            sync: SyncSettings {
                poll_interval: Duration::from_secs(2),
                poll_timeout_secs: 10,
            },
            cleanup: CleanupSettings {
                interval: Duration::ZERO,
                probe_delay: Duration::from_millis(200),
                probe_timeout: Duration::from_secs(30),
                gone_signatures: default_gone_signatures(),
                purge_probe_copies: false,
            },
            cover_cache_dir: default_cover_dir(&database_path),
            database_path,
            frontend_dist: None,
            admin_key: None,
            default_source: "telegram".to_string(),
            branding: Branding::default(),
        }
    }
}

impl Settings {
    /// Build settings from parsed arguments.
    pub fn from_args(args: ConfigArgs) -> Self {
        let gone_signatures: Vec<String> = args
            .gone_errors
            .into_iter()
            .filter_map(|s| non_blank(Some(s)))
            .collect();
        let cover_cache_dir = args
            .cover_cache_dir
            .unwrap_or_else(|| default_cover_dir(&args.db_path));

        Self {
            telegram: TelegramSettings {
                bot_token: non_blank(args.bot_token),
                book_chat_id: non_blank(args.book_chat_id),
                maint_chat_id: non_blank(args.maint_chat_id),
                api_base: args.api_base.trim_end_matches('/').to_string(),
            },
            sync: SyncSettings {
                poll_interval: args.poll_interval,
                poll_timeout_secs: args.poll_timeout,
            },
            cleanup: CleanupSettings {
                interval: args.cleanup_interval,
                probe_delay: args.probe_delay,
                probe_timeout: args.probe_timeout,
                gone_signatures: if gone_signatures.is_empty() {
                    default_gone_signatures()
                } else {
                    gone_signatures
                },
                purge_probe_copies: args.purge_probe_copies,
            },
            database_path: args.db_path,
            cover_cache_dir,
            frontend_dist: args.frontend_dist,
            admin_key: non_blank(args.admin_key),
            default_source: args.default_source,
            branding: Branding::from_args(args.branding),
        }
    }

    /// Database URL understood by the repository layer.
    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.database_path.display())
    }

    /// Whether the update poller can run.
    pub fn sync_enabled(&self) -> bool {
        self.telegram.bot_token.is_some() && self.telegram.book_chat_id.is_some()
    }

    /// Whether the cleanup worker should run.
    pub fn cleanup_enabled(&self) -> bool {
        !self.cleanup.interval.is_zero()
            && self.telegram.bot_token.is_some()
            && self.telegram.maint_chat_id.is_some()
    }

    /// Log what is switched off because of missing configuration.
    pub fn warn_disabled_features(&self) {
        if self.telegram.bot_token.is_none() {
            tracing::warn!("TG_BOT_TOKEN not set; sync, downloads and covers are disabled");
        }
        if self.telegram.book_chat_id.is_none() {
            tracing::warn!("TG_BOOK_CHAT_ID not set; sync is disabled");
        }
        if !self.cleanup.interval.is_zero() && self.telegram.maint_chat_id.is_none() {
            tracing::warn!("TG_MAINT_CHAT_ID not set; cleanup is disabled");
        }
        if self.admin_key.is_none() {
            tracing::warn!("THAIGL_ADMIN_KEY not set; admin endpoints are open to everyone");
        }
    }

    /// Create the database and cover cache directories.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        if let Some(parent) = self.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir(parent, "database directory")?;
            }
        }
        create_dir(&self.cover_cache_dir, "cover cache directory")
    }
}

fn create_dir(path: &Path, label: &str) -> std::io::Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("Failed to create {} '{}': {}", label, path.display(), e),
        )
    })
}

fn default_cover_dir(database_path: &Path) -> PathBuf {
    database_path
        .parent()
        .map(|p| p.join("covers"))
        .unwrap_or_else(|| PathBuf::from("covers"))
}

fn default_gone_signatures() -> Vec<String> {
    DEFAULT_GONE_SIGNATURES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
