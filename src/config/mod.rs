//! Configuration for the daemon.
//!
//! Read from `~/.config/reelwatch/config.toml` unless a path is given on the
//! command line. A commented template is written when the default file does
//! not exist yet.

pub mod interval;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::{Feed, Filter};

pub use interval::{format_interval, parse_interval};

pub const DEFAULT_INTERVAL_MINUTES: u64 = 30;
pub const DEFAULT_MAX_BUCKET_ITEMS: usize = 30;
pub const DEFAULT_STATEFILE: &str = ".reelwatch.state";

/// The configuration file as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub download_folder: Option<String>,
    pub statefile: Option<String>,
    pub interval: Option<IntervalValue>,
    pub max_bucket_items: Option<i64>,
    pub prowl_apikey: Option<String>,
    /// Shorthand for feeds without cookies.
    pub urls: Vec<String>,
    /// Shorthand for filters without a User-Agent.
    pub patterns: Vec<String>,
    #[serde(rename = "feed")]
    pub feeds: Vec<FeedEntry>,
    #[serde(rename = "filter")]
    pub filters: Vec<FilterEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IntervalValue {
    Minutes(i64),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedEntry {
    pub url: String,
    pub cookies: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterEntry {
    pub pattern: String,
    pub useragent: Option<String>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub download_folder: PathBuf,
    pub statefile: PathBuf,
    pub check_interval: Duration,
    /// Bucket capacity; 0 means unbounded.
    pub max_bucket_items: usize,
    pub prowl_apikey: Option<String>,
    pub feeds: Vec<Feed>,
    pub filters: Vec<Filter>,
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                    tracing::info!("Wrote template configuration to {}", default_path.display());
                }
                default_path
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        let file: ConfigFile = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.clone(),
            source: e,
        })?;

        Self::from_file(file)
    }

    /// Parse configuration text without touching the filesystem.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        Self::from_file(file)
    }

    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let feeds: Vec<Feed> = file
            .urls
            .iter()
            .map(|url| (url.as_str(), None))
            .chain(
                file.feeds
                    .iter()
                    .map(|entry| (entry.url.as_str(), entry.cookies.clone())),
            )
            .map(|(url, cookies)| (url.trim(), cookies))
            .filter(|(url, _)| !url.is_empty())
            .enumerate()
            .map(|(id, (url, cookies))| Feed::new(id, url, cookies))
            .collect();

        if feeds.is_empty() {
            return Err(ConfigError::NoFeeds);
        }

        let filters = file
            .patterns
            .iter()
            .map(|pattern| (pattern.as_str(), None))
            .chain(
                file.filters
                    .iter()
                    .map(|entry| (entry.pattern.as_str(), entry.useragent.clone())),
            )
            .map(|(pattern, agent)| {
                Filter::new(pattern, agent).map_err(|e| ConfigError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if filters.is_empty() {
            return Err(ConfigError::NoFilters);
        }

        let download_folder = match file.download_folder {
            Some(folder) => expand_path(&folder),
            None => std::env::temp_dir(),
        };

        let statefile = match file.statefile {
            Some(path) => expand_path(&path),
            None => dirs::home_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(DEFAULT_STATEFILE),
        };

        Ok(Self {
            download_folder,
            statefile,
            check_interval: check_interval(file.interval.as_ref()),
            max_bucket_items: file
                .max_bucket_items
                .map(|n| usize::try_from(n).unwrap_or(0))
                .unwrap_or(DEFAULT_MAX_BUCKET_ITEMS),
            prowl_apikey: file
                .prowl_apikey
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            feeds,
            filters,
        })
    }

    /// Get the default config file path: `~/.config/reelwatch/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("reelwatch").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Template written on first start. Feeds and filters are commented out,
    /// so the daemon refuses to run until they are filled in.
    pub fn default_config_content() -> String {
        r##"# reelwatch configuration

# Where downloaded files are stored (default: system temp directory)
download_folder = "~/Downloads/trailers"

# Download history database
statefile = "~/.reelwatch.state"

# Time between feed checks: minutes, or "30m", "2h", "1d"
interval = 30

# Number of remembered downloads. 0 keeps everything.
max_bucket_items = 30

# Prowl API key for push notifications
# prowl_apikey = "0123456789abcdef0123456789abcdef01234567"

# Feeds. Cookies may also be appended to the URL as ":COOKIE:name=value".
# [[feed]]
# url = "https://trailers.example.com/rss/newtrailers.rss"
# cookies = "session=abc"

# Filters are regular expressions matched against item URLs.
# The first matching filter decides the User-Agent of the download.
# [[filter]]
# pattern = "_h720p\\.mov$"
# useragent = "QuickTime/7.6.2"
"##
        .to_string()
    }
}

fn check_interval(value: Option<&IntervalValue>) -> Duration {
    let default = Duration::from_secs(DEFAULT_INTERVAL_MINUTES * 60);

    let secs = match value {
        None => return default,
        Some(IntervalValue::Minutes(m)) => u64::try_from(*m)
            .map(|m| m.saturating_mul(60))
            .map_err(|_| format!("Invalid interval: {}", m)),
        Some(IntervalValue::Text(s)) => parse_interval(s),
    };

    match secs {
        Ok(secs) if secs >= 60 => Duration::from_secs(secs),
        Ok(_) => {
            tracing::warn!(
                "Interval must be 1 minute or more, reverting to default ({}min)",
                DEFAULT_INTERVAL_MINUTES
            );
            default
        }
        Err(e) => {
            tracing::warn!("{}, reverting to default ({}min)", e, DEFAULT_INTERVAL_MINUTES);
            default
        }
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Syntax(#[from] toml::de::Error),

    #[error("No feed URL specified in the configuration")]
    NoFeeds,

    #[error("No filters specified in the configuration")]
    NoFilters,

    #[error("Invalid filter pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
urls = ["http://example.com/rss.xml"]
patterns = ["\\.mov$"]
"#;

    #[test]
    fn test_default_template_is_valid_toml_without_feeds() {
        let content = Config::default_config_content();
        let file: ConfigFile = toml::from_str(&content).expect("template should be valid TOML");
        assert_eq!(file.max_bucket_items, Some(30));
        assert!(matches!(Config::from_file(file), Err(ConfigError::NoFeeds)));
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.feeds.len(), 1);
        assert_eq!(config.filters.len(), 1);
        assert_eq!(config.check_interval, Duration::from_secs(30 * 60));
        assert_eq!(config.max_bucket_items, DEFAULT_MAX_BUCKET_ITEMS);
        assert_eq!(config.download_folder, std::env::temp_dir());
        assert!(config.statefile.ends_with(DEFAULT_STATEFILE));
        assert_eq!(config.prowl_apikey, None);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml(
            r#"
download_folder = "/srv/trailers"
statefile = "/var/lib/reelwatch/state.db"
interval = "2h"
max_bucket_items = 100
prowl_apikey = " abc "
urls = ["http://a.example/rss"]
patterns = ["_h480p\\.mov$"]

[[feed]]
url = "http://b.example/rss:COOKIE:uid=7"

[[feed]]
url = "http://c.example/rss"
cookies = "pass=x"

[[filter]]
pattern = "_h720p\\.mov$"
useragent = "QuickTime/7.6.2"
"#,
        )
        .unwrap();

        assert_eq!(config.download_folder, PathBuf::from("/srv/trailers"));
        assert_eq!(config.statefile, PathBuf::from("/var/lib/reelwatch/state.db"));
        assert_eq!(config.check_interval, Duration::from_secs(7200));
        assert_eq!(config.max_bucket_items, 100);
        assert_eq!(config.prowl_apikey.as_deref(), Some("abc"));

        let ids: Vec<usize> = config.feeds.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(config.feeds[1].url, "http://b.example/rss");
        assert_eq!(config.feeds[1].cookies.as_deref(), Some("uid=7"));
        assert_eq!(config.feeds[2].cookies.as_deref(), Some("pass=x"));

        assert_eq!(config.filters[0].pattern.as_str(), "_h480p\\.mov$");
        assert_eq!(config.filters[0].agent, None);
        assert_eq!(config.filters[1].agent.as_deref(), Some("QuickTime/7.6.2"));
    }

    #[test]
    fn test_missing_feeds_or_filters_is_fatal() {
        let no_filters = r#"urls = ["http://a/rss"]"#;
        assert!(matches!(Config::from_toml(no_filters), Err(ConfigError::NoFilters)));

        let no_feeds = r#"patterns = ["x"]"#;
        assert!(matches!(Config::from_toml(no_feeds), Err(ConfigError::NoFeeds)));

        let blank_feed = r#"urls = ["  "]
patterns = ["x"]"#;
        assert!(matches!(Config::from_toml(blank_feed), Err(ConfigError::NoFeeds)));
    }

    #[test]
    fn test_invalid_pattern_fails_at_load() {
        let content = r#"
urls = ["http://a/rss"]
patterns = ["(unclosed"]
"#;
        match Config::from_toml(content) {
            Err(ConfigError::InvalidPattern { pattern, .. }) => assert_eq!(pattern, "(unclosed"),
            other => panic!("expected invalid pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_capacity_is_unbounded() {
        let config = Config::from_toml(&format!("{}\nmax_bucket_items = -5", MINIMAL)).unwrap();
        assert_eq!(config.max_bucket_items, 0);
    }

    #[test]
    fn test_short_interval_reverts_to_default() {
        let zero = Config::from_toml(&format!("{}\ninterval = 0", MINIMAL)).unwrap();
        assert_eq!(zero.check_interval, Duration::from_secs(1800));

        let seconds = Config::from_toml(&format!("{}\ninterval = \"10s\"", MINIMAL)).unwrap();
        assert_eq!(seconds.check_interval, Duration::from_secs(1800));

        let garbage = Config::from_toml(&format!("{}\ninterval = \"soon\"", MINIMAL)).unwrap();
        assert_eq!(garbage.check_interval, Duration::from_secs(1800));

        let minutes = Config::from_toml(&format!("{}\ninterval = 5", MINIMAL)).unwrap();
        assert_eq!(minutes.check_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let content = format!("{}\nverbose = 3", MINIMAL);
        assert!(matches!(Config::from_toml(&content), Err(ConfigError::Syntax(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, MINIMAL).unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.feeds[0].url, "http://example.com/rss.xml");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(expand_path("relative"), PathBuf::from("relative"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~"), home);
            assert_eq!(expand_path("~/x/y"), home.join("x/y"));
        }
    }
}
