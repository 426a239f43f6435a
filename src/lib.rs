//! # reelwatch
//!
//! A background daemon that polls RSS feeds and downloads every matching
//! item exactly once.
//!
//! ## Architecture
//!
//! Each check cycle runs the feeds one after another through a pipeline:
//!
//! ```text
//! Fetcher → Extractor → Filters → Bucket / disk check → Download → Store
//! ```
//!
//! - [`fetcher`]: HTTP client with growable response buffers
//! - [`extractor`]: Strict XML parsing with a lenient fallback
//! - [`domain`]: Filters and the bounded download history
//! - [`store`]: SQLite persistence of the download history
//!
//! ## Quick Start
//!
//! ```bash
//! # Check all feeds once, in the foreground, with debug output
//! reelwatch -f -o -v 2
//!
//! # Try the filters against a saved feed
//! reelwatch -x trailers.xml
//!
//! # Run in the background
//! reelwatch -c ~/.config/reelwatch/config.toml -l ~/reelwatch.log
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Session state and error types
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration
//! - [`daemon`]: Check loop, signals and detaching
//! - [`domain`]: Core domain models (Feed, Filter, FeedItem, Bucket)
//! - [`extractor`]: Feed item extraction
//! - [`fetcher`]: HTTP fetching and downloading
//! - [`notifier`]: Push notifications
//! - [`pipeline`]: Per-feed processing
//! - [`store`]: Database persistence

/// Session state and error handling.
///
/// The [`Session`](app::Session) struct holds the configuration, the feeds,
/// the filters and the download history together with its store.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/reelwatch/config.toml`, supporting:
/// - Feeds with optional cookies
/// - URL filters with optional user agents
/// - Check interval, history size and Prowl API key
pub mod config;

/// Background daemon.
///
/// Runs the check loop until SIGINT/SIGTERM, or once with `-o`/`-x`.
pub mod daemon;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): Feed URL, cookies and TTL
/// - [`Filter`](domain::Filter): Compiled URL pattern with user agent
/// - [`FeedItem`](domain::FeedItem): Named item with candidate URLs
/// - [`Bucket`](domain::Bucket): Bounded most-recent-first download history
pub mod domain;

/// Feed item extraction from RSS/XML, tolerant of malformed markup.
pub mod extractor;

/// HTTP fetching and downloading.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feeds and downloads
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`ResponseBuffer`](fetcher::buffer::ResponseBuffer): Doubling response buffer
pub mod fetcher;

/// Push notifications.
///
/// - [`Notifier`](notifier::Notifier): Async trait for notification backends
/// - [`ProwlNotifier`](notifier::ProwlNotifier): Prowl API implementation
pub mod notifier;

/// Feed processing: fetch, extract, filter, dedupe and download.
pub mod pipeline;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
