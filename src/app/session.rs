use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::Result;
use crate::config::Config;
use crate::domain::{Bucket, Feed, Filter};
use crate::store::{SqliteStore, Store};

/// Process-wide daemon state: configuration, feeds, filters and the
/// download history together with its store.
pub struct Session {
    pub download_folder: PathBuf,
    pub statefile: PathBuf,
    pub check_interval: Duration,
    /// Live bucket capacity; grows during the first pass. 0 is unbounded.
    pub max_bucket_items: usize,
    pub prowl_apikey: Option<String>,
    pub feeds: Vec<Feed>,
    pub filters: Vec<Filter>,
    pub bucket: Bucket,
    dirty: bool,
    store: Box<dyn Store + Send + Sync>,
}

impl Session {
    /// Open the state file named in `config` and load the bucket from it.
    ///
    /// An unusable state file is not fatal: it is moved aside and a fresh
    /// one is started. If that fails too, the history lives in memory only.
    pub fn open(config: Config) -> Result<Self> {
        if let Err(e) = std::fs::create_dir_all(&config.download_folder) {
            tracing::warn!(
                "Cannot create download folder {}: {}",
                config.download_folder.display(),
                e
            );
        }
        let store = open_store(&config.statefile)?;
        Ok(Self::with_store(config, store))
    }

    /// Build a session on `store`. A bucket that cannot be loaded starts
    /// out empty.
    pub fn with_store(config: Config, store: Box<dyn Store + Send + Sync>) -> Self {
        let bucket = store.load_bucket().unwrap_or_else(|e| {
            tracing::error!(
                "Cannot read download history from {}: {}",
                config.statefile.display(),
                e
            );
            Bucket::new()
        });
        tracing::debug!("Loaded {} entries from the download history", bucket.len());

        Self {
            download_folder: config.download_folder,
            statefile: config.statefile,
            check_interval: config.check_interval,
            max_bucket_items: config.max_bucket_items,
            prowl_apikey: config.prowl_apikey,
            feeds: config.feeds,
            filters: config.filters,
            bucket,
            dirty: false,
            store,
        }
    }

    /// Unsaved bucket changes exist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Raise a bounded capacity by `item_count`. An unbounded bucket stays
    /// unbounded.
    pub fn grow_capacity(&mut self, item_count: usize) {
        if self.max_bucket_items == 0 {
            return;
        }
        self.max_bucket_items = self.max_bucket_items.saturating_add(item_count);
        tracing::trace!("History bucket size changed: {}", self.max_bucket_items);
    }

    /// Remember a finished download and write the history through.
    pub fn record_download(&mut self, url: &str) {
        self.bucket.add(url, self.max_bucket_items);
        self.dirty = true;
        self.persist();
    }

    /// Save the bucket. On failure the session stays dirty, so the next
    /// change or the shutdown retries.
    pub fn persist(&mut self) -> bool {
        match self.store.save_bucket(&self.bucket) {
            Ok(()) => {
                self.dirty = false;
                true
            }
            Err(e) => {
                tracing::error!(
                    "Failed to save download history to {}: {}",
                    self.statefile.display(),
                    e
                );
                false
            }
        }
    }

    /// Final save before exit, if anything is pending.
    pub fn shutdown(&mut self) {
        if self.dirty {
            tracing::info!("Saving download history before shutdown");
            self.persist();
        }
    }
}

fn open_store(statefile: &Path) -> Result<Box<dyn Store + Send + Sync>> {
    let error = match SqliteStore::new(statefile) {
        Ok(store) => return Ok(Box::new(store)),
        Err(e) => e,
    };
    tracing::error!("Cannot open state file {}: {}", statefile.display(), error);

    if statefile.is_file() {
        let mut aside = statefile.as_os_str().to_owned();
        aside.push(".corrupt");
        let aside = PathBuf::from(aside);

        match std::fs::rename(statefile, &aside) {
            Ok(()) => {
                tracing::warn!("Moved unreadable state file to {}", aside.display());
                match SqliteStore::new(statefile) {
                    Ok(store) => return Ok(Box::new(store)),
                    Err(e) => tracing::error!("Cannot create state file {}: {}", statefile.display(), e),
                }
            }
            Err(e) => tracing::error!("Cannot move {} aside: {}", statefile.display(), e),
        }
    }

    tracing::error!("Download history will not be saved this session");
    Ok(Box::new(SqliteStore::in_memory()?))
}
