pub mod sqlite;

use crate::app::Result;
use crate::domain::Bucket;

pub use sqlite::SqliteStore;

/// Persistence for the download history.
pub trait Store {
    /// Load the stored bucket; an empty store yields an empty bucket.
    fn load_bucket(&self) -> Result<Bucket>;
    /// Replace the stored bucket with `bucket`, atomically.
    fn save_bucket(&self, bucket: &Bucket) -> Result<()>;
}
