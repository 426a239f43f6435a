use std::collections::VecDeque;

/// Download history, most recent entry first.
///
/// The bucket never deduplicates on insert; callers check
/// [`has_been_downloaded`](Bucket::has_been_downloaded) before downloading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    entries: VecDeque<String>,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact string comparison against every stored URL.
    pub fn has_been_downloaded(&self, url: &str) -> bool {
        self.entries.iter().any(|e| e == url)
    }

    /// Put `identifier` at the front. With a non-zero `capacity`, the
    /// oldest entry is dropped once the bucket grows past it.
    pub fn add(&mut self, identifier: &str, capacity: usize) {
        self.entries.push_front(identifier.to_string());
        if capacity > 0 && self.entries.len() > capacity {
            if let Some(evicted) = self.entries.pop_back() {
                tracing::debug!("Bucket over capacity ({}), evicted {}", capacity, evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl FromIterator<String> for Bucket {
    /// Builds a bucket from entries already ordered most recent first.
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
