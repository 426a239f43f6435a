/// A candidate download extracted from one `<item>` of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedItem {
    pub name: String,
    pub urls: Vec<String>,
}

impl FeedItem {
    /// Items without a name or without any URL are not worth keeping.
    pub fn is_usable(&self) -> bool {
        !self.name.is_empty() && !self.urls.is_empty()
    }
}
