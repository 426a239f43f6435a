pub mod bucket;
pub mod feed;
pub mod filter;
pub mod item;

pub use bucket::Bucket;
pub use feed::Feed;
pub use filter::{match_url, Filter};
pub use item::FeedItem;
