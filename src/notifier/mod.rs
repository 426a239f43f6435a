pub mod prowl;

use std::fmt;

use async_trait::async_trait;

use crate::app::Result;

pub use prowl::ProwlNotifier;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    NewItem,
    DownloadFailed,
}

impl Category {
    pub fn event(&self) -> &'static str {
        match self {
            Category::NewItem => "New download",
            Category::DownloadFailed => "Download failed",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event())
    }
}

#[async_trait]
pub trait Notifier {
    async fn notify(&self, category: Category, message: &str) -> Result<()>;
}

/// Send a notification without letting a failure escape.
pub async fn send(notifier: Option<&(dyn Notifier + Send + Sync)>, category: Category, message: &str) {
    if let Some(notifier) = notifier {
        if let Err(e) = notifier.notify(category, message).await {
            tracing::warn!("Notification '{}' failed: {}", category, e);
        }
    }
}
