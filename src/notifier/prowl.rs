use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use url::form_urlencoded;
use url::Url;

use crate::app::{ReelwatchError, Result};
use crate::notifier::{Category, Notifier};

pub const PROWL_API: &str = "https://api.prowlapp.com/publicapi/";
const APPLICATION: &str = "reelwatch";

/// Push notifications through the Prowl API.
pub struct ProwlNotifier {
    client: Client,
    api_key: String,
    base: Url,
}

impl ProwlNotifier {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base(api_key, PROWL_API)
    }

    pub fn with_base(api_key: &str, base: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base: Url::parse(base)?,
        })
    }

    /// Ask Prowl whether the API key is accepted.
    pub async fn verify(&self) -> Result<bool> {
        let mut url = self.base.join("verify")?;
        url.query_pairs_mut().append_pair("apikey", &self.api_key);

        let response = self.client.get(url).send().await?;
        let valid = response.status().is_success();
        if !valid {
            tracing::warn!("Prowl rejected the API key (HTTP {})", response.status());
        }
        Ok(valid)
    }

    /// Form body for the `add` call.
    pub fn add_form(&self, category: Category, message: &str) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("apikey", &self.api_key)
            .append_pair("application", APPLICATION)
            .append_pair("event", category.event())
            .append_pair("description", message)
            .finish()
    }
}

#[async_trait]
impl Notifier for ProwlNotifier {
    async fn notify(&self, category: Category, message: &str) -> Result<()> {
        let url = self.base.join("add")?;
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(self.add_form(category, message))
            .send()
            .await?;

        if response.status().is_success() {
            tracing::debug!("Prowl notification sent: {} - {}", category, message);
            Ok(())
        } else {
            Err(ReelwatchError::Other(format!(
                "Prowl returned HTTP {}",
                response.status()
            )))
        }
    }
}
