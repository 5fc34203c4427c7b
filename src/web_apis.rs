//! # Third-party web services
//!
//! Read-only lookups used by the `/cat` and `/urban` commands: a random cat
//! picture service, the Urban Dictionary definition API, and plain downloads
//! of the files replies attach.
//!
//! No retries and no pagination; the first page of results is all we use.

use log::{debug, error, info};
use serde::Deserialize;
use serenity::async_trait;
use std::time::Duration;

use crate::config::Config;
use crate::error::CommandError;

pub const DEFAULT_CAT_API_URL: &str = "https://aws.random.cat/meow";
pub const DEFAULT_URBAN_API_URL: &str = "https://api.urbandictionary.com/v0/define";

#[derive(Deserialize, Debug)]
struct CatResponse {
    file: String,
}

#[derive(Deserialize, Debug)]
struct UrbanResponse {
    #[serde(default)]
    list: Vec<Definition>,
}

/// One Urban Dictionary entry
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Definition {
    pub word: String,
    pub permalink: String,
    pub definition: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub thumbs_up: u64,
    #[serde(default)]
    pub thumbs_down: u64,
}

#[async_trait]
pub trait WebApis: Send + Sync {
    /// URL of a random cat picture
    async fn random_cat(&self) -> Result<String, CommandError>;

    /// Definitions of `term`, best match first
    async fn define(&self, term: &str) -> Result<Vec<Definition>, CommandError>;

    /// Raw bytes behind `url`, for uploading as an attachment
    async fn download(&self, url: &str) -> Result<Vec<u8>, CommandError>;
}

#[derive(Clone)]
pub struct HttpWebApis {
    client: reqwest::Client,
    cat_api_url: String,
    urban_api_url: String,
}

impl HttpWebApis {
    pub fn new(
        cat_api_url: impl Into<String>,
        urban_api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CommandError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpWebApis {
            client,
            cat_api_url: cat_api_url.into(),
            urban_api_url: urban_api_url.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, CommandError> {
        Self::new(
            config.cat_api_url.clone(),
            config.urban_api_url.clone(),
            config.http_timeout(),
        )
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        service: &str,
    ) -> Result<T, CommandError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!("{} responded with status {}", service, status);
            return Err(CommandError::transport(format!(
                "{} responded with status {}",
                service, status
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse {} response: {}", service, e);
            CommandError::transport(format!("Failed to parse {} response: {}", service, e))
        })
    }
}

#[async_trait]
impl WebApis for HttpWebApis {
    async fn random_cat(&self) -> Result<String, CommandError> {
        debug!("Requesting a random cat from {}", self.cat_api_url);
        let cat: CatResponse = self
            .get_json(self.client.get(&self.cat_api_url), "random.cat")
            .await?;
        info!("Fetched random cat image");
        Ok(cat.file)
    }

    async fn define(&self, term: &str) -> Result<Vec<Definition>, CommandError> {
        debug!("Looking up '{}' on Urban Dictionary", term);
        let response: UrbanResponse = self
            .get_json(
                self.client.get(&self.urban_api_url).query(&[("term", term)]),
                "Urban Dictionary",
            )
            .await?;
        info!(
            "Urban Dictionary returned {} definitions for '{}'",
            response.list.len(),
            term
        );
        Ok(response.list)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, CommandError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("Download of {} responded with status {}", url, status);
            return Err(CommandError::transport(format!(
                "download of {} responded with status {}",
                url, status
            )));
        }

        let bytes = response.bytes().await?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}
