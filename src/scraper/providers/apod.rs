use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::request::{parse_successful_response, UrlBuilder};

use super::*;

const URL_ROOT: &str = "https://api.nasa.gov/planetary/apod";

#[derive(Debug, Deserialize)]
pub struct ApodEntry {
    pub title: String,
    // apod entries that point at embeds sometimes leave this out entirely
    #[serde(default)]
    pub url: String,
    pub media_type: Option<String>,
    pub hdurl: Option<String>,
    pub date: Option<String>,
}

impl From<ApodEntry> for ImageMetadata {
    fn from(entry: ApodEntry) -> Self {
        ImageMetadata {
            title: entry.title,
            url: entry.url,
            media_type: entry.media_type,
        }
    }
}

/// NASA's Astronomy Picture of the Day, asked for random entries with `count`
pub struct ApodFeed {
    pub client: Arc<Client>,
    pub api_key: String,
}

impl ApodFeed {
    pub fn new(client: Arc<Client>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    pub fn request_url(&self, count: usize) -> Result<url::Url, ProviderFailure> {
        Ok(UrlBuilder::default()
            .param("count", count)
            .api_key(&self.api_key)
            .build(URL_ROOT)?)
    }
}

#[async_trait]
impl MetadataSource for ApodFeed {
    fn id(&self) -> AllSources {
        AllSources::NasaApod
    }

    async fn fetch(&self, count: usize) -> Result<Vec<ImageMetadata>, ProviderFailure> {
        let url = self.request_url(count)?;
        debug!("Requesting {} entries from {}", count, self.id());
        let response = self.client.get(url).send().await?;
        let entries = parse_successful_response::<Vec<ApodEntry>>(response).await?;
        Ok(entries.into_iter().map(ImageMetadata::from).collect())
    }
}
