use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use log::debug;
use reqwest::Client;
use serde::Deserialize;

use crate::request::{parse_successful_response, UrlBuilder};

use super::*;

const API_ROOT: &str = "https://api.nasa.gov/EPIC/api";
pub const ARCHIVE_ROOT: &str = "https://api.nasa.gov/EPIC/archive";

#[derive(Debug, Deserialize)]
pub struct EpicDate {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct EpicCapture {
    pub image: String,
    pub caption: Option<String>,
}

/// `{archive_base}/{year}/{month}/{day}/png/{filename}.png`
pub fn archive_url(archive_base: &str, date: NaiveDate, filename: &str) -> String {
    format!(
        "{}/{:04}/{:02}/{:02}/png/{}.png",
        archive_base.trim_end_matches('/'),
        date.year(),
        date.month(),
        date.day(),
        filename
    )
}

/// NASA's Earth Polychromatic Imaging Camera, served through api.nasa.gov
pub struct EpicArchive {
    pub client: Arc<Client>,
    pub api_key: String,
    pub collection: EpicCollection,
}

impl EpicArchive {
    pub fn new(client: Arc<Client>, api_key: impl Into<String>, collection: EpicCollection) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            collection,
        }
    }

    fn endpoint(&self, path: &str) -> Result<url::Url, ProviderFailure> {
        let base = format!("{}/{}/{}", API_ROOT, self.collection, path);
        Ok(UrlBuilder::default().api_key(&self.api_key).build(&base)?)
    }

    pub fn archive_base(&self) -> String {
        format!("{}/{}", ARCHIVE_ROOT, self.collection)
    }
}

#[async_trait]
impl EarthImagery for EpicArchive {
    async fn available_dates(&self) -> Result<Vec<NaiveDate>, ProviderFailure> {
        let url = self.endpoint("all")?;
        let response = self.client.get(url).send().await?;
        let dates = parse_successful_response::<Vec<EpicDate>>(response).await?;
        debug!("{} has imagery for {} dates", self.id(), dates.len());
        Ok(dates.into_iter().map(|d| d.date).collect())
    }

    async fn filenames_for(&self, date: NaiveDate) -> Result<Vec<String>, ProviderFailure> {
        let url = self.endpoint(&format!("date/{}", date.format("%Y-%m-%d")))?;
        let response = self.client.get(url).send().await?;
        let captures = parse_successful_response::<Vec<EpicCapture>>(response).await?;
        Ok(captures.into_iter().map(|capture| capture.image).collect())
    }

    fn archive_url(&self, date: NaiveDate, filename: &str) -> String {
        archive_url(&self.archive_base(), date, filename)
    }
}
