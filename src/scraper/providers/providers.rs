use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::request::HttpError;

/// One entry of an image-metadata endpoint before it has been validated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub title: String,
    pub url: String,
    /// Not every endpoint exposes this, the url heuristic is used when it's missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

#[derive(Error, Debug)]
pub enum ProviderFailure {
    #[error("Error formatting URL")]
    Url(#[from] url::ParseError),
    #[error("Failed to process response from request")]
    HttpError(HttpError),
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for ProviderFailure {
    fn from(err: reqwest::Error) -> Self {
        ProviderFailure::HttpError(HttpError::ReqwestError(err))
    }
}

impl From<HttpError> for ProviderFailure {
    fn from(err: HttpError) -> Self {
        Self::HttpError(err)
    }
}

#[derive(Display, Debug, Hash, Copy, Clone, Serialize, EnumString, PartialEq, Eq)]
pub enum AllSources {
    #[strum(serialize = "nasa.apod")]
    NasaApod,
    #[strum(serialize = "nasa.epic")]
    NasaEpic,
    #[strum(serialize = "spacex.launches")]
    SpaceXLaunches,
}

/// EPIC publishes two processed variants of the same captures
#[derive(Display, Debug, Hash, Copy, Clone, EnumString, PartialEq, Eq)]
pub enum EpicCollection {
    #[strum(serialize = "natural")]
    Natural,
    #[strum(serialize = "enhanced")]
    Enhanced,
}

/// An endpoint that hands out a requested number of image candidates.
/// The candidates are allowed to contain videos, embeds and other junk
#[async_trait]
pub trait MetadataSource: Sync + Send {
    /// a string that uniquely identifies this source
    fn id(&self) -> AllSources;

    /// Ask the endpoint for `count` entries. The endpoint may return fewer
    async fn fetch(&self, count: usize) -> Result<Vec<ImageMetadata>, ProviderFailure>;
}

/// An archive of earth imagery keyed by capture date
#[async_trait]
pub trait EarthImagery: Sync + Send {
    fn id(&self) -> AllSources {
        AllSources::NasaEpic
    }

    /// Every date the archive has imagery for, in whatever order the api returns them
    async fn available_dates(&self) -> Result<Vec<NaiveDate>, ProviderFailure>;

    /// Bare image names captured on `date`, without host or extension
    async fn filenames_for(&self, date: NaiveDate) -> Result<Vec<String>, ProviderFailure>;

    /// Turn a bare image name into something downloadable
    fn archive_url(&self, date: NaiveDate, filename: &str) -> String;
}

/// A gallery of launch photos, already resolved to direct image urls
#[async_trait]
pub trait LaunchGallery: Sync + Send {
    fn id(&self) -> AllSources {
        AllSources::SpaceXLaunches
    }

    /// Every photo the gallery knows about
    async fn launch_photos(&self) -> Result<Vec<String>, ProviderFailure>;

    /// Up to `count` distinct photos picked at random, so consecutive runs don't
    /// post the same ones
    async fn random_photos(&self, count: usize) -> Result<Vec<String>, ProviderFailure> {
        let links = self.launch_photos().await?;
        Ok(super::spacex::choose_links(
            &links,
            count,
            &mut rand::thread_rng(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn source_ids_parse_back() {
        for source in &[
            AllSources::NasaApod,
            AllSources::NasaEpic,
            AllSources::SpaceXLaunches,
        ] {
            assert_eq!(AllSources::from_str(&source.to_string()).unwrap(), *source);
        }
        assert_eq!(AllSources::SpaceXLaunches.to_string(), "spacex.launches");
        assert!(AllSources::from_str("nasa").is_err());
    }
}
