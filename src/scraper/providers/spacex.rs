use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;

use crate::request::parse_successful_response;

use super::*;

const URL_ROOT: &str = "https://api.spacexdata.com/v4/launches";

#[derive(Debug, Deserialize)]
pub struct SpaceXFlickr {
    #[serde(default)]
    pub original: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpaceXLinks {
    pub flickr: Option<SpaceXFlickr>,
}

#[derive(Debug, Deserialize)]
pub struct SpaceXLaunch {
    pub name: Option<String>,
    pub flight_number: Option<u32>,
    pub links: SpaceXLinks,
}

/// Every flickr photo attached to any launch, in launch order
pub fn flickr_links(launches: Vec<SpaceXLaunch>) -> Vec<String> {
    launches
        .into_iter()
        .filter_map(|launch| launch.links.flickr)
        .flat_map(|flickr| flickr.original)
        .collect()
}

/// Pick up to `count` distinct links at random
pub fn choose_links<R: Rng + ?Sized>(links: &[String], count: usize, rng: &mut R) -> Vec<String> {
    let mut unique = links.to_vec();
    unique.sort();
    unique.dedup();
    unique.choose_multiple(rng, count).cloned().collect()
}

pub struct SpaceXLaunches {
    pub client: Arc<Client>,
}

impl SpaceXLaunches {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LaunchGallery for SpaceXLaunches {
    async fn launch_photos(&self) -> Result<Vec<String>, ProviderFailure> {
        let response = self.client.get(URL_ROOT).send().await?;
        let launches = parse_successful_response::<Vec<SpaceXLaunch>>(response).await?;
        let links = flickr_links(launches);
        debug!("{} has {} launch photos", self.id(), links.len());
        Ok(links)
    }
}
