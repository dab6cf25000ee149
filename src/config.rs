use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenv::dotenv;
use thiserror::Error;

use crate::dispatcher::SendMethod;
use crate::request::DEFAULT_USER_AGENT;
use crate::scraper::EpicCollection;

const DEFAULT_NASA_API_KEY: &str = "DEMO_KEY";
/// One batch a day
const DEFAULT_POSTING_DELAY_SECS: u64 = 60 * 60 * 24;
const DEFAULT_SPACEX_IMAGE_COUNT: usize = 3;
const DEFAULT_EPIC_IMAGE_COUNT: usize = 3;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 1;
const DEFAULT_IMAGES_DIR: &str = "./images";
/// APOD refuses batches larger than this
pub const MAX_APOD_IMAGE_COUNT: usize = 100;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    Missing(&'static str),
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Everything the run loop needs, read once at startup and passed down explicitly
#[derive(Debug, Clone)]
pub struct Config {
    pub nasa_api_key: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub posting_delay: Duration,
    /// `None` lets the resolver fall back to its own default
    pub apod_image_count: Option<usize>,
    pub spacex_image_count: usize,
    pub epic_image_count: usize,
    pub epic_collection: EpicCollection,
    pub images_dir: PathBuf,
    pub user_agent: String,
    pub http_timeout_secs: u64,
    pub send_method: SendMethod,
    pub download_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let posting_delay_secs: u64 =
            parse_or(&get, "IMAGE_POSTING_DELAY_TIME", DEFAULT_POSTING_DELAY_SECS)?;
        if posting_delay_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "IMAGE_POSTING_DELAY_TIME",
                value: "0".to_owned(),
            });
        }
        let apod_image_count = match get("NUMBER_OF_APOD_IMAGES") {
            None => None,
            Some(value) => {
                let count = parse_value::<usize>("NUMBER_OF_APOD_IMAGES", &value)?;
                if count > MAX_APOD_IMAGE_COUNT {
                    return Err(ConfigError::Invalid {
                        key: "NUMBER_OF_APOD_IMAGES",
                        value,
                    });
                }
                Some(count).filter(|count| *count > 0)
            }
        };

        Ok(Config {
            nasa_api_key: get("NASA_API_KEY").unwrap_or_else(|| DEFAULT_NASA_API_KEY.to_owned()),
            telegram_token: required("TELEGRAM_BOT_TOKEN")?,
            telegram_chat_id: required("TELEGRAM_CHAT_ID")?,
            posting_delay: Duration::from_secs(posting_delay_secs),
            apod_image_count,
            spacex_image_count: parse_or(&get, "SPACEX_IMAGE_COUNT", DEFAULT_SPACEX_IMAGE_COUNT)?,
            epic_image_count: parse_or(&get, "EPIC_IMAGE_COUNT", DEFAULT_EPIC_IMAGE_COUNT)?,
            epic_collection: parse_or(&get, "EPIC_COLLECTION", EpicCollection::Natural)?,
            images_dir: get("IMAGES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGES_DIR)),
            user_agent: get("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
            http_timeout_secs: parse_or(&get, "HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            send_method: parse_or(&get, "TELEGRAM_SEND_AS", SendMethod::Photo)?,
            download_concurrency: parse_or(
                &get,
                "DOWNLOAD_CONCURRENCY",
                DEFAULT_DOWNLOAD_CONCURRENCY,
            )?
            .max(1),
        })
    }

    pub fn posting_delay_hours(&self) -> f64 {
        self.posting_delay.as_secs_f64() / 3600f64
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_owned(),
    })
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&'static str) -> Option<String>,
{
    match get(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}
