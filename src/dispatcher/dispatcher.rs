use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use log::{error, info, warn};
use thiserror::Error;

use crate::request::HttpError;
use crate::scheduler::{send_pacer, wait_send_turn};

/// Time between two sends, keeps the bot clear of flood control
const SEND_INTERVAL: Duration = Duration::from_secs(3);
/// How long to back off once flood control kicks in anyway
const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum DeliveryFailure {
    #[error("Flood control triggered")]
    RateLimited { retry_after: Option<Duration> },
    #[error("{0:?} does not exist")]
    MissingFile(PathBuf),
    #[error("Couldn't read file")]
    Io(#[from] io::Error),
    #[error("Failed to deliver")]
    Http(#[from] HttpError),
    #[error("Rejected with {code}: {description}")]
    Rejected { code: u16, description: String },
}

impl From<reqwest::Error> for DeliveryFailure {
    fn from(err: reqwest::Error) -> Self {
        DeliveryFailure::Http(HttpError::ReqwestError(err))
    }
}

/// Anything that can post text and files into the destination chat
#[async_trait]
pub trait Messenger: Sync + Send {
    async fn send_text(&self, text: &str) -> Result<(), DeliveryFailure>;
    async fn send_file(&self, path: &Path) -> Result<(), DeliveryFailure>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    pub send_interval: Duration,
    pub cooldown: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            send_interval: SEND_INTERVAL,
            cooldown: RATE_LIMIT_COOLDOWN,
        }
    }
}

impl DeliveryPolicy {
    /// The fixed cooldown, stretched if the api asked for a longer wait
    pub fn cooldown_for(&self, retry_after: Option<Duration>) -> Duration {
        retry_after.map_or(self.cooldown, |wait| wait.max(self.cooldown))
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Send `files` one at a time. Files that vanished are skipped. When flood control
/// hits, the loop cools down and retries the same file once before moving on
pub async fn deliver_files(
    messenger: &dyn Messenger,
    files: &[PathBuf],
    policy: &DeliveryPolicy,
) -> DeliveryReport {
    let pacer = send_pacer(policy.send_interval);
    let mut report = DeliveryReport::default();

    for file in files {
        wait_send_turn(&pacer).await;
        let outcome = match messenger.send_file(file).await {
            Err(DeliveryFailure::RateLimited { retry_after }) => {
                let cooldown = policy.cooldown_for(retry_after);
                warn!(
                    "Flood control triggered. Waiting {}s before retrying {}",
                    cooldown.as_secs_f32(),
                    file.display()
                );
                tokio::time::sleep(cooldown).await;
                messenger.send_file(file).await
            }
            other => other,
        };
        match outcome {
            Ok(()) => report.sent.push(file.clone()),
            Err(DeliveryFailure::MissingFile(_)) => {
                warn!("Skipping {}, it no longer exists", file.display());
                report.skipped.push(file.clone());
            }
            Err(err) => {
                error!("Couldn't deliver {}: {} ({:?})", file.display(), err, err);
                report.failed.push(file.clone());
            }
        }
    }

    info!(
        "Delivered {} files ({} skipped, {} failed)",
        report.sent.len(),
        report.skipped.len(),
        report.failed.len()
    );
    report
}

/// Post a plain message. Failing to greet never stops a delivery
pub async fn announce(messenger: &dyn Messenger, text: &str) -> bool {
    match messenger.send_text(text).await {
        Ok(()) => true,
        Err(err) => {
            warn!("Couldn't send message {:?}: {}", text, err);
            false
        }
    }
}
