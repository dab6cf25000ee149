use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use futures::{stream, StreamExt};
use log::{debug, error, info, warn};
use reqwest::Client;
use thiserror::Error;
use tokio::fs;

use crate::image::{last_path_segment, ImageReference};
use crate::request::{HttpError, ResponseErrorContext};

#[derive(Error, Debug)]
pub enum FetchFailure {
    #[error("Failed to download picture")]
    Http(#[from] HttpError),
    #[error("Failed to save picture")]
    Io(#[from] io::Error),
}

impl From<reqwest::Error> for FetchFailure {
    fn from(err: reqwest::Error) -> Self {
        FetchFailure::Http(HttpError::ReqwestError(err))
    }
}

/// A single picture to fetch and where it ends up on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub url: String,
    pub path: PathBuf,
    /// Extra query parameters, the EPIC archive wants an api key on every image
    pub query: Vec<(String, String)>,
}

/// The final path segment of a url, query and fragment excluded
pub fn file_name_from_url(url: &str) -> Option<String> {
    last_path_segment(url)
}

/// `dir/name`, or `dir/{stem}-{n}.{ext}` when an earlier download already took that path
fn claim_path(dir: &Path, name: &str, taken: &mut HashSet<PathBuf>) -> PathBuf {
    let path = dir.join(name);
    if taken.insert(path.clone()) {
        return path;
    }
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (name, None),
    };
    (1usize..)
        .map(|n| match extension {
            Some(extension) => dir.join(format!("{}-{}.{}", stem, n, extension)),
            None => dir.join(format!("{}-{}", stem, n)),
        })
        .find(|candidate| taken.insert(candidate.clone()))
        .unwrap_or(path)
}

/// Different labels can sanitize to the same file name, every reference still
/// gets a path of its own
pub fn downloads_for_references(references: &[ImageReference], dir: &Path) -> Vec<Download> {
    let mut taken = HashSet::new();
    references
        .iter()
        .map(|reference| Download {
            url: reference.source_url.clone(),
            path: claim_path(dir, &reference.file_name(), &mut taken),
            query: vec![],
        })
        .collect()
}

/// Plain urls keep their own file names. `prefix{n}.jpg` is used for urls without one
pub fn downloads_for_urls(
    urls: &[String],
    dir: &Path,
    prefix: &str,
    query: &[(String, String)],
) -> Vec<Download> {
    let mut taken = HashSet::new();
    urls.iter()
        .enumerate()
        .map(|(number, url)| {
            let name =
                file_name_from_url(url).unwrap_or_else(|| format!("{}{}.jpg", prefix, number));
            Download {
                url: url.clone(),
                path: claim_path(dir, &name, &mut taken),
                query: query.to_vec(),
            }
        })
        .collect()
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(".part");
    path.with_file_name(name)
}

/// Write `content` next to `path` first and move it into place once it's complete,
/// a failed save never leaves a truncated picture behind
pub async fn save_picture(path: &Path, content: &[u8]) -> io::Result<()> {
    let partial = partial_path(path);
    let saved = match fs::write(&partial, content).await {
        Ok(()) => fs::rename(&partial, path).await,
        Err(err) => Err(err),
    };
    if saved.is_err() {
        if let Err(err) = fs::remove_file(&partial).await {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("Couldn't clean up {}: {}", partial.display(), err);
            }
        }
    }
    saved
}

pub async fn fetch_picture(client: &Client, download: &Download) -> Result<PathBuf, FetchFailure> {
    let mut request = client.get(&download.url);
    if !download.query.is_empty() {
        request = request.query(&download.query);
    }
    let response = request.send().await?;
    let code = response.status();
    if !code.is_success() {
        let body = response.text().await?;
        return Err(HttpError::FailStatus(ResponseErrorContext { body, code }).into());
    }
    let content = response.bytes().await?;
    save_picture(&download.path, &content).await?;
    debug!("Saved {} to {}", download.url, download.path.display());
    Ok(download.path.clone())
}

/// Fetch every download, at most `concurrency` at a time. A failed download is
/// logged and left out of the returned paths, it never stops the others
pub async fn fetch_pictures(
    client: &Client,
    downloads: Vec<Download>,
    concurrency: usize,
) -> Vec<PathBuf> {
    let total = downloads.len();
    let saved = stream::iter(downloads)
        .map(|download| async move {
            match fetch_picture(client, &download).await {
                Ok(path) => Some(path),
                Err(err) => {
                    error!("Couldn't fetch {}: {} ({:?})", download.url, err, err);
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .filter_map(|path| async move { path })
        .collect::<Vec<_>>()
        .await;
    info!("Saved {}/{} pictures", saved.len(), total);
    saved
}

/// `root/{date}`, shared by everything fetched on the same day
pub async fn make_day_dir<Tz: TimeZone>(root: &Path, now: &DateTime<Tz>) -> io::Result<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    let dir = root.join(now.format("%Y-%m-%d").to_string());
    fs::create_dir_all(&dir).await?;
    Ok(dir)
}

/// `root/{date}/{time}`, one per cycle
pub async fn make_working_dir<Tz: TimeZone>(root: &Path, now: &DateTime<Tz>) -> io::Result<PathBuf>
where
    Tz::Offset: std::fmt::Display,
{
    let dir = make_day_dir(root, now)
        .await?
        .join(now.format("%H-%M-%S").to_string());
    fs::create_dir_all(&dir).await?;
    Ok(dir)
}

/// Regular files directly inside `dir`, sorted by name
pub async fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut files = vec![];
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}
