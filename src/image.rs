use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Shortest and longest suffix that still looks like a file extension, `.png` through `.jpeg`
const MIN_EXTENSION_LEN: usize = 2;
const MAX_EXTENSION_LEN: usize = 4;
/// Leaves room for a collision suffix and the extension under the usual 255 byte name limit
const MAX_LABEL_BYTES: usize = 200;
const FALLBACK_LABEL: &str = "untitled";
const FALLBACK_EXTENSION: &str = "jpg";

const VIDEO_EXTENSIONS: [&str; 9] = ["mp4", "mov", "webm", "avi", "mkv", "m4v", "ogv", "wmv", "flv"];

lazy_static! {
    static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(r#"[/\\:*?"<>|\x00-\x1f]+"#).unwrap();
    static ref REPEATED_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    NonImage,
}

/// How strict the url heuristic is when the upstream doesn't tell us the media type
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExtensionPolicy {
    /// Anything with a short alphanumeric suffix looks like a file
    AnySuffix,
    /// Short suffixes, minus the known video containers
    DenyVideo,
}

impl Default for ExtensionPolicy {
    fn default() -> Self {
        ExtensionPolicy::DenyVideo
    }
}

/// A resolved image ready to be downloaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageReference {
    pub label: String,
    pub source_url: String,
    pub media_kind: MediaKind,
}

impl ImageReference {
    pub fn new(label: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source_url: source_url.into(),
            media_kind: MediaKind::Image,
        }
    }

    /// `{label}.{extension}` with the label made safe to use on disk
    pub fn file_name(&self) -> String {
        let extension = file_extension(&self.source_url)
            .map(|ext| ext.to_lowercase())
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_owned());
        format!("{}.{}", sanitize_label(&self.label), extension)
    }
}

/// The last non-empty segment of an absolute url's path. Relative urls and
/// urls that can't carry a path have none
pub fn last_path_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.last()?;
    if segment.is_empty() {
        return None;
    }
    Some(segment.to_owned())
}

/// The suffix after the last dot of the url path's final segment. Query strings
/// and fragments are never considered part of the extension
pub fn file_extension(url: &str) -> Option<String> {
    let segment = last_path_segment(url)?;
    let (stem, extension) = segment.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_owned())
}

fn looks_like_extension(extension: &str) -> bool {
    (MIN_EXTENSION_LEN..=MAX_EXTENSION_LEN).contains(&extension.len())
        && extension.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Decide whether a url points at an image purely by its file extension
pub fn classify_url(url: &str, policy: ExtensionPolicy) -> MediaKind {
    let extension = match file_extension(url) {
        Some(ext) if looks_like_extension(&ext) => ext.to_ascii_lowercase(),
        _ => return MediaKind::NonImage,
    };
    match policy {
        ExtensionPolicy::AnySuffix => MediaKind::Image,
        ExtensionPolicy::DenyVideo if VIDEO_EXTENSIONS.contains(&extension.as_str()) => {
            MediaKind::NonImage
        }
        ExtensionPolicy::DenyVideo => MediaKind::Image,
    }
}

/// Prefer the upstream media type and only guess from the url when it's missing
pub fn classify(url: &str, media_type: Option<&str>, policy: ExtensionPolicy) -> MediaKind {
    match media_type.map(str::trim) {
        Some(kind) if kind.eq_ignore_ascii_case("image") => MediaKind::Image,
        Some(_) => MediaKind::NonImage,
        None => classify_url(url, policy),
    }
}

/// The longest prefix of `text` that fits in `max_bytes` without splitting a character
fn truncate_to_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let end = (0..=max_bytes)
        .rev()
        .find(|index| text.is_char_boundary(*index))
        .unwrap_or(0);
    &text[..end]
}

pub fn sanitize_label(label: &str) -> String {
    let collapsed = REPEATED_WHITESPACE.replace_all(label, " ");
    let replaced = UNSAFE_FILENAME_CHARS.replace_all(&collapsed, "_");
    let trimmed = truncate_to_boundary(replaced.trim().trim_matches('.'), MAX_LABEL_BYTES).trim();
    if trimmed.is_empty() {
        FALLBACK_LABEL.to_owned()
    } else {
        trimmed.to_owned()
    }
}
