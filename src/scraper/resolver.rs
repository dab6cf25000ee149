use log::{debug, info, warn};

use crate::image::{classify, ExtensionPolicy, ImageReference, MediaKind};
use crate::scraper::providers::{ImageMetadata, MetadataSource, ProviderFailure};

/// Used whenever the caller doesn't ask for a specific amount
pub const DEFAULT_IMAGE_COUNT: usize = 5;

/// How many times a single missing slot is re-requested before giving up on it
pub const SINGLE_ITEM_ATTEMPTS: u8 = 5;

/// Validated images keyed by label. Insertion order is kept, a label that shows
/// up again replaces the earlier url in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionResult {
    references: Vec<ImageReference>,
}

impl ResolutionResult {
    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&ImageReference> {
        self.references.iter().find(|r| r.label == label)
    }

    pub fn references(&self) -> &[ImageReference] {
        &self.references
    }

    pub fn into_references(self) -> Vec<ImageReference> {
        self.references
    }

    /// Insert a reference unless doing so would push the result past `limit`
    /// unique labels. Returns whether it was kept
    fn insert_bounded(&mut self, reference: ImageReference, limit: usize) -> bool {
        if let Some(existing) = self
            .references
            .iter_mut()
            .find(|r| r.label == reference.label)
        {
            *existing = reference;
            return true;
        }
        if self.references.len() >= limit {
            return false;
        }
        self.references.push(reference);
        true
    }
}

fn validate(metadata: ImageMetadata, policy: ExtensionPolicy) -> Option<ImageReference> {
    match classify(&metadata.url, metadata.media_type.as_deref(), policy) {
        MediaKind::Image => Some(ImageReference::new(metadata.title, metadata.url)),
        MediaKind::NonImage => {
            debug!("Skipping non-image entry {:?} ({})", metadata.title, metadata.url);
            None
        }
    }
}

/// Keep asking for one item at a time until an image turns up or the attempts
/// run out. Request failures count as a spent attempt and are not propagated
async fn resolve_single(
    source: &dyn MetadataSource,
    policy: ExtensionPolicy,
) -> Option<ImageReference> {
    for attempt in 1..=SINGLE_ITEM_ATTEMPTS {
        match source.fetch(1).await {
            Ok(items) => {
                if let Some(reference) = items
                    .into_iter()
                    .find_map(|metadata| validate(metadata, policy))
                {
                    return Some(reference);
                }
            }
            Err(err) => {
                warn!(
                    "Attempt {}/{} against {} failed: {}",
                    attempt,
                    SINGLE_ITEM_ATTEMPTS,
                    source.id(),
                    err
                );
            }
        }
    }
    warn!(
        "Gave up on finding an image from {} after {} attempts",
        source.id(),
        SINGLE_ITEM_ATTEMPTS
    );
    None
}

/// Resolve up to `desired_count` image references from `source`.
///
/// One batch request is made for the full amount. Everything in it that isn't an image
/// is dropped and each missing slot is then topped up with its own single-item request.
/// Coming up short is not an error, only a failing batch request is.
pub async fn resolve_batch(
    source: &dyn MetadataSource,
    desired_count: Option<usize>,
    policy: ExtensionPolicy,
) -> Result<ResolutionResult, ProviderFailure> {
    let desired_count = desired_count
        .filter(|count| *count > 0)
        .unwrap_or(DEFAULT_IMAGE_COUNT);
    let mut result = ResolutionResult::default();

    for metadata in source.fetch(desired_count).await? {
        if let Some(reference) = validate(metadata, policy) {
            result.insert_bounded(reference, desired_count);
        }
    }

    let shortfall = desired_count.saturating_sub(result.len());
    if shortfall > 0 {
        info!(
            "{} returned {} usable images out of {}, topping up {}",
            source.id(),
            result.len(),
            desired_count,
            shortfall
        );
    }
    for _ in 0..shortfall {
        if let Some(reference) = resolve_single(source, policy).await {
            result.insert_bounded(reference, desired_count);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::scraper::providers::AllSources;

    /// Replays canned responses and records the count of every request
    struct ScriptedSource {
        batch: Mutex<Option<Result<Vec<ImageMetadata>, ProviderFailure>>>,
        singles: Mutex<VecDeque<Result<Vec<ImageMetadata>, ProviderFailure>>>,
        requests: Mutex<Vec<usize>>,
    }

    impl ScriptedSource {
        fn new(
            batch: Vec<ImageMetadata>,
            singles: Vec<Result<Vec<ImageMetadata>, ProviderFailure>>,
        ) -> Self {
            Self {
                batch: Mutex::new(Some(Ok(batch))),
                singles: Mutex::new(singles.into()),
                requests: Mutex::new(vec![]),
            }
        }

        fn failing() -> Self {
            Self {
                batch: Mutex::new(Some(Err(ProviderFailure::Other("503".to_owned())))),
                singles: Mutex::new(VecDeque::new()),
                requests: Mutex::new(vec![]),
            }
        }

        fn requests(&self) -> Vec<usize> {
            self.requests.lock().unwrap().clone()
        }

        fn single_requests(&self) -> usize {
            self.requests().iter().skip(1).filter(|c| **c == 1).count()
        }
    }

    #[async_trait]
    impl MetadataSource for ScriptedSource {
        fn id(&self) -> AllSources {
            AllSources::NasaApod
        }

        async fn fetch(&self, count: usize) -> Result<Vec<ImageMetadata>, ProviderFailure> {
            let first = self.requests.lock().unwrap().is_empty();
            self.requests.lock().unwrap().push(count);
            if first {
                if let Some(batch) = self.batch.lock().unwrap().take() {
                    return batch;
                }
            }
            // an exhausted script behaves like an endpoint that only serves videos
            self.singles
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(vec![video("rerun")]))
        }
    }

    fn image(title: &str) -> ImageMetadata {
        ImageMetadata {
            title: title.to_owned(),
            url: format!("https://apod.nasa.gov/apod/image/{}.jpg", title),
            media_type: Some("image".to_owned()),
        }
    }

    fn video(title: &str) -> ImageMetadata {
        ImageMetadata {
            title: title.to_owned(),
            url: format!("https://www.youtube.com/embed/{}?rel=0", title),
            media_type: Some("video".to_owned()),
        }
    }

    fn untyped(title: &str, url: &str) -> ImageMetadata {
        ImageMetadata {
            title: title.to_owned(),
            url: url.to_owned(),
            media_type: None,
        }
    }

    #[tokio::test]
    async fn full_batch_needs_no_top_up() {
        let source = ScriptedSource::new((0..5).map(|i| image(&i.to_string())).collect(), vec![]);
        let result = resolve_batch(&source, Some(5), ExtensionPolicy::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(source.requests(), vec![5]);
        assert!(result
            .references()
            .iter()
            .all(|r| r.media_kind == MediaKind::Image));
    }

    #[tokio::test]
    async fn oversized_batch_is_capped() {
        let source = ScriptedSource::new((0..8).map(|i| image(&i.to_string())).collect(), vec![]);
        let result = resolve_batch(&source, Some(3), ExtensionPolicy::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 3);
        assert_eq!(source.requests(), vec![3]);
    }

    #[tokio::test]
    async fn all_videos_trigger_one_top_up_per_slot() {
        let source = ScriptedSource::new(
            (0..4).map(|i| video(&i.to_string())).collect(),
            (0..4).map(|i| Ok(vec![image(&format!("single{}", i))])).collect(),
        );
        let result = resolve_batch(&source, Some(4), ExtensionPolicy::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(source.requests(), vec![4, 1, 1, 1, 1]);
        assert_eq!(source.single_requests(), 4);
    }

    #[tokio::test]
    async fn shortfall_is_topped_up_until_full() {
        let batch = vec![
            image("a"),
            video("b"),
            image("c"),
            untyped("d", "https://example.com/clip.mp4"),
            untyped("e", "https://example.com/page"),
        ];
        let singles = vec![
            Ok(vec![image("f")]),
            Ok(vec![image("g")]),
            Ok(vec![image("h")]),
        ];
        let source = ScriptedSource::new(batch, singles);
        let result = resolve_batch(&source, Some(5), ExtensionPolicy::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(source.single_requests(), 3);
        let labels = result
            .references()
            .iter()
            .map(|r| r.label.as_str())
            .collect::<Vec<_>>();
        assert_eq!(labels, vec!["a", "c", "f", "g", "h"]);
    }

    #[tokio::test]
    async fn exhausted_slot_reduces_the_count() {
        let batch = vec![image("a"), video("b"), image("c"), video("d"), video("e")];
        let mut singles = vec![Ok(vec![image("f")]), Ok(vec![image("g")])];
        singles.extend((0..SINGLE_ITEM_ATTEMPTS).map(|_| Ok(vec![video("nope")])));
        let source = ScriptedSource::new(batch, singles);
        let result = resolve_batch(&source, Some(5), ExtensionPolicy::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(
            source.single_requests(),
            2 + SINGLE_ITEM_ATTEMPTS as usize
        );
    }

    #[tokio::test]
    async fn retry_slot_recovers_within_its_budget() {
        let singles = vec![
            Err(ProviderFailure::Other("timeout".to_owned())),
            Ok(vec![video("v")]),
            Ok(vec![]),
            Ok(vec![image("late")]),
        ];
        let source = ScriptedSource::new(vec![], singles);
        let result = resolve_batch(&source, Some(1), ExtensionPolicy::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.get("late").is_some());
        assert_eq!(source.requests(), vec![1, 1, 1, 1, 1]);
    }

    #[tokio::test]
    async fn nothing_found_is_not_an_error() {
        let source = ScriptedSource::new(vec![video("a"), video("b")], vec![]);
        let result = assert_ok!(resolve_batch(&source, Some(2), ExtensionPolicy::default()).await);
        assert!(result.is_empty());
        assert_eq!(
            source.single_requests(),
            2 * SINGLE_ITEM_ATTEMPTS as usize
        );
    }

    #[tokio::test]
    async fn failing_batch_propagates() {
        let source = ScriptedSource::failing();
        assert_err!(resolve_batch(&source, Some(3), ExtensionPolicy::default()).await);
        assert_eq!(source.requests(), vec![3]);
    }

    #[tokio::test]
    async fn missing_or_zero_count_uses_default() {
        for desired in [None, Some(0), Some(DEFAULT_IMAGE_COUNT)] {
            let source = ScriptedSource::new(
                (0..DEFAULT_IMAGE_COUNT)
                    .map(|i| image(&i.to_string()))
                    .collect(),
                vec![],
            );
            let result = resolve_batch(&source, desired, ExtensionPolicy::default())
                .await
                .unwrap();
            assert_eq!(source.requests(), vec![DEFAULT_IMAGE_COUNT]);
            assert_eq!(result.len(), DEFAULT_IMAGE_COUNT);
        }
    }

    #[tokio::test]
    async fn later_duplicate_title_wins() {
        let mut second = image("Orion");
        second.url = "https://apod.nasa.gov/apod/image/orion_wide.jpg".to_owned();
        let source = ScriptedSource::new(
            vec![image("Orion"), second],
            vec![Ok(vec![image("Vega")])],
        );
        let result = resolve_batch(&source, Some(2), ExtensionPolicy::default())
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(
            result.get("Orion").unwrap().source_url,
            "https://apod.nasa.gov/apod/image/orion_wide.jpg"
        );
        assert_eq!(source.single_requests(), 1);
    }

    #[tokio::test]
    async fn result_never_exceeds_request() {
        for desired in 1..=6usize {
            let batch = (0..desired)
                .map(|i| {
                    if i % 2 == 0 {
                        image(&i.to_string())
                    } else {
                        video(&i.to_string())
                    }
                })
                .collect();
            let singles = (0..desired)
                .map(|i| Ok(vec![image(&format!("s{}", i)), image(&format!("t{}", i))]))
                .collect();
            let source = ScriptedSource::new(batch, singles);
            let result = resolve_batch(&source, Some(desired), ExtensionPolicy::default())
                .await
                .unwrap();
            assert!(result.len() <= desired);
        }
    }

    #[tokio::test]
    async fn extension_heuristic_applies_without_media_type() {
        let batch = vec![
            untyped("jpg", "https://example.com/foo.jpg"),
            untyped("mp4", "https://example.com/foo.mp4"),
        ];
        let any = ScriptedSource::new(batch.clone(), vec![]);
        let result = resolve_batch(&any, Some(2), ExtensionPolicy::AnySuffix)
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(any.requests(), vec![2]);

        let deny = ScriptedSource::new(batch, vec![Ok(vec![image("x")])]);
        let result = resolve_batch(&deny, Some(2), ExtensionPolicy::DenyVideo)
            .await
            .unwrap();
        assert!(result.get("mp4").is_none());
        assert_eq!(result.len(), 2);
    }
}
