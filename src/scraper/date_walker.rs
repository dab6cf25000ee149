use chrono::NaiveDate;
use itertools::Itertools;
use log::{debug, info};

use crate::scraper::providers::{EarthImagery, ProviderFailure};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DateOrder {
    Chronological,
    ReverseChronological,
}

/// Candidate dates sorted and deduplicated in the requested order
pub fn ordered_dates(candidates: &[NaiveDate], order: DateOrder) -> Vec<NaiveDate> {
    let mut dates = candidates.iter().copied().sorted().dedup().collect::<Vec<_>>();
    if order == DateOrder::ReverseChronological {
        dates.reverse();
    }
    dates
}

/// Walk `candidates` in `order` and stop at the first date that actually has
/// imagery. `None` means none of them did
pub async fn find_first_available_date(
    source: &dyn EarthImagery,
    candidates: &[NaiveDate],
    order: DateOrder,
) -> Result<Option<(NaiveDate, Vec<String>)>, ProviderFailure> {
    for date in ordered_dates(candidates, order) {
        let filenames = source.filenames_for(date).await?;
        if filenames.is_empty() {
            debug!("{} has no imagery for {}", source.id(), date);
            continue;
        }
        return Ok(Some((date, filenames)));
    }
    Ok(None)
}

/// Fully qualified archive urls for the first `limit` filenames of `date`
pub fn archive_urls(
    source: &dyn EarthImagery,
    date: NaiveDate,
    filenames: &[String],
    limit: usize,
) -> Vec<String> {
    filenames
        .iter()
        .take(limit)
        .map(|name| source.archive_url(date, name))
        .collect()
}

/// Urls for the most recent day with earth imagery, or an empty list when the archive
/// has nothing at all
pub async fn latest_earth_images(
    source: &dyn EarthImagery,
    limit: usize,
) -> Result<Vec<String>, ProviderFailure> {
    let dates = source.available_dates().await?;
    match find_first_available_date(source, &dates, DateOrder::ReverseChronological).await? {
        Some((date, filenames)) => {
            info!(
                "Using {} imagery from {} ({} captures)",
                source.id(),
                date,
                filenames.len()
            );
            Ok(archive_urls(source, date, &filenames, limit))
        }
        None => {
            info!("{} has no imagery available", source.id());
            Ok(vec![])
        }
    }
}
