use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use log::{error, info, warn};
use reqwest::Client;

use crate::config::Config;
use crate::dispatcher::{
    announce, deliver_files, DeliveryPolicy, DeliveryReport, Messenger, TelegramBot,
};
use crate::fetcher::{
    downloads_for_references, downloads_for_urls, fetch_pictures, make_day_dir, make_working_dir,
    Download,
};
use crate::image::ExtensionPolicy;
use crate::request::build_client;
use crate::scraper::date_walker::latest_earth_images;
use crate::scraper::resolver::resolve_batch;
use crate::scraper::{
    ApodFeed, EarthImagery, EpicArchive, LaunchGallery, MetadataSource, SpaceXLaunches,
};

const STARTUP_GREETING: &str = "Hey there! Some Earth and SpaceX photos to start with";
const CYCLE_GREETING: &str = "Hey again! Your daily bunch of NASA pictures. Enjoy!";

/// Everything a cycle needs, owned by the loop for the lifetime of the process
pub struct Context {
    pub config: Config,
    pub client: Arc<Client>,
    pub messenger: Box<dyn Messenger>,
    pub apod: Box<dyn MetadataSource>,
    pub epic: Box<dyn EarthImagery>,
    pub spacex: Box<dyn LaunchGallery>,
    pub delivery: DeliveryPolicy,
    pub extension_policy: ExtensionPolicy,
}

impl Context {
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let client = Arc::new(build_client(&config)?);
        let messenger = TelegramBot::new(
            Arc::clone(&client),
            config.telegram_token.clone(),
            config.telegram_chat_id.clone(),
            config.send_method,
        );
        let apod = ApodFeed::new(Arc::clone(&client), config.nasa_api_key.clone());
        let epic = EpicArchive::new(
            Arc::clone(&client),
            config.nasa_api_key.clone(),
            config.epic_collection,
        );
        Ok(Context {
            spacex: Box::new(SpaceXLaunches::new(Arc::clone(&client))),
            messenger: Box::new(messenger),
            apod: Box::new(apod),
            epic: Box::new(epic),
            delivery: DeliveryPolicy::default(),
            extension_policy: ExtensionPolicy::default(),
            client,
            config,
        })
    }

    fn api_key_query(&self) -> Vec<(String, String)> {
        vec![("api_key".to_owned(), self.config.nasa_api_key.clone())]
    }
}

pub fn farewell(config: &Config) -> String {
    format!(
        "That's it for now! The next bunch arrives in {:.1} hrs",
        config.posting_delay_hours()
    )
}

async fn spacex_downloads(ctx: &Context, dir: &Path) -> Vec<Download> {
    info!("Fetching SpaceX images");
    match ctx.spacex.random_photos(ctx.config.spacex_image_count).await {
        Ok(urls) => downloads_for_urls(&urls, dir, "spacex", &[]),
        Err(err) => {
            error!("Couldn't fetch SpaceX images: {} ({:?})", err, err);
            vec![]
        }
    }
}

async fn epic_downloads(ctx: &Context, dir: &Path) -> Vec<Download> {
    info!("Fetching NASA Earth images");
    match latest_earth_images(ctx.epic.as_ref(), ctx.config.epic_image_count).await {
        Ok(urls) => downloads_for_urls(&urls, dir, "epic", &ctx.api_key_query()),
        Err(err) => {
            error!("Couldn't fetch NASA Earth images: {} ({:?})", err, err);
            vec![]
        }
    }
}

/// One-off batch of SpaceX and Earth pictures posted right after startup
pub async fn run_startup(ctx: &Context) -> anyhow::Result<DeliveryReport> {
    let dir = make_day_dir(&ctx.config.images_dir, &Local::now()).await?;
    let mut downloads = spacex_downloads(ctx, &dir).await;
    downloads.extend(epic_downloads(ctx, &dir).await);
    let files = fetch_pictures(&ctx.client, downloads, ctx.config.download_concurrency).await;
    if files.is_empty() {
        warn!("No startup pictures to send");
        return Ok(DeliveryReport::default());
    }
    info!("Sending {} startup pictures", files.len());
    announce(ctx.messenger.as_ref(), STARTUP_GREETING).await;
    Ok(deliver_files(ctx.messenger.as_ref(), &files, &ctx.delivery).await)
}

/// Resolve, download and deliver one batch of APOD pictures
pub async fn run_cycle(ctx: &Context) -> anyhow::Result<DeliveryReport> {
    info!("Fetching NASA APOD images");
    let resolved = resolve_batch(
        ctx.apod.as_ref(),
        ctx.config.apod_image_count,
        ctx.extension_policy,
    )
    .await?;
    if resolved.is_empty() {
        warn!("No APOD images were found this time");
        return Ok(DeliveryReport::default());
    }

    let dir = make_working_dir(&ctx.config.images_dir, &Local::now()).await?;
    let downloads = downloads_for_references(resolved.references(), &dir);
    let files = fetch_pictures(&ctx.client, downloads, ctx.config.download_concurrency).await;
    info!("Sending {} APOD pictures", files.len());
    announce(ctx.messenger.as_ref(), CYCLE_GREETING).await;
    let report = deliver_files(ctx.messenger.as_ref(), &files, &ctx.delivery).await;
    announce(ctx.messenger.as_ref(), &farewell(&ctx.config)).await;
    Ok(report)
}

/// Runs until the process is killed. A failing cycle is logged and the next one
/// is scheduled as usual
pub async fn run_forever(ctx: &Context) {
    if let Err(err) = run_startup(ctx).await {
        error!("Startup batch failed: {:?}", err);
    }
    loop {
        if let Err(err) = run_cycle(ctx).await {
            error!("Cycle failed, trying again next time: {:?}", err);
        }
        info!(
            "Waiting {:.1} hrs for the next iteration",
            ctx.config.posting_delay_hours()
        );
        tokio::time::sleep(ctx.config.posting_delay).await;
    }
}
