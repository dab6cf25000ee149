mod providers;
pub use providers::{
    apod, epic, spacex, AllSources, ApodFeed, EarthImagery, EpicArchive, EpicCollection,
    ImageMetadata, LaunchGallery, MetadataSource, ProviderFailure, SpaceXLaunches,
};
pub mod date_walker;
pub mod resolver;
