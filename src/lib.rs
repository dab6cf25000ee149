pub mod config;
pub mod dispatcher;
pub mod fetcher;
pub mod image;
pub mod request;
pub mod scheduler;
pub mod scraper;

#[cfg(test)]
mod test_support;
