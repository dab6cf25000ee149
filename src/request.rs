use std::iter::FromIterator;
use std::time::Duration;

use log::error;
use reqwest;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::Config;

pub const DEFAULT_USER_AGENT: &str = concat!("cosmofeed/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct ResponseErrorContext {
    pub body: String,
    pub code: StatusCode,
}

/// Wrapper for providing actual useful information about
/// why responses failed since reqwest throws that information
/// away when it encounters errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Failed response code {0:?}")]
    FailStatus(ResponseErrorContext),
    #[error("Unexpected body {0:?}")]
    UnexpectedBody(ResponseErrorContext),
    #[error("Request error")]
    ReqwestError(#[from] reqwest::Error),
}

impl HttpError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::FailStatus(ctx) | HttpError::UnexpectedBody(ctx) => Some(ctx.code),
            HttpError::ReqwestError(err) => err.status(),
        }
    }
}

pub async fn parse_successful_response<T: DeserializeOwned>(
    response: Response,
) -> Result<T, HttpError> {
    let response_code = response.status();
    let url = response.url().clone();
    let response_body = response.text().await?;
    parse_body(&url, response_code, response_body)
}

pub(crate) fn parse_body<T: DeserializeOwned>(
    url: &url::Url,
    response_code: StatusCode,
    response_body: String,
) -> Result<T, HttpError> {
    if !response_code.is_success() {
        // reqwest drops the body on error_for_status, keep it around for the logs
        return Err(HttpError::FailStatus(ResponseErrorContext {
            body: response_body,
            code: response_code,
        }));
    }
    serde_json::from_str::<T>(&response_body).map_err(|_error| {
        error!("Failed to parse response from {}", url);
        HttpError::UnexpectedBody(ResponseErrorContext {
            body: response_body,
            code: response_code,
        })
    })
}

pub fn request_default_headers(user_agent: &str) -> Result<HeaderMap, InvalidHeaderValue> {
    Ok(HeaderMap::from_iter([(
        HeaderName::from_static("user-agent"),
        HeaderValue::from_str(user_agent)?,
    )]))
}

/// Every outgoing request shares this client so the timeout and user agent
/// are applied consistently
pub fn build_client(config: &Config) -> anyhow::Result<Client> {
    let headers = request_default_headers(&config.user_agent)?;
    Ok(Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?)
}

#[derive(Debug, Clone)]
pub struct UrlBuilder {
    pub params: Vec<(&'static str, String)>,
}

impl Default for UrlBuilder {
    fn default() -> Self {
        Self { params: vec![] }
    }
}

impl UrlBuilder {
    pub fn param<V: ToString>(&mut self, key: &'static str, value: V) -> &mut Self {
        self.params.push((key, value.to_string()));
        self
    }
    pub fn api_key(&mut self, key: &str) -> &mut Self {
        self.param("api_key", key)
    }
    pub fn build(&self, base_url: &str) -> Result<url::Url, url::ParseError> {
        url::Url::parse_with_params(base_url, self.params.iter())
    }
}
