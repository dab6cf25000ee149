use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tokio::fs;

use crate::dispatcher::dispatcher::{DeliveryFailure, Messenger};
use crate::request::{HttpError, ResponseErrorContext};

const API_ROOT: &str = "https://api.telegram.org";

/// Photos get compressed and previewed inline, documents arrive untouched
#[derive(Display, Debug, Copy, Clone, EnumString, PartialEq, Eq)]
pub enum SendMethod {
    #[strum(serialize = "photo")]
    Photo,
    #[strum(serialize = "document")]
    Document,
}

impl SendMethod {
    fn endpoint(&self) -> &'static str {
        match self {
            SendMethod::Photo => "sendPhoto",
            SendMethod::Document => "sendDocument",
        }
    }

    fn field(&self) -> &'static str {
        match self {
            SendMethod::Photo => "photo",
            SendMethod::Document => "document",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BotApiResponse {
    ok: bool,
    error_code: Option<u16>,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Map a Bot API reply onto a delivery outcome. Flood control comes back as a 429
/// with the wait in `parameters.retry_after`
fn interpret_response(code: StatusCode, body: String) -> Result<(), DeliveryFailure> {
    let parsed = match serde_json::from_str::<BotApiResponse>(&body) {
        Ok(parsed) => parsed,
        Err(_) if code == StatusCode::TOO_MANY_REQUESTS => {
            return Err(DeliveryFailure::RateLimited { retry_after: None })
        }
        Err(_) if code.is_success() => {
            return Err(HttpError::UnexpectedBody(ResponseErrorContext { body, code }).into())
        }
        Err(_) => return Err(HttpError::FailStatus(ResponseErrorContext { body, code }).into()),
    };
    if parsed.ok {
        return Ok(());
    }
    if code == StatusCode::TOO_MANY_REQUESTS || parsed.error_code == Some(429) {
        let retry_after = parsed
            .parameters
            .and_then(|params| params.retry_after)
            .map(Duration::from_secs);
        return Err(DeliveryFailure::RateLimited { retry_after });
    }
    Err(DeliveryFailure::Rejected {
        code: parsed.error_code.unwrap_or_else(|| code.as_u16()),
        description: parsed.description.unwrap_or_default(),
    })
}

pub struct TelegramBot {
    pub client: Arc<Client>,
    token: String,
    pub chat_id: String,
    pub send_method: SendMethod,
}

impl TelegramBot {
    pub fn new(
        client: Arc<Client>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
        send_method: SendMethod,
    ) -> Self {
        Self {
            client,
            token: token.into(),
            chat_id: chat_id.into(),
            send_method,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_ROOT, self.token, method)
    }
}

#[async_trait]
impl Messenger for TelegramBot {
    async fn send_text(&self, text: &str) -> Result<(), DeliveryFailure> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await?;
        let code = response.status();
        interpret_response(code, response.text().await?)
    }

    async fn send_file(&self, path: &Path) -> Result<(), DeliveryFailure> {
        let content = match fs::read(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(DeliveryFailure::MissingFile(path.to_path_buf()))
            }
            Err(err) => return Err(err.into()),
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.send_method.field().to_owned());
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .part(
                self.send_method.field(),
                Part::bytes(content).file_name(file_name),
            );
        debug!("Sending {} via {}", path.display(), self.send_method.endpoint());
        let response = self
            .client
            .post(self.method_url(self.send_method.endpoint()))
            .multipart(form)
            .send()
            .await?;
        let code = response.status();
        interpret_response(code, response.text().await?)
    }
}
