use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use smile_types::api::JoinPayload;

use crate::error::ClientError;

const JOIN_PATH: &str = "/api/join-whitelist";
const SERVER_ERROR_FALLBACK: &str = "There was a problem processing your request on the server.";

/// Transport to the join endpoint.
#[async_trait]
pub trait JoinApi: Send + Sync {
    /// Submit the payload. `Ok(None)` means success without a message.
    async fn join(&self, payload: &JoinPayload) -> Result<Option<String>, ClientError>;
}

/// Either body shape the join endpoint answers with.
#[derive(Debug, Default, Deserialize)]
struct Reply {
    message: Option<String>,
    error: Option<String>,
}

pub struct HttpJoinApi {
    client: reqwest::Client,
    url: String,
}

impl HttpJoinApi {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), JOIN_PATH),
        }
    }
}

#[async_trait]
impl JoinApi for HttpJoinApi {
    async fn join(&self, payload: &JoinPayload) -> Result<Option<String>, ClientError> {
        let resp = self.client.post(&self.url).json(payload).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        let reply: Reply = serde_json::from_slice(&bytes).unwrap_or_default();
        debug!("Join endpoint answered {} for fid {}", status, payload.fid);

        if status.is_success() {
            Ok(reply.message)
        } else {
            Err(ClientError::Server(
                reply.error.unwrap_or_else(|| SERVER_ERROR_FALLBACK.to_string()),
            ))
        }
    }
}
