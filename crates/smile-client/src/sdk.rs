use async_trait::async_trait;
use serde::{Deserialize, Deserializer, de};
use serde_json::Value;
use thiserror::Error;

use smile_types::api::{FidError, parse_fid};

/// Context the host hands to the Mini App.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppContext {
    #[serde(default)]
    pub user: Option<ContextUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextUser {
    #[serde(default, deserialize_with = "deserialize_fid")]
    pub fid: Option<u64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub pfp_url: Option<String>,
}

/// Same coercion the server applies: numeric strings are accepted, and an
/// absent or empty `fid` means no identity.
fn deserialize_fid<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    match parse_fid(raw.as_ref()) {
        Ok(fid) => Ok(Some(fid)),
        Err(FidError::Missing) => Ok(None),
        Err(FidError::Invalid) => Err(de::Error::custom(format!(
            "fid must be a non-negative integer, got {}",
            raw.unwrap_or_default()
        ))),
    }
}

#[derive(Debug, Error)]
pub enum SdkError {
    /// The host SDK does not provide this capability.
    #[error("SDK capability `{0}` is not available")]
    Unavailable(&'static str),

    #[error("{0}")]
    Host(String),
}

/// Capabilities injected by the host client.
#[async_trait]
pub trait HostSdk: Send + Sync {
    /// Tell the host the app has finished loading.
    async fn ready(&self) -> Result<(), SdkError>;

    /// Fetch the identity context of the current user.
    async fn context(&self) -> Result<AppContext, SdkError>;
}
