use thiserror::Error;

use crate::sdk::SdkError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("The Farcaster SDK is not available in this environment.")]
    SdkUnavailable,

    #[error(
        "Could not get the user's FID. Make sure the Mini App has permission and is running inside Farcaster."
    )]
    MissingIdentity,

    #[error("{0}")]
    Sdk(SdkError),

    /// Non-2xx answer from the join endpoint.
    #[error("{0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl From<SdkError> for ClientError {
    fn from(err: SdkError) -> Self {
        match err {
            SdkError::Unavailable(_) => ClientError::SdkUnavailable,
            other => ClientError::Sdk(other),
        }
    }
}
