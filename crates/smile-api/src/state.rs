use std::sync::Arc;
use std::time::Duration;

use smile_db::Gateway;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub gateway: Gateway,
    /// Public base URL of the deployment, without a trailing slash.
    pub base_url: String,
    /// Upper bound on a single store call.
    pub store_timeout: Duration,
}

impl AppStateInner {
    pub fn new(gateway: Gateway, base_url: &str, store_timeout: Duration) -> AppState {
        Arc::new(Self {
            gateway,
            base_url: base_url.trim_end_matches('/').to_string(),
            store_timeout,
        })
    }
}
