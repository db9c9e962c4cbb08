use std::sync::Arc;

use tracing::{debug, error, info, warn};

use smile_types::api::JoinPayload;

use crate::api::JoinApi;
use crate::error::ClientError;
use crate::sdk::{ContextUser, HostSdk};

pub const JOIN_LABEL: &str = "👋 Join the whitelist!";
pub const JOINED_LABEL: &str = "🙂 YOU'RE ON THE LIST!";
pub const PROCESSING_MESSAGE: &str = "Processing your request...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub enabled: bool,
    pub label: String,
}

/// Everything the page shows: the status line and the join button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub status: Option<StatusMessage>,
    pub button: ButtonState,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: None,
            button: ButtonState {
                enabled: true,
                label: JOIN_LABEL.to_string(),
            },
        }
    }
}

impl UiState {
    fn show(&mut self, text: impl Into<String>, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }
}

#[derive(Debug)]
pub enum JoinOutcome {
    /// The button was disabled; nothing happened.
    Ignored,
    Joined(String),
    Failed(ClientError),
}

/// Join flow for one page load.
///
/// The disabled button is the only guard against a second submission: it is
/// cleared on failure so the user can retry, and stays set after success.
pub struct JoinFlow {
    sdk: Option<Arc<dyn HostSdk>>,
    api: Arc<dyn JoinApi>,
    ui: UiState,
}

impl JoinFlow {
    pub fn new(sdk: Option<Arc<dyn HostSdk>>, api: Arc<dyn JoinApi>) -> Self {
        Self {
            sdk,
            api,
            ui: UiState::default(),
        }
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    /// Signal readiness to the host. Failures are logged, never shown.
    pub async fn on_ready(&self) -> bool {
        let Some(sdk) = &self.sdk else {
            warn!("Host SDK not detected; the Mini App cannot report that it is ready.");
            return false;
        };

        match sdk.ready().await {
            Ok(()) => {
                info!("Mini App reported ready to the host client");
                true
            }
            Err(e) => {
                error!("Failed to report Mini App ready: {}", e);
                false
            }
        }
    }

    pub async fn on_join_click(&mut self) -> JoinOutcome {
        if !self.ui.button.enabled {
            debug!("Join button is disabled; ignoring click");
            return JoinOutcome::Ignored;
        }

        self.ui.button.enabled = false;
        self.ui.show(PROCESSING_MESSAGE, StatusKind::Info);

        match self.submit().await {
            Ok(message) => {
                self.ui.show(message.clone(), StatusKind::Success);
                self.ui.button.label = JOINED_LABEL.to_string();
                JoinOutcome::Joined(message)
            }
            Err(e) => {
                error!("Failed to join the whitelist: {}", e);
                self.ui.show(format!("Error: {}", e), StatusKind::Error);
                self.ui.button.enabled = true;
                JoinOutcome::Failed(e)
            }
        }
    }

    async fn submit(&self) -> Result<String, ClientError> {
        let sdk = self.sdk.as_ref().ok_or(ClientError::SdkUnavailable)?;
        let context = sdk.context().await?;
        let user = context.user.ok_or(ClientError::MissingIdentity)?;
        let payload = build_payload(&user)?;

        let message = self.api.join(&payload).await?;
        Ok(message.unwrap_or_else(|| {
            format!("Thanks, {}! You're on the whitelist. 🎉", payload.display_name)
        }))
    }
}

/// Fill the join payload from the host identity, applying the same defaults
/// the server would.
pub fn build_payload(user: &ContextUser) -> Result<JoinPayload, ClientError> {
    let fid = user.fid.ok_or(ClientError::MissingIdentity)?;
    let username = non_empty(user.username.as_deref()).unwrap_or_else(|| format!("fid:{}", fid));
    let display_name = non_empty(user.display_name.as_deref()).unwrap_or_else(|| username.clone());
    let pfp_url = non_empty(user.pfp_url.as_deref()).unwrap_or_default();

    Ok(JoinPayload {
        fid,
        username,
        display_name,
        pfp_url,
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::sdk::{AppContext, SdkError};

    struct FakeSdk {
        context: Result<AppContext, &'static str>,
        ready_fails: bool,
    }

    impl FakeSdk {
        fn with_user(user: ContextUser) -> Arc<dyn HostSdk> {
            Arc::new(Self {
                context: Ok(AppContext { user: Some(user) }),
                ready_fails: false,
            })
        }
    }

    #[async_trait]
    impl HostSdk for FakeSdk {
        async fn ready(&self) -> Result<(), SdkError> {
            if self.ready_fails {
                Err(SdkError::Host("host went away".into()))
            } else {
                Ok(())
            }
        }

        async fn context(&self) -> Result<AppContext, SdkError> {
            self.context.clone().map_err(|e| SdkError::Host(e.to_string()))
        }
    }

    /// SDK without a context accessor.
    struct ReadyOnlySdk;

    #[async_trait]
    impl HostSdk for ReadyOnlySdk {
        async fn ready(&self) -> Result<(), SdkError> {
            Ok(())
        }

        async fn context(&self) -> Result<AppContext, SdkError> {
            Err(SdkError::Unavailable("context"))
        }
    }

    #[derive(Default)]
    struct FakeApi {
        calls: Mutex<Vec<JoinPayload>>,
        replies: Mutex<Vec<Result<Option<String>, String>>>,
    }

    impl FakeApi {
        fn replying(replies: Vec<Result<Option<String>, String>>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(replies),
            })
        }

        fn calls(&self) -> Vec<JoinPayload> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JoinApi for FakeApi {
        async fn join(&self, payload: &JoinPayload) -> Result<Option<String>, ClientError> {
            self.calls.lock().unwrap().push(payload.clone());
            let reply = self.replies.lock().unwrap().remove(0);
            reply.map_err(ClientError::Server)
        }
    }

    fn alice() -> ContextUser {
        ContextUser {
            fid: Some(42),
            username: Some("alice".into()),
            display_name: None,
            pfp_url: None,
        }
    }

    #[tokio::test]
    async fn success_relabels_and_keeps_button_disabled() {
        let api = FakeApi::replying(vec![Ok(Some("alice, you have joined!".into()))]);
        let mut flow = JoinFlow::new(Some(FakeSdk::with_user(alice())), api.clone());

        let outcome = flow.on_join_click().await;
        assert!(matches!(outcome, JoinOutcome::Joined(ref m) if m == "alice, you have joined!"));

        let ui = flow.ui();
        assert!(!ui.button.enabled);
        assert_eq!(ui.button.label, JOINED_LABEL);
        assert_eq!(ui.status.as_ref().unwrap().kind, StatusKind::Success);

        // Further clicks do nothing.
        assert!(matches!(flow.on_join_click().await, JoinOutcome::Ignored));
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn payload_applies_defaults() {
        let api = FakeApi::replying(vec![Ok(None)]);
        let user = ContextUser {
            fid: Some(7),
            ..ContextUser::default()
        };
        let mut flow = JoinFlow::new(Some(FakeSdk::with_user(user)), api.clone());
        flow.on_join_click().await;

        let sent = &api.calls()[0];
        assert_eq!(sent.username, "fid:7");
        assert_eq!(sent.display_name, "fid:7");
        assert_eq!(sent.pfp_url, "");

        // No server message: the flow falls back to its own.
        let status = flow.ui().status.clone().unwrap();
        assert_eq!(status.text, "Thanks, fid:7! You're on the whitelist. 🎉");
    }

    #[tokio::test]
    async fn missing_sdk_shows_error_and_reenables() {
        let api = FakeApi::replying(vec![]);
        let mut flow = JoinFlow::new(None, api.clone());

        assert!(!flow.on_ready().await);
        let outcome = flow.on_join_click().await;
        assert!(matches!(outcome, JoinOutcome::Failed(ClientError::SdkUnavailable)));

        let ui = flow.ui();
        assert!(ui.button.enabled);
        assert_eq!(ui.button.label, JOIN_LABEL);
        let status = ui.status.as_ref().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert!(status.text.starts_with("Error: The Farcaster SDK"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_context_capability_is_sdk_unavailable() {
        let api = FakeApi::replying(vec![]);
        let mut flow = JoinFlow::new(Some(Arc::new(ReadyOnlySdk)), api);

        let outcome = flow.on_join_click().await;
        assert!(matches!(outcome, JoinOutcome::Failed(ClientError::SdkUnavailable)));
    }

    #[tokio::test]
    async fn missing_identity_is_reported() {
        let api = FakeApi::replying(vec![]);
        let sdk: Arc<dyn HostSdk> = Arc::new(FakeSdk {
            context: Ok(AppContext { user: None }),
            ready_fails: false,
        });
        let mut flow = JoinFlow::new(Some(sdk), api.clone());

        let outcome = flow.on_join_click().await;
        assert!(matches!(outcome, JoinOutcome::Failed(ClientError::MissingIdentity)));

        let user_without_fid = ContextUser {
            username: Some("ghost".into()),
            ..ContextUser::default()
        };
        let mut flow = JoinFlow::new(Some(FakeSdk::with_user(user_without_fid)), api.clone());
        let outcome = flow.on_join_click().await;
        assert!(matches!(outcome, JoinOutcome::Failed(ClientError::MissingIdentity)));
        assert!(flow.ui().button.enabled);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn server_error_allows_retry() {
        let api = FakeApi::replying(vec![
            Err("Failed to save to the database: timeout".into()),
            Ok(Some("alice, you have joined!".into())),
        ]);
        let mut flow = JoinFlow::new(Some(FakeSdk::with_user(alice())), api.clone());

        let outcome = flow.on_join_click().await;
        assert!(matches!(outcome, JoinOutcome::Failed(ClientError::Server(_))));
        assert!(flow.ui().button.enabled);
        assert_eq!(
            flow.ui().status.as_ref().unwrap().text,
            "Error: Failed to save to the database: timeout"
        );

        let outcome = flow.on_join_click().await;
        assert!(matches!(outcome, JoinOutcome::Joined(_)));
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn ready_failure_is_not_surfaced() {
        let sdk: Arc<dyn HostSdk> = Arc::new(FakeSdk {
            context: Err("unused"),
            ready_fails: true,
        });
        let flow = JoinFlow::new(Some(sdk), FakeApi::replying(vec![]));

        assert!(!flow.on_ready().await);
        assert_eq!(flow.ui(), &UiState::default());
    }

    #[tokio::test]
    async fn ready_success_is_reported() {
        let flow = JoinFlow::new(Some(FakeSdk::with_user(alice())), FakeApi::replying(vec![]));
        assert!(flow.on_ready().await);
    }
}
