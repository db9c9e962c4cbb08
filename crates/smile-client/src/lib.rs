//! Mini App join flow.
//!
//! The host social client injects an SDK exposing a readiness signal and an
//! identity context. Both the SDK and the HTTP transport are trait objects so
//! the flow can run against the real host or against test doubles.

pub mod api;
pub mod error;
pub mod flow;
pub mod sdk;

pub use api::{HttpJoinApi, JoinApi};
pub use error::ClientError;
pub use flow::{ButtonState, JoinFlow, JoinOutcome, StatusKind, StatusMessage, UiState};
pub use sdk::{AppContext, ContextUser, HostSdk, SdkError};
