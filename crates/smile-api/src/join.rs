use axum::{Json, extract::State, http::Method};
use bytes::Bytes;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{error, info, warn};

use smile_db::StoreError;
use smile_types::api::{FidError, JoinRequest, JoinResponse, parse_fid};
use smile_types::models::NewEntry;

use crate::error::{ApiError, BODY_NOT_OBJECT, FID_INVALID, FID_REQUIRED, PAYLOAD_INVALID};
use crate::state::AppState;

/// POST /api/join-whitelist (also mounted at /api/whitelist).
///
/// Checks run in a fixed order: method, store configuration, payload. A
/// duplicate `fid` is not an error for the caller; it gets a 200 with an
/// "already joined" message.
pub async fn join_whitelist(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> Result<Json<JoinResponse>, ApiError> {
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    let Some(store) = state.gateway.store() else {
        error!("Whitelist store is not initialized. Check SUPABASE_URL / SUPABASE_ANON_KEY.");
        return Err(ApiError::Configuration);
    };

    let entry = normalize(&body)?;
    let name = entry.greeting_name().to_string();
    let fid = entry.fid;

    info!(
        "Adding fid {} (username={}, display_name={:?}) to the whitelist",
        fid, entry.username, entry.display_name
    );

    // The store honours the deadline itself and never commits after it, so
    // the insert is awaited to completion instead of being abandoned.
    let deadline = Instant::now() + state.store_timeout;
    match store.insert(entry, deadline).await {
        Ok(stored) => {
            info!("fid {} joined the whitelist at {}", stored.fid, stored.joined_at);
            Ok(Json(JoinResponse {
                message: joined_message(&name),
            }))
        }
        Err(StoreError::DuplicateKey { fid }) => {
            warn!("fid {} is already on the whitelist", fid);
            Ok(Json(JoinResponse {
                message: already_joined_message(&name),
            }))
        }
        Err(StoreError::Timeout) => {
            error!("Store insert for fid {} timed out after {:?}", fid, state.store_timeout);
            Err(ApiError::Store(format!(
                "the store did not respond within {} ms",
                state.store_timeout.as_millis()
            )))
        }
        Err(StoreError::Backend(msg)) => {
            error!("Store error while inserting fid {}: {}", fid, msg);
            Err(ApiError::Store(msg))
        }
    }
}

pub fn joined_message(name: &str) -> String {
    format!("{}, you have joined the $SMILE whitelist!", name)
}

pub fn already_joined_message(name: &str) -> String {
    format!("{}, you were already on the whitelist! Thanks again.", name)
}

/// Decode and normalize the join payload.
///
/// `fid` is checked for presence, not truthiness: `0` counts as supplied.
pub fn normalize(body: &[u8]) -> Result<NewEntry, ApiError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected join payload: {}", e);
        ApiError::Validation(BODY_NOT_OBJECT.into())
    })?;
    if !value.is_object() {
        return Err(ApiError::Validation(BODY_NOT_OBJECT.into()));
    }

    let req: JoinRequest = serde_json::from_value(value).map_err(|e| {
        warn!("Rejected join payload: {}", e);
        ApiError::Validation(PAYLOAD_INVALID.into())
    })?;

    let fid = parse_fid(req.fid.as_ref()).map_err(|e| match e {
        FidError::Missing => ApiError::Validation(FID_REQUIRED.into()),
        FidError::Invalid => ApiError::Validation(FID_INVALID.into()),
    })?;
    let username = match req.username {
        Some(username) if !username.is_empty() => username,
        _ => format!("fid:{}", fid),
    };

    Ok(NewEntry {
        fid,
        username,
        display_name: req.display_name,
        pfp_url: req.pfp_url,
    })
}
