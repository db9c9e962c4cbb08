use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use smile_types::models::{NewEntry, WhitelistEntry};

use crate::{StoreError, WhitelistStore};

/// PostgreSQL SQLSTATE for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Bound on the follow-up lookup after a timed-out insert.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Hosted store reached through its PostgREST interface (Supabase).
pub struct RestStore {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

/// Error body returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, table: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl WhitelistStore for RestStore {
    async fn insert(&self, entry: NewEntry, deadline: Instant) -> Result<WhitelistEntry, StoreError> {
        let fid = entry.fid;
        // Postgres keeps microseconds; stamp at the same precision so a
        // follow-up lookup can recognise this row.
        let row = entry.stamped(Utc::now().trunc_subsecs(6));

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(StoreError::Timeout);
        }

        let sent = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .timeout(remaining)
            .json(&[&row])
            .send()
            .await;

        let resp = match sent {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => return self.reconcile(row).await,
            Err(e) => return Err(StoreError::Backend(format!("store request failed: {}", e))),
        };

        let status = resp.status();
        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return self.reconcile(row).await,
            Err(e) => {
                return Err(StoreError::Backend(format!("store response unreadable: {}", e)));
            }
        };

        if status.is_success() {
            // The row is written at this point; a representation we cannot
            // parse must not turn the insert into a failure.
            return match serde_json::from_slice::<Vec<WhitelistEntry>>(&body) {
                Ok(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
                Ok(_) => Ok(row),
                Err(e) => {
                    warn!("Unparseable insert representation for fid {}: {}", fid, e);
                    Ok(row)
                }
            };
        }

        let err = serde_json::from_slice::<PostgrestError>(&body).unwrap_or_default();
        debug!(
            "PostgREST insert failed: status={} code={:?} details={:?}",
            status, err.code, err.details
        );

        if err.code.as_deref() == Some(UNIQUE_VIOLATION) {
            return Err(StoreError::DuplicateKey { fid });
        }

        Err(StoreError::Backend(error_message(status, err, &body)))
    }

    fn backend(&self) -> &'static str {
        "postgrest"
    }
}

impl RestStore {
    /// Settle an insert whose request timed out. The server may still have
    /// committed it, so look the row up before reporting a timeout.
    async fn reconcile(&self, sent: WhitelistEntry) -> Result<WhitelistEntry, StoreError> {
        warn!("Insert for fid {} timed out, checking whether it landed", sent.fid);

        match self.lookup(sent.fid).await {
            Ok(Some(found)) if found.joined_at == sent.joined_at => Ok(found),
            Ok(Some(_)) => Err(StoreError::DuplicateKey { fid: sent.fid }),
            Ok(None) => Err(StoreError::Timeout),
            Err(e) => {
                warn!("Lookup for fid {} failed: {}", sent.fid, e);
                Err(StoreError::Timeout)
            }
        }
    }

    async fn lookup(&self, fid: u64) -> Result<Option<WhitelistEntry>> {
        let rows: Vec<WhitelistEntry> = self
            .client
            .get(&self.endpoint)
            .query(&[("fid", format!("eq.{}", fid)), ("select", "*".to_string())])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(rows.into_iter().next())
    }
}

fn error_message(status: StatusCode, err: PostgrestError, body: &[u8]) -> String {
    match err.message {
        Some(message) if !message.is_empty() => message,
        _ => {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            if text.is_empty() {
                format!("store responded with HTTP {}", status)
            } else {
                format!("store responded with HTTP {}: {}", status, text)
            }
        }
    }
}
