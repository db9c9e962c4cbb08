use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized registration, ready to be written. `joined_at` is stamped by
/// the store at insert time, never taken from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub fid: u64,
    pub username: String,
    pub display_name: Option<String>,
    pub pfp_url: Option<String>,
}

impl NewEntry {
    /// Name used when addressing the registrant: the display name when one
    /// was given, the username otherwise.
    pub fn greeting_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.username,
        }
    }

    pub fn stamped(self, joined_at: DateTime<Utc>) -> WhitelistEntry {
        WhitelistEntry {
            fid: self.fid,
            username: self.username,
            display_name: self.display_name,
            pfp_url: self.pfp_url,
            joined_at,
        }
    }
}

/// A stored whitelist row. Field names match the `whitelist_entries` columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub fid: u64,
    pub username: String,
    pub display_name: Option<String>,
    pub pfp_url: Option<String>,
    pub joined_at: DateTime<Utc>,
}
