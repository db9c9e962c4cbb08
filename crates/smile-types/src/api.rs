use serde::{Deserialize, Serialize};
use serde_json::Value;

// -- Join --

/// Join payload as received by the server.
///
/// `fid` is kept as a raw JSON value: clients send it either as a number or
/// as a numeric string, and the handler decides what counts as supplied.
#[derive(Debug, Default, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub fid: Option<Value>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, rename = "pfpUrl", alias = "avatarUrl")]
    pub pfp_url: Option<String>,
}

/// Join payload as built by the Mini App once the host identity is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPayload {
    pub fid: u64,
    pub username: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "pfpUrl")]
    pub pfp_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinResponse {
    pub message: String,
}

// -- Fid coercion --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FidError {
    /// Absent, `null`, or an empty string.
    Missing,
    /// Supplied but not a non-negative integer.
    Invalid,
}

/// Coerce a raw `fid` to a number. Hosts are not consistent about the JSON
/// type, so numeric strings and integral floats are accepted. `0` counts as
/// supplied.
pub fn parse_fid(value: Option<&Value>) -> Result<u64, FidError> {
    match value {
        None | Some(Value::Null) => Err(FidError::Missing),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
                    .map(|f| f as u64)
            })
            .ok_or(FidError::Invalid),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Err(FidError::Missing);
            }
            s.parse().map_err(|_| FidError::Invalid)
        }
        Some(_) => Err(FidError::Invalid),
    }
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
