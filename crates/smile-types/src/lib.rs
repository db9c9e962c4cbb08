//! Wire payloads and the whitelist entry model shared by the server and the
//! Mini App client.

pub mod api;
pub mod models;
