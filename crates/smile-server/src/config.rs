use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use smile_db::{DEFAULT_TABLE, StoreConfig};

const DEFAULT_STORE_TIMEOUT_SECS: u64 = 10;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub store: StoreConfig,
    pub store_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::load(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration from any key lookup.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = var("SMILE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse_or(&var, "SMILE_PORT", 3000);
        let store_timeout = match parse_or(&var, "SMILE_STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT_SECS) {
            0 => {
                warn!(
                    "SMILE_STORE_TIMEOUT_SECS must be positive, using default: {}",
                    DEFAULT_STORE_TIMEOUT_SECS
                );
                Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS)
            }
            secs => Duration::from_secs(secs),
        };

        let base_url = match (var("SMILE_BASE_URL"), var("VERCEL_URL")) {
            (Some(url), _) => url,
            (None, Some(host)) => format!("https://{}", host),
            (None, None) => {
                info!("SMILE_BASE_URL not set, using http://localhost:{}", port);
                format!("http://localhost:{}", port)
            }
        };
        let base_url = base_url.trim_end_matches('/').to_string();

        let store = match (var("SMILE_DB_PATH"), var("SUPABASE_URL"), var("SUPABASE_ANON_KEY")) {
            (Some(path), _, _) => StoreConfig::Sqlite {
                path: PathBuf::from(path),
            },
            (None, Some(url), Some(api_key)) => StoreConfig::Rest {
                url,
                api_key,
                table: var("SMILE_TABLE").unwrap_or_else(|| DEFAULT_TABLE.into()),
                timeout: store_timeout,
            },
            (None, url, key) => {
                if url.is_some() || key.is_some() {
                    warn!("Only one of SUPABASE_URL / SUPABASE_ANON_KEY is set; both are required");
                }
                StoreConfig::Unconfigured
            }
        };

        Self {
            host,
            port,
            base_url,
            store,
            store_timeout,
        }
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {} value {:?} ({}), using default: {}", key, raw, e, default);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::load(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.store, StoreConfig::Unconfigured);
        assert_eq!(config.store_timeout, Duration::from_secs(10));
    }

    #[test]
    fn supabase_pair_selects_rest_store() {
        let config = load(&[
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("SMILE_STORE_TIMEOUT_SECS", "3"),
        ]);
        assert_eq!(
            config.store,
            StoreConfig::Rest {
                url: "https://project.supabase.co".into(),
                api_key: "anon".into(),
                table: DEFAULT_TABLE.into(),
                timeout: Duration::from_secs(3),
            }
        );
    }

    #[test]
    fn half_configured_store_is_unconfigured() {
        let config = load(&[("SUPABASE_URL", "https://project.supabase.co")]);
        assert_eq!(config.store, StoreConfig::Unconfigured);

        let config = load(&[("SUPABASE_URL", "https://project.supabase.co"), ("SUPABASE_ANON_KEY", "  ")]);
        assert_eq!(config.store, StoreConfig::Unconfigured);
    }

    #[test]
    fn db_path_selects_sqlite_store() {
        let config = load(&[("SMILE_DB_PATH", "smile.db"), ("SUPABASE_URL", "x"), ("SUPABASE_ANON_KEY", "y")]);
        assert_eq!(
            config.store,
            StoreConfig::Sqlite {
                path: PathBuf::from("smile.db")
            }
        );
    }

    #[test]
    fn base_url_falls_back_to_vercel_host() {
        let config = load(&[("VERCEL_URL", "smile-app.vercel.app")]);
        assert_eq!(config.base_url, "https://smile-app.vercel.app");

        let config = load(&[("SMILE_BASE_URL", "https://smile.example/"), ("VERCEL_URL", "ignored")]);
        assert_eq!(config.base_url, "https://smile.example");
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = load(&[("SMILE_PORT", "not-a-port"), ("SMILE_STORE_TIMEOUT_SECS", "-2")]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.store_timeout, Duration::from_secs(10));
    }

    #[test]
    fn zero_store_timeout_falls_back_to_default() {
        let config = load(&[
            ("SMILE_STORE_TIMEOUT_SECS", "0"),
            ("SUPABASE_URL", "https://project.supabase.co"),
            ("SUPABASE_ANON_KEY", "anon"),
        ]);
        assert_eq!(config.store_timeout, Duration::from_secs(10));
        assert!(matches!(
            config.store,
            StoreConfig::Rest { timeout, .. } if timeout == Duration::from_secs(10)
        ));
    }
}
