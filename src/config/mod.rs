//! Configuration module for the portfolio backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Markers that identify a connection value copied verbatim from a template.
const PLACEHOLDER_MARKERS: &[&str] = &[
    "your-",
    "your_",
    "placeholder",
    "example.",
    "changeme",
];

/// Which remote backend the store talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    /// Hosted REST database + object storage.
    Rest {
        url: String,
        key: String,
        bucket: String,
    },
    /// Self-hosted SQLite database file.
    Sqlite { path: PathBuf },
    /// No usable connection parameters; run fully local.
    Offline,
}

/// Admin credentials gating the mutation routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote backend selection
    pub backend: BackendConfig,
    /// Path to the local persisted cache file
    pub cache_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Admin login; `None` disables every mutation route
    pub admin: Option<AdminCredentials>,
    /// How often the REST change feed polls for new rows
    pub poll_interval: Duration,
    /// Attempts per remote write before it is reported as failed
    pub write_max_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let backend = backend_from_parts(
            env::var("PORTFOLIO_BACKEND_URL").ok(),
            env::var("PORTFOLIO_BACKEND_KEY").ok(),
            env::var("PORTFOLIO_STORAGE_BUCKET").unwrap_or_else(|_| "portfolio-images".to_string()),
        );

        let cache_path = env::var("PORTFOLIO_CACHE_PATH")
            .unwrap_or_else(|_| "./data/local-cache.json".to_string())
            .into();

        let bind_addr = env::var("PORTFOLIO_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid PORTFOLIO_BIND_ADDR format");

        let log_level = env::var("PORTFOLIO_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let admin = match (
            env::var("PORTFOLIO_ADMIN_USERNAME").ok(),
            env::var("PORTFOLIO_ADMIN_PASSWORD").ok(),
        ) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminCredentials { username, password })
            }
            _ => None,
        };

        let poll_interval = env::var("PORTFOLIO_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(5));

        let write_max_attempts = env::var("PORTFOLIO_WRITE_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(4);

        Self {
            backend,
            cache_path,
            bind_addr,
            log_level,
            admin,
            poll_interval,
            write_max_attempts,
        }
    }
}

/// Decide the backend from the raw connection parameters.
pub fn backend_from_parts(url: Option<String>, key: Option<String>, bucket: String) -> BackendConfig {
    let Some(url) = url.map(|u| u.trim().to_string()) else {
        return BackendConfig::Offline;
    };

    if let Some(path) = url.strip_prefix("sqlite:") {
        let path = path.trim_start_matches("//");
        if path.is_empty() || is_placeholder(path) {
            return BackendConfig::Offline;
        }
        return BackendConfig::Sqlite { path: path.into() };
    }

    let key = key.map(|k| k.trim().to_string()).unwrap_or_default();
    if is_placeholder(&url) || is_placeholder(&key) {
        return BackendConfig::Offline;
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return BackendConfig::Offline;
    }

    BackendConfig::Rest {
        url: url.trim_end_matches('/').to_string(),
        key,
        bucket,
    }
}

/// Whether a connection value is empty or obviously copied from a template.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    value.is_empty()
        || PLACEHOLDER_MARKERS.iter().any(|m| value.contains(m))
        || (value.starts_with('<') && value.ends_with('>'))
        || is_masked(&value)
}

/// Values like `xxxx` or `xxx-xxx`. Real keys may contain `xxx` anywhere.
fn is_masked(value: &str) -> bool {
    value.contains("xxx") && value.chars().all(|c| matches!(c, 'x' | '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("PORTFOLIO_BACKEND_URL");
        env::remove_var("PORTFOLIO_BACKEND_KEY");
        env::remove_var("PORTFOLIO_CACHE_PATH");
        env::remove_var("PORTFOLIO_BIND_ADDR");
        env::remove_var("PORTFOLIO_LOG_LEVEL");
        env::remove_var("PORTFOLIO_ADMIN_USERNAME");
        env::remove_var("PORTFOLIO_ADMIN_PASSWORD");
        env::remove_var("PORTFOLIO_POLL_INTERVAL_SECS");
        env::remove_var("PORTFOLIO_WRITE_MAX_ATTEMPTS");

        let config = Config::from_env();

        assert_eq!(config.backend, BackendConfig::Offline);
        assert_eq!(config.cache_path, PathBuf::from("./data/local-cache.json"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(config.admin.is_none());
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.write_max_attempts, 4);
    }

    #[test]
    fn test_placeholder_values_select_offline() {
        let bucket = "portfolio-images".to_string();
        assert_eq!(
            backend_from_parts(
                Some("https://your-project.supabase.co".into()),
                Some("real-looking-key".into()),
                bucket.clone()
            ),
            BackendConfig::Offline
        );
        assert_eq!(
            backend_from_parts(
                Some("https://abc.supabase.co".into()),
                Some("YOUR_ANON_KEY".into()),
                bucket.clone()
            ),
            BackendConfig::Offline
        );
        assert_eq!(
            backend_from_parts(Some("https://abc.supabase.co".into()), None, bucket.clone()),
            BackendConfig::Offline
        );
        assert_eq!(
            backend_from_parts(None, Some("key".into()), bucket),
            BackendConfig::Offline
        );
    }

    #[test]
    fn test_masked_values_are_placeholders() {
        assert!(is_placeholder("xxxxxxxx"));
        assert!(is_placeholder("XXX-XXX"));
        assert!(is_placeholder("<anon key>"));
        assert!(!is_placeholder("x"));
    }

    #[test]
    fn test_key_containing_xxx_selects_backend() {
        let key = "eyJhbGciOiJIUzI1NiJ9.eyJyb2xlIjoiYW5vbiJ9.kXxxQ3<r9Tz";
        assert!(!is_placeholder(key));
        assert_eq!(
            backend_from_parts(
                Some("https://boxxxy.supabase.co".into()),
                Some(key.into()),
                "images".into()
            ),
            BackendConfig::Rest {
                url: "https://boxxxy.supabase.co".into(),
                key: key.into(),
                bucket: "images".into(),
            }
        );
    }

    #[test]
    fn test_real_values_select_backend() {
        let rest = backend_from_parts(
            Some("https://abc.supabase.co/".into()),
            Some("eyJhbGciOi".into()),
            "images".into(),
        );
        assert_eq!(
            rest,
            BackendConfig::Rest {
                url: "https://abc.supabase.co".into(),
                key: "eyJhbGciOi".into(),
                bucket: "images".into(),
            }
        );

        let sqlite = backend_from_parts(Some("sqlite:./data/content.sqlite".into()), None, "b".into());
        assert_eq!(
            sqlite,
            BackendConfig::Sqlite {
                path: PathBuf::from("./data/content.sqlite")
            }
        );
    }
}
