//! Configuration module for the attendance shell.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Placeholder the endpoint ships with before a deployment URL is filled in.
pub const API_URL_PLACEHOLDER: &str = "YOUR_GAS_WEB_APP_URL_HERE";

const DEFAULT_MANIFEST: &[&str] = &[
    "/attendance-app/",
    "/attendance-app/index.html",
    "/attendance-app/style.css",
    "/attendance-app/main.js",
    "/attendance-app/assets/vexum-logo.png",
    "/attendance-app/manifest.json",
];

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Attendance service endpoint (web app URL)
    pub api_url: Option<String>,
    /// Student id sent with every action
    pub user_id: String,
    /// Current cache generation name
    pub cache_name: String,
    /// Static resources populated at install
    pub cache_manifest: Vec<String>,
    /// Substring identifying attendance service requests
    pub service_pattern: String,
    /// Base URL static assets are fetched from
    pub origin: String,
    /// Pre-shared key guarding the control message endpoint
    pub control_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the shell server to
    pub bind_addr: SocketAddr,
    /// Transport timeout for outbound requests
    pub http_timeout: Duration,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_url = env::var("ATTENDANCE_API_URL").ok();

        let user_id = env::var("ATTENDANCE_USER_ID").unwrap_or_else(|_| "user01".to_string());

        let cache_name =
            env::var("ATTENDANCE_CACHE_NAME").unwrap_or_else(|_| "vexum-attendance-v1".to_string());

        let cache_manifest = match env::var("ATTENDANCE_CACHE_MANIFEST") {
            Ok(list) => parse_manifest(&list),
            Err(_) => DEFAULT_MANIFEST.iter().map(|p| p.to_string()).collect(),
        };

        let service_pattern = env::var("ATTENDANCE_SERVICE_PATTERN")
            .unwrap_or_else(|_| "script.google.com".to_string());

        let origin = env::var("ATTENDANCE_ORIGIN")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
            .trim_end_matches('/')
            .to_string();

        let control_psk = env::var("ATTENDANCE_CONTROL_PSK").ok();

        let db_path = env::var("ATTENDANCE_DB_PATH")
            .unwrap_or_else(|_| "./data/attendance.sqlite".to_string())
            .into();

        let bind_addr = env::var("ATTENDANCE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid ATTENDANCE_BIND_ADDR format: {}", e)))?;

        let http_timeout = match env::var("ATTENDANCE_HTTP_TIMEOUT_SECS") {
            Ok(secs) => Duration::from_secs(secs.parse().map_err(|e| {
                AppError::Config(format!("Invalid ATTENDANCE_HTTP_TIMEOUT_SECS: {}", e))
            })?),
            Err(_) => Duration::from_secs(30),
        };

        let log_level = env::var("ATTENDANCE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            api_url,
            user_id,
            cache_name,
            cache_manifest,
            service_pattern,
            origin,
            control_psk,
            db_path,
            bind_addr,
            http_timeout,
            log_level,
        })
    }

    /// The service endpoint, or `None` while it is unset or still the placeholder.
    pub fn configured_api_url(&self) -> Option<&str> {
        configured_endpoint(self.api_url.as_deref())
    }
}

/// Trimmed endpoint, unless it is empty or the shipped placeholder.
pub fn configured_endpoint(url: Option<&str>) -> Option<&str> {
    url.map(str::trim)
        .filter(|url| !url.is_empty() && *url != API_URL_PLACEHOLDER)
}

fn parse_manifest(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        for key in [
            "ATTENDANCE_API_URL",
            "ATTENDANCE_USER_ID",
            "ATTENDANCE_CACHE_NAME",
            "ATTENDANCE_CACHE_MANIFEST",
            "ATTENDANCE_SERVICE_PATTERN",
            "ATTENDANCE_ORIGIN",
            "ATTENDANCE_CONTROL_PSK",
            "ATTENDANCE_DB_PATH",
            "ATTENDANCE_BIND_ADDR",
            "ATTENDANCE_HTTP_TIMEOUT_SECS",
            "ATTENDANCE_LOG_LEVEL",
        ] {
            env::remove_var(key);
        }

        let config = Config::from_env().unwrap();

        assert!(config.api_url.is_none());
        assert_eq!(config.user_id, "user01");
        assert_eq!(config.cache_name, "vexum-attendance-v1");
        assert_eq!(config.cache_manifest.len(), 6);
        assert_eq!(config.cache_manifest[0], "/attendance-app/");
        assert_eq!(config.service_pattern, "script.google.com");
        assert_eq!(config.db_path, PathBuf::from("./data/attendance.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_parse_manifest_skips_blanks() {
        assert_eq!(
            parse_manifest(" /a.css, ,/b.js,"),
            vec!["/a.css".to_string(), "/b.js".to_string()]
        );
    }

    #[test]
    fn test_placeholder_endpoint_is_unconfigured() {
        let mut config = test_config();
        config.api_url = Some(API_URL_PLACEHOLDER.to_string());
        assert!(config.configured_api_url().is_none());

        config.api_url = Some("   ".to_string());
        assert!(config.configured_api_url().is_none());

        config.api_url = Some("https://script.google.com/macros/s/abc/exec".to_string());
        assert_eq!(
            config.configured_api_url(),
            Some("https://script.google.com/macros/s/abc/exec")
        );
    }

    fn test_config() -> Config {
        Config {
            api_url: None,
            user_id: "user01".into(),
            cache_name: "v1".into(),
            cache_manifest: vec![],
            service_pattern: "script.google.com".into(),
            origin: "http://127.0.0.1:8000".into(),
            control_psk: None,
            db_path: "./data/attendance.sqlite".into(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            http_timeout: Duration::from_secs(30),
            log_level: "warn".into(),
        }
    }
}
