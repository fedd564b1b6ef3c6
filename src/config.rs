//! Configuration for the PMG exporter.
//!
//! All settings come from `PMG_`-prefixed environment variables, optionally
//! seeded from an env file. Connection credentials are required; everything
//! else has a default.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// URL scheme used to reach the management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Https,
    Http,
}

impl Backend {
    /// The scheme part of the base URL.
    pub fn scheme(&self) -> &'static str {
        match self {
            Backend::Https => "https",
            Backend::Http => "http",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "https" => Some(Backend::Https),
            "http" => Some(Backend::Http),
            _ => None,
        }
    }
}

/// Proxmox product whose API we talk to.
///
/// The service decides the auth cookie name and the port used when the
/// host setting does not carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Pmg,
    Pve,
    Pbs,
}

impl Service {
    /// Cookie name expected by the service for ticket authentication.
    pub fn auth_cookie_name(&self) -> &'static str {
        match self {
            Service::Pmg => "PMGAuthCookie",
            Service::Pve => "PVEAuthCookie",
            Service::Pbs => "PBSAuthCookie",
        }
    }

    /// Default API port of the service.
    pub fn default_port(&self) -> u16 {
        match self {
            Service::Pmg | Service::Pve => 8006,
            Service::Pbs => 8007,
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "pmg" => Some(Service::Pmg),
            "pve" => Some(Service::Pve),
            "pbs" => Some(Service::Pbs),
            _ => None,
        }
    }
}

/// Complete exporter configuration.
#[derive(Clone)]
pub struct ExporterConfig {
    /// Hostname (optionally `host:port`) of the PMG instance.
    pub host: String,

    /// API user, e.g. `monitor@pmg`.
    pub user: String,

    /// API password. Redacted in `Debug` output.
    pub password: String,

    /// Whether to verify the TLS certificate of the remote.
    pub verify_ssl: bool,

    /// URL scheme (default: https).
    pub backend: Backend,

    /// Proxmox service flavour (default: pmg).
    pub service: Service,

    /// Port the exporter's own HTTP endpoint listens on.
    pub exporter_port: u16,

    /// Address the exporter's own HTTP endpoint binds to.
    pub exporter_address: IpAddr,

    /// Log level for the exporter's own logging.
    pub log_level: String,
}

impl ExporterConfig {
    /// Load configuration, seeding the process environment from `config_file`
    /// first when that file exists. A missing env file is not an error; the
    /// variables may come from the real environment instead.
    pub fn load(config_file: &Path) -> Result<Self, ConfigError> {
        if config_file.exists() {
            dotenvy::from_path(config_file)?;
        }
        Self::from_env()
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Variables that are set but empty count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::MissingVar(key));

        let host = require("PMG_HOST")?;
        let user = require("PMG_USER")?;
        let password = require("PMG_PASSWORD")?;

        let verify_ssl = match get("PMG_VERIFY_SSL") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "PMG_VERIFY_SSL",
                value: raw,
                reason: "expected true/false/1/0/yes/no".to_string(),
            })?,
            None => true,
        };

        let backend = match get("PMG_BACKEND") {
            Some(raw) => Backend::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "PMG_BACKEND",
                value: raw,
                reason: "expected https or http".to_string(),
            })?,
            None => Backend::Https,
        };

        let service = match get("PMG_SERVICE") {
            Some(raw) => Service::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: "PMG_SERVICE",
                value: raw,
                reason: "expected pmg, pve or pbs".to_string(),
            })?,
            None => Service::Pmg,
        };

        let exporter_port = match get("PMG_EXPORTER_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "PMG_EXPORTER_PORT",
                    value: raw,
                    reason: e.to_string(),
                })?,
            None => 10069,
        };

        let exporter_address = match get("PMG_EXPORTER_ADDRESS") {
            Some(raw) => raw
                .trim()
                .parse::<IpAddr>()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "PMG_EXPORTER_ADDRESS",
                    value: raw,
                    reason: e.to_string(),
                })?,
            None => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };

        let log_level = get("PMG_LOG_LEVEL").unwrap_or_else(|| "INFO".to_string());

        Ok(Self {
            host,
            user,
            password,
            verify_ssl,
            backend,
            service,
            exporter_port,
            exporter_address,
            log_level,
        })
    }

    /// The socket address the exporter's HTTP endpoint binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.exporter_address, self.exporter_port)
    }
}

impl fmt::Debug for ExporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExporterConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("verify_ssl", &self.verify_ssl)
            .field("backend", &self.backend)
            .field("service", &self.service)
            .field("exporter_port", &self.exporter_port)
            .field("exporter_address", &self.exporter_address)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn minimal_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("PMG_HOST", "pmg.example.com"),
            ("PMG_USER", "monitor@pmg"),
            ("PMG_PASSWORD", "secret"),
        ]
    }

    #[test]
    fn test_minimal_config_applies_defaults() {
        let vars = minimal_vars();
        let config = ExporterConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(config.host, "pmg.example.com");
        assert_eq!(config.user, "monitor@pmg");
        assert_eq!(config.password, "secret");
        assert!(config.verify_ssl);
        assert_eq!(config.backend, Backend::Https);
        assert_eq!(config.service, Service::Pmg);
        assert_eq!(config.exporter_port, 10069);
        assert_eq!(config.exporter_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.log_level, "INFO");
    }

    #[test]
    fn test_full_config() {
        let vars = vec![
            ("PMG_HOST", "mail.example.com:9443"),
            ("PMG_USER", "root@pam"),
            ("PMG_PASSWORD", "hunter2"),
            ("PMG_VERIFY_SSL", "no"),
            ("PMG_BACKEND", "HTTP"),
            ("PMG_SERVICE", "pbs"),
            ("PMG_EXPORTER_PORT", "9123"),
            ("PMG_EXPORTER_ADDRESS", "0.0.0.0"),
            ("PMG_LOG_LEVEL", "debug"),
        ];
        let config = ExporterConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert!(!config.verify_ssl);
        assert_eq!(config.backend, Backend::Http);
        assert_eq!(config.service, Service::Pbs);
        assert_eq!(config.exporter_port, 9123);
        assert!(config.exporter_address.is_unspecified());
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:9123");
    }

    #[test]
    fn test_missing_host_is_an_error() {
        let vars = vec![("PMG_USER", "monitor@pmg"), ("PMG_PASSWORD", "secret")];
        let err = ExporterConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(err.to_string().contains("PMG_HOST"));
    }

    #[test]
    fn test_empty_password_counts_as_missing() {
        let vars = vec![
            ("PMG_HOST", "pmg.example.com"),
            ("PMG_USER", "monitor@pmg"),
            ("PMG_PASSWORD", "  "),
        ];
        let err = ExporterConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(err.to_string().contains("PMG_PASSWORD"));
    }

    #[test]
    fn test_invalid_bool_is_an_error() {
        let mut vars = minimal_vars();
        vars.push(("PMG_VERIFY_SSL", "maybe"));
        let err = ExporterConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(err.to_string().contains("PMG_VERIFY_SSL"));
    }

    #[test]
    fn test_bool_spellings() {
        for (raw, expected) in [
            ("true", true),
            ("TRUE", true),
            ("1", true),
            ("yes", true),
            ("false", false),
            ("0", false),
            ("No", false),
        ] {
            assert_eq!(parse_bool(raw), Some(expected), "raw = {raw:?}");
        }
        assert_eq!(parse_bool("2"), None);
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let mut vars = minimal_vars();
        vars.push(("PMG_EXPORTER_PORT", "70000"));
        let err = ExporterConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(err.to_string().contains("PMG_EXPORTER_PORT"));
    }

    #[test]
    fn test_invalid_address_is_an_error() {
        let mut vars = minimal_vars();
        vars.push(("PMG_EXPORTER_ADDRESS", "not-an-ip"));
        let err = ExporterConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(err.to_string().contains("PMG_EXPORTER_ADDRESS"));
    }

    #[test]
    fn test_invalid_backend_and_service() {
        let mut vars = minimal_vars();
        vars.push(("PMG_BACKEND", "ftp"));
        assert!(ExporterConfig::from_lookup(lookup_from(&vars)).is_err());

        let mut vars = minimal_vars();
        vars.push(("PMG_SERVICE", "pfsense"));
        assert!(ExporterConfig::from_lookup(lookup_from(&vars)).is_err());
    }

    #[test]
    fn test_service_cookie_and_port() {
        assert_eq!(Service::Pmg.auth_cookie_name(), "PMGAuthCookie");
        assert_eq!(Service::Pve.auth_cookie_name(), "PVEAuthCookie");
        assert_eq!(Service::Pbs.auth_cookie_name(), "PBSAuthCookie");
        assert_eq!(Service::Pmg.default_port(), 8006);
        assert_eq!(Service::Pve.default_port(), 8006);
        assert_eq!(Service::Pbs.default_port(), 8007);
    }

    #[test]
    fn test_debug_redacts_password() {
        let vars = minimal_vars();
        let config = ExporterConfig::from_lookup(lookup_from(&vars)).unwrap();
        let rendered = format!("{config:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_load_from_env_file() {
        use std::io::Write as _;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pmg-exporter.env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "PMG_HOST=filehost.example.com").unwrap();
        writeln!(file, "PMG_USER=fileuser@pmg").unwrap();
        writeln!(file, "PMG_PASSWORD=filepass").unwrap();
        writeln!(file, "PMG_EXPORTER_PORT=9200").unwrap();

        let config = ExporterConfig::load(&path).unwrap();
        assert_eq!(config.host, "filehost.example.com");
        assert_eq!(config.user, "fileuser@pmg");
        assert_eq!(config.exporter_port, 9200);
    }
}
