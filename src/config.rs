//! Settings, loaded from built-in defaults, an optional `config.toml` and `ATTENDANCE__*`
//! environment variables (in increasing order of precedence).

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::path::Path;

use crate::aggregate::DEFAULT_LOW_THRESHOLD;
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub backend: BackendConfig,
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub attendance: AttendanceConfig,
    pub logging: LoggingConfig,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// The remote attendance service.
    Http,
    /// A local SQLite database.
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Root of the service API, e.g. `http://localhost:3000/api`.
    pub base_url: String,
    /// Sent as a bearer token when present.
    pub token: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceConfig {
    /// Percentages below this are flagged as low attendance.
    pub low_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub sender: String,
    /// Comma-separated addresses copied on every notice.
    pub cc: Option<String>,
    /// Defaults to the address in `sender`. The password is read from `SMTP_PASSWORD`.
    pub username: Option<String>,
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("backend.kind", "http")?
        .set_default("http.base_url", "http://localhost:3000/api")?
        .set_default("http.timeout_secs", 30_i64)?
        .set_default("database.url", "attendance.db")?
        .set_default("attendance.low_threshold", DEFAULT_LOW_THRESHOLD)?
        .set_default("logging.level", "info")?)
}

impl Settings {
    /// Loads settings from `path` (or `config.toml` in the working directory when no path is
    /// given, in which case the file is optional) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("config").required(false),
        };

        Ok(defaults()?
            .add_source(file)
            .add_source(
                Environment::with_prefix("ATTENDANCE")
                    .prefix_separator("__")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?)
    }

    /// Parses settings from TOML text layered over the defaults.
    pub fn from_toml(toml: &str) -> Result<Self> {
        Ok(defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?)
    }
}

/// Loads `.env` into the environment, then the settings.
pub fn load_config(path: Option<&Path>) -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_every_section() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.backend.kind, BackendKind::Http);
        assert_eq!(settings.http.base_url, "http://localhost:3000/api");
        assert_eq!(settings.http.timeout_secs, 30);
        assert_eq!(settings.http.token, None);
        assert_eq!(settings.database.url, "attendance.db");
        assert!((settings.attendance.low_threshold - 75.0).abs() < f64::EPSILON);
        assert_eq!(settings.logging.level, "info");
        assert!(settings.smtp.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let settings = Settings::from_toml(
            r#"
            [backend]
            kind = "sqlite"

            [database]
            url = ":memory:"

            [attendance]
            low_threshold = 80.0

            [smtp]
            host = "smtp.example.edu"
            sender = "attendance@example.edu"
            cc = "hod@example.edu, office@example.edu"
            "#,
        )
        .unwrap();

        assert_eq!(settings.backend.kind, BackendKind::Sqlite);
        assert_eq!(settings.database.url, ":memory:");
        assert!((settings.attendance.low_threshold - 80.0).abs() < f64::EPSILON);
        let smtp = settings.smtp.unwrap();
        assert_eq!(smtp.host, "smtp.example.edu");
        assert_eq!(smtp.username, None);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = Settings::from_toml("[backend]\nkind = \"ftp\"\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }
}
