//! Deployment settings loaded from a flat TOML table

use crate::error::{LaunchError, Result};
use crate::flag;
use serde::{de, Deserialize, Deserializer};
use std::path::Path;

/// Subdirectory of STATIC_ROOT holding compiled assets when not configured
pub const DEFAULT_COMPRESS_OUTPUT_DIR: &str = "CACHE";

/// Resolved deployment settings.
///
/// Built from a flat table of SCREAMING_SNAKE_CASE keys. Every recognized key
/// has a declared type and either a default or a `None` that is rejected at
/// the point of use. Unrecognized keys are kept in the raw table, which is
/// the context handed to the nginx template.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Settings {
    /// Front uWSGI with nginx
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub enable_nginx: bool,

    /// Enable the nginx pagespeed module (implies nginx)
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub enable_pagespeed: bool,

    /// Enable browser caching headers in nginx (implies nginx)
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub enable_browsercache: bool,

    /// Public port (default: 80)
    #[serde(default = "default_port", deserialize_with = "deserialize_number")]
    pub port: u16,

    /// Internal port uWSGI binds to behind nginx
    #[serde(default, deserialize_with = "deserialize_optional_number")]
    pub backend_port: Option<u16>,

    /// Number of uWSGI worker processes
    #[serde(deserialize_with = "deserialize_number")]
    pub django_web_workers: u32,

    /// Requests a worker serves before it is recycled
    #[serde(deserialize_with = "deserialize_number")]
    pub django_web_max_requests: u32,

    /// Hard per-request timeout in seconds (uWSGI harakiri)
    #[serde(deserialize_with = "deserialize_number")]
    pub django_web_timeout: u32,

    /// Assets are synced to external storage, which then serves them
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub enable_syncing: bool,

    #[serde(default, deserialize_with = "flag::deserialize")]
    pub static_url_is_on_other_domain: bool,

    #[serde(default, deserialize_with = "flag::deserialize")]
    pub media_url_is_on_other_domain: bool,

    pub static_url: Option<String>,
    pub static_root: Option<String>,
    pub media_url: Option<String>,
    pub media_root: Option<String>,

    /// Output directory of compiled assets, relative to STATIC_ROOT
    pub compress_output_dir: Option<String>,

    /// Where the rendered nginx configuration is written
    pub nginx_conf_path: Option<String>,

    /// Where the generated Procfile is written
    pub nginx_procfile_path: Option<String>,

    /// Add uWSGI cheaper (adaptive worker scaling) defaults to the environment
    #[serde(default = "default_true", deserialize_with = "flag::deserialize")]
    pub enable_uwsgi_cheaper: bool,

    #[serde(skip)]
    raw: toml::Table,
}

fn default_port() -> u16 {
    80
}

fn default_true() -> bool {
    true
}

/// An integer setting, which environment-derived sources may spell as a string
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Text(String),
}

fn deserialize_number<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let value = match RawNumber::deserialize(deserializer)? {
        RawNumber::Int(i) => i,
        RawNumber::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| de::Error::custom(format!("{:?} is not an integer", s)))?,
    };
    T::try_from(value).map_err(|_| de::Error::custom(format!("{} is out of range", value)))
}

fn deserialize_optional_number<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    deserialize_number(deserializer).map(Some)
}

impl Settings {
    /// Load settings from a TOML file of flat `KEY = value` pairs
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| LaunchError::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| LaunchError::Settings {
            path: path.to_path_buf(),
            message: match e {
                LaunchError::Configuration(message) => message,
                other => other.to_string(),
            },
        })
    }

    /// Parse settings from TOML source
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(source)
            .map_err(|e: toml::de::Error| LaunchError::config(e.message().to_string()))?;
        Self::from_table(table)
    }

    /// Build the typed view over an already-resolved settings table
    pub fn from_table(table: toml::Table) -> Result<Self> {
        let mut settings: Settings = toml::Value::Table(table.clone())
            .try_into()
            .map_err(|e: toml::de::Error| LaunchError::config(e.message().to_string()))?;
        settings.raw = table;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate values that deserialize fine but cannot produce a working launch
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.port == 0 {
            errors.push("PORT must not be 0".to_string());
        }
        if self.backend_port == Some(0) {
            errors.push("BACKEND_PORT must not be 0".to_string());
        }
        if self.django_web_workers == 0 {
            errors.push("DJANGO_WEB_WORKERS must be at least 1".to_string());
        }

        if !errors.is_empty() {
            return Err(LaunchError::config(errors.join("; ")));
        }

        Ok(())
    }

    /// True when any of the nginx-backed features is enabled
    pub fn proxy_enabled(&self) -> bool {
        self.enable_nginx || self.enable_pagespeed || self.enable_browsercache
    }

    /// Compiled-asset subdirectory, defaulting to `CACHE`
    pub fn compress_output_dir(&self) -> &str {
        self.compress_output_dir
            .as_deref()
            .unwrap_or(DEFAULT_COMPRESS_OUTPUT_DIR)
    }

    /// Raw value of any key, recognized or not
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.raw.get(key)
    }

    /// The full settings mapping as a template context
    pub fn template_context(&self) -> serde_json::Value {
        serde_json::to_value(&self.raw).unwrap_or(serde_json::Value::Null)
    }
}

/// Return the value of a string setting that must be present and non-empty
pub fn required<'a>(key: &str, value: &'a Option<String>) -> Result<&'a str> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(LaunchError::config(format!("{} must be configured", key))),
    }
}
