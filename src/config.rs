//! Environment-driven settings.

use crate::error::ConfigError;
use actix_web::http::Method;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct CorsSettings {
    /// Empty means any origin.
    pub origins: Vec<String>,
    pub allow_credentials: bool,
    pub methods: Vec<Method>,
    /// Empty means any header.
    pub headers: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub app_name: String,
    pub app_version: String,
    pub app_description: String,
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub debug: bool,
    pub log_level: String,
    pub model_path: PathBuf,
    pub threshold_path: PathBuf,
    pub max_body_bytes: usize,
    pub cors: CorsSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let workers = parsed(&lookup, "WORKERS", num_cpus::get())?;
        if workers == 0 {
            return Err(ConfigError {
                key: "WORKERS",
                value: workers.to_string(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            app_name: text("APP_NAME", "Customer Churn API"),
            app_version: text("APP_VERSION", "0.1.0"),
            app_description: text(
                "APP_DESCRIPTION",
                "API for predicting customer churn using machine learning.",
            ),
            host: text("HOST", "127.0.0.1"),
            port: parsed(&lookup, "PORT", 8000)?,
            workers,
            debug: flag(&lookup, "DEBUG", true),
            log_level: text("LOG_LEVEL", "info").to_lowercase(),
            model_path: text("MODEL_PATH", "models/churn_pipeline.json").into(),
            threshold_path: text("THRESHOLD_PATH", "models/decision_threshold.json").into(),
            max_body_bytes: parsed(&lookup, "MAX_BODY_BYTES", 1024 * 1024)?,
            cors: CorsSettings {
                origins: wildcard_list(&text("CORS_ORIGINS", "*")),
                allow_credentials: flag(&lookup, "CORS_ALLOW_CREDENTIALS", true),
                methods: methods(&text("CORS_ALLOW_METHODS", "GET,POST,PUT,DELETE,OPTIONS"))?,
                headers: wildcard_list(&text("CORS_ALLOW_HEADERS", "*")),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn wildcard_list(raw: &str) -> Vec<String> {
    let items = split_list(raw);
    if items.iter().any(|s| s == "*") {
        Vec::new()
    } else {
        items
    }
}

fn methods(raw: &str) -> Result<Vec<Method>, ConfigError> {
    split_list(raw)
        .into_iter()
        .map(|m| {
            Method::from_bytes(m.to_uppercase().as_bytes()).map_err(|e| ConfigError {
                key: "CORS_ALLOW_METHODS",
                reason: e.to_string(),
                value: m,
            })
        })
        .collect()
}
