use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

const REQUIRED_VARS: [&str; 5] = [
    "APPWRITE_ENDPOINT",
    "APPWRITE_PROJECT_ID",
    "APPWRITE_DATABASE_ID",
    "APPWRITE_PROFILES_COLLECTION_ID",
    "APPWRITE_STORAGE_BUCKET_ID",
];

pub const DEFAULT_ERROR_HISTORY_CAPACITY: usize = 100;
pub const DEFAULT_SESSION_FILE: &str = ".elkkana-session.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub deploy_mode: DeployMode,
    pub endpoint: String,
    pub project_id: String,
    pub resources: ResourceIds,
    pub app_url: String,
    pub features: FeatureFlags,
    pub error_tracking_url: Option<String>,
    pub error_history_capacity: usize,
    pub api_timeout: Duration,
    pub retry_attempts: u32,
    pub session_file: PathBuf,
}

/// Database, collection and bucket identifiers on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIds {
    pub database_id: String,
    pub profiles_collection_id: String,
    pub storage_bucket_id: String,
    pub user_documents_bucket_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    pub detailed_diagnostics: bool,
    pub error_tracking: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    Development,
    Production,
}

impl DeployMode {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw {
            "development" | "dev" => Ok(DeployMode::Development),
            "production" | "prod" => Ok(DeployMode::Production),
            other => Err(ConfigError::Invalid {
                name: "APP_ENV".into(),
                value: other.into(),
            }),
        }
    }

    /// Best-effort read of `APP_ENV` for use before the full config loads.
    pub fn detect() -> Self {
        env::var("APP_ENV")
            .ok()
            .and_then(|raw| Self::parse(&raw).ok())
            .unwrap_or(DeployMode::Development)
    }

    pub fn default_log_level(self) -> &'static str {
        match self {
            DeployMode::Development => "debug",
            DeployMode::Production => "error",
        }
    }

    fn default_features(self) -> FeatureFlags {
        match self {
            DeployMode::Development => FeatureFlags {
                detailed_diagnostics: true,
                error_tracking: false,
            },
            DeployMode::Production => FeatureFlags {
                detailed_diagnostics: false,
                error_tracking: true,
            },
        }
    }

    fn default_app_url(self) -> &'static str {
        match self {
            DeployMode::Development => "http://localhost:5173",
            DeployMode::Production => "https://www.triekaelkkanacorp.live",
        }
    }

    fn default_timeout_ms(self) -> u64 {
        match self {
            DeployMode::Development => 10_000,
            DeployMode::Production => 5_000,
        }
    }

    fn default_retry_attempts(self) -> u32 {
        match self {
            DeployMode::Development => 1,
            DeployMode::Production => 3,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source.
    ///
    /// Every missing required variable is reported in a single error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let missing: Vec<String> = REQUIRED_VARS
            .iter()
            .filter(|name| read(**name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let required = |name: &str| read(name).unwrap_or_default();

        let deploy_mode = match read("APP_ENV") {
            Some(raw) => DeployMode::parse(&raw)?,
            None => DeployMode::Development,
        };

        let storage_bucket_id = required("APPWRITE_STORAGE_BUCKET_ID");
        let resources = ResourceIds {
            database_id: required("APPWRITE_DATABASE_ID"),
            profiles_collection_id: required("APPWRITE_PROFILES_COLLECTION_ID"),
            user_documents_bucket_id: read("APPWRITE_USER_DOCUMENTS_BUCKET_ID")
                .unwrap_or_else(|| storage_bucket_id.clone()),
            storage_bucket_id,
        };

        let defaults = deploy_mode.default_features();
        let features = FeatureFlags {
            detailed_diagnostics: parse_flag(
                "ENABLE_DETAILED_DIAGNOSTICS",
                read("ENABLE_DETAILED_DIAGNOSTICS"),
                defaults.detailed_diagnostics,
            )?,
            error_tracking: parse_flag(
                "ENABLE_ERROR_TRACKING",
                read("ENABLE_ERROR_TRACKING"),
                defaults.error_tracking,
            )?,
        };

        let error_history_capacity = parse_number(
            "ERROR_HISTORY_CAPACITY",
            read("ERROR_HISTORY_CAPACITY"),
            DEFAULT_ERROR_HISTORY_CAPACITY,
        )?;
        if error_history_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "ERROR_HISTORY_CAPACITY".into(),
                value: "0".into(),
            });
        }

        let timeout_ms = parse_number(
            "API_TIMEOUT_MS",
            read("API_TIMEOUT_MS"),
            deploy_mode.default_timeout_ms(),
        )?;
        let retry_attempts = parse_number(
            "API_RETRY_ATTEMPTS",
            read("API_RETRY_ATTEMPTS"),
            deploy_mode.default_retry_attempts(),
        )?;

        Ok(Self {
            deploy_mode,
            endpoint: required("APPWRITE_ENDPOINT")
                .trim_end_matches('/')
                .to_string(),
            project_id: required("APPWRITE_PROJECT_ID"),
            resources,
            app_url: read("APP_URL")
                .unwrap_or_else(|| deploy_mode.default_app_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            features,
            error_tracking_url: read("ERROR_TRACKING_URL"),
            error_history_capacity,
            api_timeout: Duration::from_millis(timeout_ms),
            retry_attempts,
            session_file: read("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE)),
        })
    }

    /// Redirect target embedded in password recovery emails.
    pub fn recovery_redirect_url(&self) -> String {
        format!("{}/reset-password", self.app_url)
    }
}

fn parse_flag(name: &str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            name: name.into(),
            value: other.into(),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            name: name.into(),
            value,
        }),
    }
}
