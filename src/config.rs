use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_PATH: &str = "data/entries.json";
pub const DEFAULT_DRAFT_DIR: &str = "data/drafts";
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Runtime settings, read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// `PORT`
    pub port: u16,
    /// `APP_DATA_PATH`: submitted entry history.
    pub data_path: PathBuf,
    /// `APP_DRAFT_DIR`: key-value files holding the in-progress draft.
    pub draft_dir: PathBuf,
    /// `DRAFT_DEBOUNCE_MS`
    pub draft_debounce: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            draft_dir: PathBuf::from(DEFAULT_DRAFT_DIR),
            draft_debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            port: parse_or("PORT", lookup("PORT"), defaults.port),
            data_path: lookup("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            draft_dir: lookup("APP_DRAFT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.draft_dir),
            draft_debounce: Duration::from_millis(parse_or(
                "DRAFT_DEBOUNCE_MS",
                lookup("DRAFT_DEBOUNCE_MS"),
                DEFAULT_DEBOUNCE_MS,
            )),
        }
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(name: &str, value: Option<String>, default: T) -> T {
    match value {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring invalid {name}='{raw}', using {default}");
            default
        }),
        None => default,
    }
}
