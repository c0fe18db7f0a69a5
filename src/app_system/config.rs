use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cart_actor::{CheckSettings, QueryFailurePolicy};

pub const SETTINGS_FILE: &str = "cart.toml";
const DEFAULT_CHANNEL_BUFFER: usize = 32;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the stock service. Without one, an in-memory inventory is used.
    pub stock_api_url: Option<String>,
    /// 0 disables the stock query timeout.
    pub query_timeout_ms: u64,
    pub on_query_failure: QueryFailurePolicy,
    pub channel_buffer: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stock_api_url: None,
            query_timeout_ms: 5_000,
            on_query_failure: QueryFailurePolicy::RecordError,
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
        }
    }
}

impl Settings {
    pub fn query_timeout(&self) -> Option<Duration> {
        (self.query_timeout_ms > 0).then(|| Duration::from_millis(self.query_timeout_ms))
    }

    /// Actor mailbox size; a zero-sized mailbox falls back to the default.
    pub fn mailbox_size(&self) -> usize {
        if self.channel_buffer == 0 {
            DEFAULT_CHANNEL_BUFFER
        } else {
            self.channel_buffer
        }
    }

    /// Resets values that cannot be used to their defaults.
    pub fn normalize(&mut self) {
        if self.channel_buffer == 0 {
            warn!(default = DEFAULT_CHANNEL_BUFFER, "Ignoring channel_buffer = 0");
            self.channel_buffer = DEFAULT_CHANNEL_BUFFER;
        }
    }

    pub fn check_settings(&self) -> CheckSettings {
        CheckSettings {
            query_timeout: self.query_timeout(),
            on_query_failure: self.on_query_failure,
        }
    }
}

/// Reads `cart.toml` from the working directory, then applies `CART__*`
/// environment overrides.
pub fn load_settings() -> Settings {
    let mut settings = load_settings_file(Path::new(SETTINGS_FILE));
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.normalize();
    settings
}

pub fn load_settings_file(path: &Path) -> Settings {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Settings::default();
        }
    };

    match toml::from_str::<Settings>(&raw) {
        Ok(mut settings) => {
            info!(path = %path.display(), "Loaded settings");
            settings.normalize();
            settings
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable settings file");
            Settings::default()
        }
    }
}

pub fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("CART__STOCK_API_URL") {
        let v = v.trim();
        settings.stock_api_url = (!v.is_empty()).then(|| v.to_string());
    }

    if let Some(v) = lookup("CART__QUERY_TIMEOUT_MS") {
        match v.trim().parse() {
            Ok(ms) => settings.query_timeout_ms = ms,
            Err(_) => warn!(value = %v, "Ignoring invalid CART__QUERY_TIMEOUT_MS"),
        }
    }

    if let Some(v) = lookup("CART__ON_QUERY_FAILURE") {
        match v.parse() {
            Ok(policy) => settings.on_query_failure = policy,
            Err(e) => warn!(error = %e, "Ignoring invalid CART__ON_QUERY_FAILURE"),
        }
    }

    if let Some(v) = lookup("CART__CHANNEL_BUFFER") {
        match v.trim().parse::<usize>() {
            Ok(n) if n > 0 => settings.channel_buffer = n,
            _ => warn!(value = %v, "Ignoring invalid CART__CHANNEL_BUFFER"),
        }
    }
}
