use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use client_core::ServiceVariant;
use serde::Deserialize;
use tracing::warn;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: Option<String>,
    pub variant: ServiceVariant,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    backend_url: Option<String>,
    variant: Option<ServiceVariant>,
    request_timeout_secs: Option<u64>,
}

impl Settings {
    /// Backend origin, resolved once at startup.
    pub fn backend_url(&self) -> anyhow::Result<Url> {
        let raw = self
            .backend_url
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .ok_or_else(|| {
                anyhow!("no backend url configured; set BACKEND_URL or pass --backend-url")
            })?;
        Url::parse(raw).with_context(|| format!("invalid backend url '{raw}'"))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

pub fn load_settings(path: &Path) -> Settings {
    load_settings_with(path, |key| std::env::var(key).ok())
}

fn load_settings_with(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.backend_url {
                    settings.backend_url = Some(v);
                }
                if let Some(v) = file_cfg.variant {
                    settings.variant = v;
                }
                if let Some(v) = file_cfg.request_timeout_secs {
                    settings.request_timeout_secs = Some(v);
                }
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "ignoring unreadable config file")
            }
        }
    }

    if let Some(v) = env("APP__BACKEND_URL") {
        settings.backend_url = Some(v);
    }

    if let Some(v) = env("APP__VARIANT") {
        match v.parse::<ServiceVariant>() {
            Ok(variant) => settings.variant = variant,
            Err(err) => warn!(error = %err, "ignoring APP__VARIANT"),
        }
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }

    settings
}
