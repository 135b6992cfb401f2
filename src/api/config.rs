//! Purpose: Hold client configuration shared by the dispatcher and resolvers.
//! Exports: `ClientConfig` and the default constants.
//! Role: Single place where base URL, header names and timings are decided.
//! Invariants: Base URLs are http/https origins (no path, query or fragment).
//! Invariants: Environment overrides are optional; absent vars keep defaults.
#![allow(clippy::result_large_err)]

use crate::core::error::{ApiResult, Error, ErrorKind};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TOKEN_NAME: &str = "fstoken";
pub const DEFAULT_REGISTRY_BASE: &str = "/discoveryservice/eureka/apps";
pub const DEFAULT_SESSION_NOTICE_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: Url,
    pub token_key: String,
    pub token_header: String,
    pub registry_base: String,
    pub session_notice_delay: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            token_key: DEFAULT_TOKEN_NAME.to_string(),
            token_header: DEFAULT_TOKEN_NAME.to_string(),
            registry_base: DEFAULT_REGISTRY_BASE.to_string(),
            session_notice_delay: DEFAULT_SESSION_NOTICE_DELAY,
        })
    }

    /// Builds a config from `FSGATE_*` environment variables.
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like `from_env`, reading variables through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> ApiResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let Some(base_url) = var("FSGATE_BASE_URL") else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("FSGATE_BASE_URL is not set")
                .with_hint("Set it to the gateway origin, e.g. http://localhost:8080."));
        };
        let mut config = Self::new(base_url)?;
        if let Some(key) = var("FSGATE_TOKEN_KEY") {
            config.token_key = key;
        }
        if let Some(header) = var("FSGATE_TOKEN_HEADER") {
            config.token_header = header;
        }
        if let Some(base) = var("FSGATE_REGISTRY_BASE") {
            config.registry_base = base;
        }
        if let Some(raw) = var("FSGATE_SESSION_NOTICE_MS") {
            let millis = raw.trim().parse::<u64>().map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message("FSGATE_SESSION_NOTICE_MS must be an integer")
                    .with_source(err)
            })?;
            config.session_notice_delay = Duration::from_millis(millis);
        }
        Ok(config)
    }

    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = key.into();
        self
    }

    pub fn with_token_header(mut self, header: impl Into<String>) -> Self {
        self.token_header = header.into();
        self
    }

    pub fn with_registry_base(mut self, base: impl Into<String>) -> Self {
        self.registry_base = base.into();
        self
    }

    pub fn with_session_notice_delay(mut self, delay: Duration) -> Self {
        self.session_notice_delay = delay;
        self
    }
}

/// Default location of the persisted token file: `~/.fsgate/session.json`.
pub fn default_token_file() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".fsgate").join("session.json")
}

fn normalize_base_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid base url")
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(
            Error::new(ErrorKind::Usage).with_message("base url must use http or https scheme")
        );
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
