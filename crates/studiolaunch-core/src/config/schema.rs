//! Configuration structs grouped by concern, resolved from an [`EnvSnapshot`].

use std::path::PathBuf;
use std::time::Duration;

use super::env_keys::{launcher, observability as obv_keys, platform};
use super::loader::EnvSnapshot;

pub const DEFAULT_SUBDOMAIN: &str = "labelstudio-default";
pub const DEFAULT_HOME: &str = "/home/cdsw";
pub const DEFAULT_PORT: u16 = 8100;
pub const DEFAULT_SETTLE_SECS: u64 = 2;
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 10;

pub const VENV_DIR_NAME: &str = ".ls_venv";
pub const DATA_DIR_NAME: &str = "label_studio_data";

/// Values given on the command line. `None` keeps whatever the environment says.
#[derive(Debug, Clone, Default)]
pub struct LaunchOverrides {
    pub subdomain: Option<String>,
    pub home: Option<PathBuf>,
    pub port: Option<u16>,
    pub domain: Option<String>,
}

/// Everything the launcher needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub subdomain: String,
    pub home_dir: PathBuf,
    pub venv_dir: PathBuf,
    pub data_dir: PathBuf,
    pub port: u16,
    /// Platform domain. Not validated: when absent the URL and CSRF pattern
    /// are rendered with an empty domain.
    pub domain: Option<String>,
    /// Interpreter used to create the venv; `None` means search PATH.
    pub base_python: Option<PathBuf>,
    pub settle_delay: Duration,
    pub stop_timeout: Duration,
}

impl LaunchConfig {
    /// Values are taken as given. An unusable port is the one exception: it is
    /// logged and replaced by [`DEFAULT_PORT`].
    pub fn from_env(env: &EnvSnapshot) -> Self {
        let subdomain = env.env_or(platform::MY_SUBDOMAIN, &[], || DEFAULT_SUBDOMAIN.to_string());
        let home_dir = PathBuf::from(env.env_or(platform::HOME, &[], || DEFAULT_HOME.to_string()));

        let port = match env.env_optional(platform::CDSW_READONLY_PORT, &[]) {
            Some(raw) => parse_port(platform::CDSW_READONLY_PORT, &raw),
            None => DEFAULT_PORT,
        };

        let settle_secs = env
            .env_parse::<u64>(launcher::STUDIOLAUNCH_SETTLE_SECS, &[])
            .unwrap_or(DEFAULT_SETTLE_SECS);
        let stop_secs = env
            .env_parse::<u64>(launcher::STUDIOLAUNCH_STOP_TIMEOUT_SECS, &[])
            .unwrap_or(DEFAULT_STOP_TIMEOUT_SECS);

        Self {
            subdomain,
            venv_dir: home_dir.join(VENV_DIR_NAME),
            data_dir: home_dir.join(DATA_DIR_NAME),
            home_dir,
            port,
            domain: env.env_optional(platform::CDSW_DOMAIN, &[]),
            base_python: env
                .env_optional(launcher::STUDIOLAUNCH_PYTHON, &[])
                .map(PathBuf::from),
            settle_delay: Duration::from_secs(settle_secs),
            stop_timeout: Duration::from_secs(stop_secs),
        }
    }

    /// Apply CLI overrides. Changing home re-derives the venv and data paths.
    pub fn with_overrides(mut self, overrides: LaunchOverrides) -> Self {
        if let Some(subdomain) = overrides.subdomain {
            self.subdomain = subdomain;
        }
        if let Some(home) = overrides.home {
            self.venv_dir = home.join(VENV_DIR_NAME);
            self.data_dir = home.join(DATA_DIR_NAME);
            self.home_dir = home;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(domain) = overrides.domain {
            self.domain = Some(domain);
        }
        self
    }

    fn domain_or_empty(&self) -> &str {
        self.domain.as_deref().unwrap_or("")
    }

    /// Externally visible URL: `https://<subdomain>.<domain>`.
    pub fn app_url(&self) -> String {
        format!("https://{}.{}", self.subdomain, self.domain_or_empty())
    }

    /// Cross-origin trust pattern: `https://*.<domain>`.
    pub fn csrf_trusted_origins(&self) -> String {
        format!("https://*.{}", self.domain_or_empty())
    }

    /// Loopback bind address handed to the server command.
    pub fn bind_addr(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }
}

fn parse_port(key: &str, raw: &str) -> u16 {
    match raw.parse::<u16>() {
        Ok(port) if port != 0 => port,
        _ => {
            tracing::warn!("Invalid port '{raw}' in {key}; falling back to {DEFAULT_PORT}");
            DEFAULT_PORT
        }
    }
}

/// Observability: quiet, log_level, log_json.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl ObservabilityConfig {
    pub fn from_env(env: &EnvSnapshot) -> Self {
        Self {
            quiet: env.env_bool(obv_keys::STUDIOLAUNCH_QUIET, &[], false),
            log_level: env.env_or(obv_keys::STUDIOLAUNCH_LOG_LEVEL, &[], || {
                "studiolaunch=info,studiolaunch_runtime=info,studiolaunch_core=info".to_string()
            }),
            log_json: env.env_bool(obv_keys::STUDIOLAUNCH_LOG_JSON, &[], false),
        }
    }
}
