//! Environment variable key constants.
//!
//! Keys read from the hosting platform keep the platform's own names; launcher
//! knobs use the `STUDIOLAUNCH_*` prefix.

/// Variables provided by the hosting platform.
pub mod platform {
    /// Application subdomain, must match the name registered in the platform's App menu.
    pub const MY_SUBDOMAIN: &str = "MY_SUBDOMAIN";
    pub const HOME: &str = "HOME";
    /// Port assigned to applications by the platform proxy.
    pub const CDSW_READONLY_PORT: &str = "CDSW_READONLY_PORT";
    pub const CDSW_DOMAIN: &str = "CDSW_DOMAIN";
    /// Session signing key. Pin it externally to keep sessions across restarts.
    pub const SECRET_KEY: &str = "SECRET_KEY";
}

/// Launcher tuning.
pub mod launcher {
    pub const STUDIOLAUNCH_PYTHON: &str = "STUDIOLAUNCH_PYTHON";
    pub const STUDIOLAUNCH_SETTLE_SECS: &str = "STUDIOLAUNCH_SETTLE_SECS";
    pub const STUDIOLAUNCH_STOP_TIMEOUT_SECS: &str = "STUDIOLAUNCH_STOP_TIMEOUT_SECS";
}

/// Observability and logging.
pub mod observability {
    pub const STUDIOLAUNCH_QUIET: &str = "STUDIOLAUNCH_QUIET";
    pub const STUDIOLAUNCH_LOG_LEVEL: &str = "STUDIOLAUNCH_LOG_LEVEL";
    pub const STUDIOLAUNCH_LOG_JSON: &str = "STUDIOLAUNCH_LOG_JSON";
}

/// Variables written into the child's environment.
pub mod child {
    pub const PYTHONUNBUFFERED: &str = "PYTHONUNBUFFERED";
    pub const DJANGO_SETTINGS_MODULE: &str = "DJANGO_SETTINGS_MODULE";
    pub const LABEL_STUDIO_BASE_DATA_DIR: &str = "LABEL_STUDIO_BASE_DATA_DIR";
    pub const ALLOWED_HOSTS: &str = "ALLOWED_HOSTS";
    pub const LABEL_STUDIO_DISABLE_TELEMETRY: &str = "LABEL_STUDIO_DISABLE_TELEMETRY";
    pub const CSRF_TRUSTED_ORIGINS: &str = "CSRF_TRUSTED_ORIGINS";
    pub const SECRET_KEY: &str = super::platform::SECRET_KEY;

    // Install steps only.
    pub const PIP_USER: &str = "PIP_USER";
    pub const PYTHONPATH: &str = "PYTHONPATH";
}
