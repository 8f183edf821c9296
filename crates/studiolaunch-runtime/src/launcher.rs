//! The launch sequence.
//!
//! `UNINSTALLED → ENVIRONMENT_READY → INSTALLED → CONFIGURED → MIGRATED → RUNNING`,
//! inferred from the filesystem on every run. Nothing is persisted, so a
//! crashed launch is resumed by launching again.

use std::path::{Path, PathBuf};

use serde::Serialize;
use studiolaunch_core::config::env_keys::platform;
use studiolaunch_core::config::{EnvSnapshot, LaunchConfig};

use crate::error::LaunchError;
use crate::instance;
use crate::process::{CommandSpec, ProcessRunner, RunStatus, ServeOutcome};
use crate::runtime_env;
use crate::supervisor::InterruptFlag;
use crate::venv::{self, VenvLayout};

/// How a launch ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The server exited on its own.
    Exited(RunStatus),
    /// Interrupted by the operator; the server was asked to stop.
    Interrupted,
    /// The management script was not found; nothing was started.
    EntryPointMissing,
}

/// Side-effect-free report of what a launch would do.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchPlan {
    pub subdomain: String,
    pub venv_dir: PathBuf,
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub app_url: String,
    pub csrf_trusted_origins: String,
    pub secret_key_pinned: bool,
    pub venv_present: bool,
    pub app_installed: bool,
    pub data_dir_present: bool,
    pub entry_point: Option<PathBuf>,
    pub migrate_command: Option<String>,
    pub serve_command: Option<String>,
}

pub struct Launcher<'a, R> {
    config: &'a LaunchConfig,
    ambient: &'a EnvSnapshot,
    layout: VenvLayout,
    runner: R,
}

impl<'a, R: ProcessRunner> Launcher<'a, R> {
    pub fn new(config: &'a LaunchConfig, ambient: &'a EnvSnapshot, runner: R) -> Self {
        Self {
            config,
            ambient,
            layout: VenvLayout::new(&config.venv_dir),
            runner,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Provision, migrate, then run the server until it exits or `interrupt` fires.
    ///
    /// An interrupt during setup stops before the next step. A setup step that
    /// fails after an interrupt (pip or migrate receiving the same Ctrl+C) is
    /// reported as [`LaunchOutcome::Interrupted`], not as an error.
    pub fn run(&self, interrupt: &InterruptFlag) -> Result<LaunchOutcome, LaunchError> {
        match self.run_steps(interrupt) {
            Err(e) if interrupt.is_set() => {
                tracing::info!(error = %e, "Setup aborted by interrupt");
                Ok(LaunchOutcome::Interrupted)
            }
            other => other,
        }
    }

    fn run_steps(&self, interrupt: &InterruptFlag) -> Result<LaunchOutcome, LaunchError> {
        let cfg = self.config;
        tracing::info!("--- DYNAMIC DEPLOYMENT OF LABEL STUDIO: {} ---", cfg.subdomain);
        if cfg.domain.is_none() {
            tracing::warn!(
                "{} is not set; access URL and CSRF trusted origin will be incomplete",
                platform::CDSW_DOMAIN
            );
        }

        if stop_requested(interrupt, "environment setup") {
            return Ok(LaunchOutcome::Interrupted);
        }
        let install_env = runtime_env::install_env(self.ambient);
        let venv_step = venv::ensure_venv(
            &self.layout,
            cfg.base_python.as_deref(),
            &install_env,
            &self.runner,
        )?;
        if stop_requested(interrupt, "application install") {
            return Ok(LaunchOutcome::Interrupted);
        }
        let install_step = venv::ensure_installed(&self.layout, &install_env, &self.runner)?;
        let data_step = venv::ensure_data_dir(&cfg.data_dir)?;
        tracing::debug!(?venv_step, ?install_step, ?data_step, "Setup steps");

        let Some(manage_py) = venv::locate_entry_point(&self.layout) else {
            tracing::error!(
                pattern = %self.layout.entry_point_pattern(),
                "manage.py not found. Installation might be corrupted."
            );
            return Ok(LaunchOutcome::EntryPointMissing);
        };

        let run_env = runtime_env::build_runtime_env(self.ambient, cfg);

        if stop_requested(interrupt, "prior-instance reset") {
            return Ok(LaunchOutcome::Interrupted);
        }
        instance::reset_prior_instances(&self.runner, cfg.settle_delay);

        if stop_requested(interrupt, "database migration") {
            return Ok(LaunchOutcome::Interrupted);
        }

        tracing::info!("Running database migrations...");
        let migrate = self.migrate_command(&manage_py).env(run_env.clone());
        let status = self.runner.run(&migrate)?;
        if !status.success() {
            return Err(LaunchError::Migration { code: status.code });
        }

        if stop_requested(interrupt, "server launch") {
            return Ok(LaunchOutcome::Interrupted);
        }
        let serve = self.serve_command(&manage_py).env(run_env);
        tracing::info!("{}", "-".repeat(50));
        tracing::info!("Port detected: {}", cfg.port);
        tracing::info!("Access URL: {}", cfg.app_url());
        tracing::info!("Command executed: {}", serve.display());
        tracing::info!("{}", "-".repeat(50));

        match self.runner.supervise(&serve, interrupt, cfg.stop_timeout)? {
            ServeOutcome::Exited(status) => {
                if status.success() {
                    tracing::info!("Label Studio exited");
                } else {
                    tracing::warn!(code = ?status.code, "Label Studio exited abnormally");
                }
                Ok(LaunchOutcome::Exited(status))
            }
            ServeOutcome::Interrupted => {
                tracing::info!("Label Studio stopped");
                Ok(LaunchOutcome::Interrupted)
            }
        }
    }

    /// Inspect the current state without touching the filesystem or processes.
    pub fn plan(&self) -> LaunchPlan {
        let cfg = self.config;
        let entry_point = venv::locate_entry_point(&self.layout);
        LaunchPlan {
            subdomain: cfg.subdomain.clone(),
            venv_dir: cfg.venv_dir.clone(),
            data_dir: cfg.data_dir.clone(),
            bind_addr: cfg.bind_addr(),
            app_url: cfg.app_url(),
            csrf_trusted_origins: cfg.csrf_trusted_origins(),
            secret_key_pinned: self.ambient.contains(platform::SECRET_KEY),
            venv_present: self.layout.exists(),
            app_installed: self.layout.is_installed(),
            data_dir_present: cfg.data_dir.exists(),
            migrate_command: entry_point
                .as_deref()
                .map(|p| self.migrate_command(p).display()),
            serve_command: entry_point
                .as_deref()
                .map(|p| self.serve_command(p).display()),
            entry_point,
        }
    }

    fn migrate_command(&self, manage_py: &Path) -> CommandSpec {
        CommandSpec::new(self.layout.python())
            .arg(manage_py.to_string_lossy())
            .arg("migrate")
    }

    /// Auto-reload stays off: the platform proxy expects one long-lived process.
    fn serve_command(&self, manage_py: &Path) -> CommandSpec {
        CommandSpec::new(self.layout.python())
            .arg(manage_py.to_string_lossy())
            .args(["runserver", self.config.bind_addr().as_str(), "--noreload"])
    }
}

fn stop_requested(interrupt: &InterruptFlag, next: &str) -> bool {
    let set = interrupt.is_set();
    if set {
        tracing::info!("Interrupted before {next}; stopping");
    }
    set
}
