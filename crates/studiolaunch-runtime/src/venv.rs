//! Build the application's Python virtual environment and locate its entry point.
//!
//! Every step is an existence check followed by an action, so a crashed run is
//! recovered by simply running again: satisfied steps report
//! [`StepOutcome::AlreadySatisfied`] and are skipped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::LaunchError;
use crate::process::{CommandSpec, ProcessRunner};

/// Package installed into the venv.
pub const APP_PACKAGE: &str = "label-studio";

/// Console script whose presence marks a completed install.
pub const INSTALL_MARKER: &str = "label-studio";

/// Interpreters tried on PATH when no base interpreter is configured.
pub const PYTHON_CANDIDATES: &[&str] = &["python3", "python"];

/// Packaging tools upgraded before the application install.
const BOOTSTRAP_PACKAGES: &[&str] = &["pip", "setuptools", "wheel"];

/// Result of an idempotent setup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    AlreadySatisfied,
    Performed,
}

/// Paths inside a venv rooted at `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenvLayout {
    root: PathBuf,
}

impl VenvLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn python(&self) -> PathBuf {
        self.root.join("bin").join("python3")
    }

    pub fn pip(&self) -> PathBuf {
        self.root.join("bin").join("pip")
    }

    pub fn install_marker(&self) -> PathBuf {
        self.root.join("bin").join(INSTALL_MARKER)
    }

    pub fn exists(&self) -> bool {
        self.root.exists()
    }

    pub fn is_installed(&self) -> bool {
        self.install_marker().exists()
    }

    /// Glob for the management script. The interpreter's minor version is not
    /// known in advance, hence `python*`.
    pub fn entry_point_pattern(&self) -> String {
        format!(
            "{}/lib/python*/site-packages/label_studio/manage.py",
            glob::Pattern::escape(&self.root.to_string_lossy())
        )
    }
}

/// Resolve the interpreter that creates the venv: the configured one, or the
/// first of [`PYTHON_CANDIDATES`] found on PATH.
pub fn resolve_base_python(configured: Option<&Path>) -> Result<PathBuf, LaunchError> {
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }
    PYTHON_CANDIDATES
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| LaunchError::PythonNotFound {
            tried: PYTHON_CANDIDATES.join(", "),
        })
}

/// Create the venv if its root is missing.
pub fn ensure_venv(
    layout: &VenvLayout,
    base_python: Option<&Path>,
    env: &BTreeMap<String, String>,
    runner: &dyn ProcessRunner,
) -> Result<StepOutcome, LaunchError> {
    if layout.exists() {
        return Ok(StepOutcome::AlreadySatisfied);
    }

    let python = resolve_base_python(base_python)?;
    tracing::info!(path = %layout.root().display(), "Creating virtual environment...");
    let cmd = CommandSpec::new(python)
        .args(["-m", "venv"])
        .arg(layout.root().to_string_lossy())
        .env(env.clone());
    let status = runner.run(&cmd)?;
    if !status.success() {
        return Err(LaunchError::EnvironmentCreation {
            path: layout.root().to_path_buf(),
            code: status.code,
        });
    }
    Ok(StepOutcome::Performed)
}

/// Install the application unless the install marker is already present.
pub fn ensure_installed(
    layout: &VenvLayout,
    env: &BTreeMap<String, String>,
    runner: &dyn ProcessRunner,
) -> Result<StepOutcome, LaunchError> {
    if layout.is_installed() {
        return Ok(StepOutcome::AlreadySatisfied);
    }

    tracing::info!("Installing Label Studio. This may take up to 20 minutes...");
    let steps = [
        (
            "upgrade packaging tools",
            CommandSpec::new(layout.pip())
                .args(["install", "--upgrade"])
                .args(BOOTSTRAP_PACKAGES.iter().copied()),
        ),
        (
            "install application",
            CommandSpec::new(layout.pip()).args(["install", APP_PACKAGE, "--ignore-installed"]),
        ),
    ];
    for (step, cmd) in steps {
        let cmd = cmd.env(env.clone());
        tracing::debug!(step, command = %cmd.display(), "pip");
        let status = runner.run(&cmd)?;
        if !status.success() {
            return Err(LaunchError::Install {
                step: step.to_string(),
                code: status.code,
            });
        }
    }
    Ok(StepOutcome::Performed)
}

/// Create the persistent data directory if missing. Never deletes anything.
pub fn ensure_data_dir(path: &Path) -> Result<StepOutcome, LaunchError> {
    if path.exists() {
        return Ok(StepOutcome::AlreadySatisfied);
    }
    tracing::info!(path = %path.display(), "Creating data directory");
    std::fs::create_dir_all(path)
        .map_err(|e| LaunchError::io(format!("Create data dir {}", path.display()), e))?;
    Ok(StepOutcome::Performed)
}

/// First match (in sorted order) of the entry-point glob, or `None`.
pub fn locate_entry_point(layout: &VenvLayout) -> Option<PathBuf> {
    let pattern = layout.entry_point_pattern();
    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "Invalid entry point pattern");
            return None;
        }
    };
    let mut found: Vec<PathBuf> = paths.filter_map(Result::ok).collect();
    found.sort();
    found.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{CommandOutput, RunStatus, ServeOutcome};
    use crate::supervisor::InterruptFlag;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records commands and answers every `run` with a fixed exit code.
    struct FixedRunner {
        code: i32,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl FixedRunner {
        fn new(code: i32) -> Self {
            Self {
                code,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<CommandSpec> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ProcessRunner for FixedRunner {
        fn run(&self, cmd: &CommandSpec) -> Result<RunStatus, LaunchError> {
            self.calls.lock().unwrap().push(cmd.clone());
            Ok(RunStatus::from_code(self.code))
        }

        fn capture(&self, _cmd: &CommandSpec) -> Result<CommandOutput, LaunchError> {
            unreachable!("venv steps never capture output")
        }

        fn supervise(
            &self,
            _cmd: &CommandSpec,
            _interrupt: &InterruptFlag,
            _grace: Duration,
        ) -> Result<ServeOutcome, LaunchError> {
            unreachable!("venv steps never supervise")
        }
    }

    #[test]
    fn test_layout_paths() {
        let layout = VenvLayout::new("/home/cdsw/.ls_venv");
        assert_eq!(layout.python(), PathBuf::from("/home/cdsw/.ls_venv/bin/python3"));
        assert_eq!(layout.pip(), PathBuf::from("/home/cdsw/.ls_venv/bin/pip"));
        assert_eq!(
            layout.install_marker(),
            PathBuf::from("/home/cdsw/.ls_venv/bin/label-studio")
        );
        assert_eq!(
            layout.entry_point_pattern(),
            "/home/cdsw/.ls_venv/lib/python*/site-packages/label_studio/manage.py"
        );
    }

    #[test]
    fn test_ensure_venv_skips_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FixedRunner::new(0);
        let outcome = ensure_venv(&VenvLayout::new(tmp.path()), None, &BTreeMap::new(), &runner).unwrap();
        assert_eq!(outcome, StepOutcome::AlreadySatisfied);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_ensure_venv_runs_configured_python() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = VenvLayout::new(tmp.path().join(".ls_venv"));
        let runner = FixedRunner::new(0);
        let outcome = ensure_venv(
            &layout,
            Some(Path::new("/opt/python/bin/python3.11")),
            &BTreeMap::new(),
            &runner,
        )
        .unwrap();
        assert_eq!(outcome, StepOutcome::Performed);
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, PathBuf::from("/opt/python/bin/python3.11"));
        assert_eq!(calls[0].args[..2], ["-m".to_string(), "venv".to_string()]);
    }

    #[test]
    fn test_ensure_venv_failure_carries_code() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = VenvLayout::new(tmp.path().join(".ls_venv"));
        let err = ensure_venv(&layout, Some(Path::new("python3")), &BTreeMap::new(), &FixedRunner::new(2))
            .unwrap_err();
        assert!(matches!(err, LaunchError::EnvironmentCreation { code: Some(2), .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_ensure_installed_skips_when_marker_present() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = VenvLayout::new(tmp.path());
        fs::create_dir_all(tmp.path().join("bin")).unwrap();
        fs::write(layout.install_marker(), "#!/bin/sh\n").unwrap();

        let runner = FixedRunner::new(0);
        let outcome = ensure_installed(&layout, &BTreeMap::new(), &runner).unwrap();
        assert_eq!(outcome, StepOutcome::AlreadySatisfied);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_ensure_installed_upgrades_then_installs() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = VenvLayout::new(tmp.path());
        let runner = FixedRunner::new(0);
        ensure_installed(&layout, &BTreeMap::new(), &runner).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args, ["install", "--upgrade", "pip", "setuptools", "wheel"]);
        assert_eq!(calls[1].args, ["install", "label-studio", "--ignore-installed"]);
        assert!(calls.iter().all(|c| c.program == layout.pip()));
    }

    #[test]
    fn test_ensure_installed_stops_at_first_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let runner = FixedRunner::new(1);
        let err = ensure_installed(&VenvLayout::new(tmp.path()), &BTreeMap::new(), &runner).unwrap_err();
        assert!(matches!(err, LaunchError::Install { ref step, .. } if step == "upgrade packaging tools"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_ensure_data_dir_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("label_studio_data");
        assert_eq!(ensure_data_dir(&data).unwrap(), StepOutcome::Performed);
        fs::write(data.join("label_studio.sqlite3"), "db").unwrap();
        assert_eq!(ensure_data_dir(&data).unwrap(), StepOutcome::AlreadySatisfied);
        assert!(data.join("label_studio.sqlite3").exists());
    }

    #[test]
    fn test_locate_entry_point_any_minor_version() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = VenvLayout::new(tmp.path());
        assert_eq!(locate_entry_point(&layout), None);

        let pkg = tmp.path().join("lib/python3.12/site-packages/label_studio");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("manage.py"), "").unwrap();
        assert_eq!(locate_entry_point(&layout), Some(pkg.join("manage.py")));
    }

    #[test]
    fn test_locate_entry_point_escapes_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("odd[dir]");
        let pkg = root.join("lib/python3.10/site-packages/label_studio");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("manage.py"), "").unwrap();
        assert_eq!(locate_entry_point(&VenvLayout::new(&root)), Some(pkg.join("manage.py")));
    }
}
