//! Launcher steps: venv provisioning, runtime environment, prior-instance reset
//! and a supervised server process.

pub mod error;
pub mod instance;
pub mod launcher;
pub mod process;
pub mod runtime_env;
pub mod supervisor;
pub mod venv;

pub use error::LaunchError;
pub use launcher::{LaunchOutcome, LaunchPlan, Launcher};
pub use process::{
    CommandOutput, CommandSpec, ProcessRunner, RunStatus, ServeOutcome, SystemRunner,
};
pub use supervisor::InterruptFlag;
