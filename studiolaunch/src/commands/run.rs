//! `studiolaunch run`: the full launch sequence.

use anyhow::Result;
use studiolaunch_core::config::{EnvSnapshot, LaunchConfig};
use studiolaunch_runtime::{InterruptFlag, LaunchOutcome, Launcher, SystemRunner};

pub fn cmd_run(config: &LaunchConfig, env: &EnvSnapshot) -> Result<i32> {
    let interrupt = InterruptFlag::install_ctrlc()?;
    let launcher = Launcher::new(config, env, SystemRunner);
    let outcome = launcher.run(&interrupt)?;
    Ok(exit_code(outcome))
}

/// Interrupts and a missing entry point are clean exits; a server that died
/// reports its own code (1 if killed by a signal).
fn exit_code(outcome: LaunchOutcome) -> i32 {
    match outcome {
        LaunchOutcome::Exited(status) if status.success() => 0,
        LaunchOutcome::Exited(status) => status.code.filter(|c| *c != 0).unwrap_or(1),
        LaunchOutcome::Interrupted | LaunchOutcome::EntryPointMissing => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studiolaunch_runtime::RunStatus;

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_code(LaunchOutcome::Exited(RunStatus::from_code(0))), 0);
        assert_eq!(exit_code(LaunchOutcome::Exited(RunStatus::from_code(137))), 137);
        assert_eq!(exit_code(LaunchOutcome::Exited(RunStatus { code: None })), 1);
        assert_eq!(exit_code(LaunchOutcome::Interrupted), 0);
        assert_eq!(exit_code(LaunchOutcome::EntryPointMissing), 0);
    }
}
