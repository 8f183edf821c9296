//! Tracing initialization.
//!
//! Uses [`ObservabilityConfig`] for STUDIOLAUNCH_QUIET, STUDIOLAUNCH_LOG_LEVEL and
//! STUDIOLAUNCH_LOG_JSON. Lines go to stdout, next to the child's inherited output,
//! so platform log collection sees one interleaved stream.

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::{EnvSnapshot, ObservabilityConfig};

/// Initialize tracing. Call once at process startup; later calls are no-ops.
/// `RUST_LOG` takes precedence over STUDIOLAUNCH_LOG_LEVEL.
pub fn init_tracing(env: &EnvSnapshot) {
    let cfg = ObservabilityConfig::from_env(env);
    let level = filter_directive(&cfg);

    let filter = env
        .get("RUST_LOG")
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stdout)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stdout)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

fn filter_directive(cfg: &ObservabilityConfig) -> String {
    if cfg.quiet {
        "warn".to_string()
    } else {
        cfg.log_level.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_overrides_level() {
        let env = EnvSnapshot::from_pairs([
            ("STUDIOLAUNCH_QUIET", "1"),
            ("STUDIOLAUNCH_LOG_LEVEL", "debug"),
        ]);
        assert_eq!(filter_directive(&ObservabilityConfig::from_env(&env)), "warn");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let env = EnvSnapshot::default();
        init_tracing(&env);
        init_tracing(&env);
    }
}
