//! Child environments for the install steps and for the application itself.

use std::collections::BTreeMap;

use rand::RngCore;
use studiolaunch_core::config::env_keys::child;
use studiolaunch_core::config::{EnvSnapshot, LaunchConfig};

/// Django settings module of the wrapped application.
pub const SETTINGS_MODULE: &str = "label_studio.core.settings.label_studio";

/// Random bytes in a generated secret key (hex-encoded to twice as many chars).
pub const SECRET_KEY_BYTES: usize = 24;

/// Fresh hex secret. Sessions signed with it do not survive a restart.
pub fn generate_secret_key() -> String {
    let mut bytes = [0u8; SECRET_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Ambient environment for venv creation and pip: user-site installs disabled
/// and `PYTHONPATH` blanked so nothing outside the venv shadows it.
pub fn install_env(ambient: &EnvSnapshot) -> BTreeMap<String, String> {
    let mut env = ambient.to_map();
    env.insert(child::PIP_USER.to_string(), "false".to_string());
    env.insert(child::PYTHONPATH.to_string(), String::new());
    env
}

/// Ambient environment plus the application's runtime overlay.
///
/// `SECRET_KEY` from the ambient environment is passed through untouched;
/// otherwise a new one is generated on every call.
pub fn build_runtime_env(ambient: &EnvSnapshot, config: &LaunchConfig) -> BTreeMap<String, String> {
    let mut env = ambient.to_map();
    let overlay = [
        (child::PYTHONUNBUFFERED, "1".to_string()),
        (child::DJANGO_SETTINGS_MODULE, SETTINGS_MODULE.to_string()),
        (
            child::LABEL_STUDIO_BASE_DATA_DIR,
            config.data_dir.to_string_lossy().into_owned(),
        ),
        (child::ALLOWED_HOSTS, "*".to_string()),
        (child::LABEL_STUDIO_DISABLE_TELEMETRY, "1".to_string()),
        // Without this the platform proxy's origin fails CSRF checks at login.
        (child::CSRF_TRUSTED_ORIGINS, config.csrf_trusted_origins()),
    ];
    for (key, value) in overlay {
        env.insert(key.to_string(), value);
    }
    if !ambient.contains(child::SECRET_KEY) {
        env.insert(child::SECRET_KEY.to_string(), generate_secret_key());
    }
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ambient(extra: &[(&str, &str)]) -> EnvSnapshot {
        let mut pairs = vec![
            ("PATH", "/usr/bin"),
            ("HOME", "/home/cdsw"),
            ("CDSW_DOMAIN", "ml.example.com"),
            ("ALLOWED_HOSTS", "example.org"),
        ];
        pairs.extend_from_slice(extra);
        EnvSnapshot::from_pairs(pairs)
    }

    #[test]
    fn test_overlay_values() {
        let env = ambient(&[]);
        let cfg = LaunchConfig::from_env(&env);
        let run_env = build_runtime_env(&env, &cfg);

        assert_eq!(run_env["PATH"], "/usr/bin");
        assert_eq!(run_env["PYTHONUNBUFFERED"], "1");
        assert_eq!(run_env["DJANGO_SETTINGS_MODULE"], SETTINGS_MODULE);
        assert_eq!(run_env["LABEL_STUDIO_BASE_DATA_DIR"], "/home/cdsw/label_studio_data");
        assert_eq!(run_env["ALLOWED_HOSTS"], "*");
        assert_eq!(run_env["LABEL_STUDIO_DISABLE_TELEMETRY"], "1");
        assert_eq!(run_env["CSRF_TRUSTED_ORIGINS"], "https://*.ml.example.com");
    }

    #[test]
    fn test_secret_key_passthrough() {
        let env = ambient(&[("SECRET_KEY", "pinned-by-operator")]);
        let cfg = LaunchConfig::from_env(&env);
        assert_eq!(build_runtime_env(&env, &cfg)["SECRET_KEY"], "pinned-by-operator");
        assert_eq!(build_runtime_env(&env, &cfg)["SECRET_KEY"], "pinned-by-operator");
    }

    #[test]
    fn test_secret_key_generated_fresh() {
        let env = ambient(&[]);
        let cfg = LaunchConfig::from_env(&env);
        let first = build_runtime_env(&env, &cfg)["SECRET_KEY"].clone();
        let second = build_runtime_env(&env, &cfg)["SECRET_KEY"].clone();
        assert_eq!(first.len(), SECRET_KEY_BYTES * 2);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_install_env_isolates_pip() {
        let env = install_env(&ambient(&[("PYTHONPATH", "/opt/site"), ("PIP_USER", "true")]));
        assert_eq!(env["PIP_USER"], "false");
        assert_eq!(env["PYTHONPATH"], "");
        assert_eq!(env["PATH"], "/usr/bin");
    }
}
