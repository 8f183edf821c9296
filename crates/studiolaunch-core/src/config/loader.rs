//! Environment snapshot and lookup helpers.
//!
//! The snapshot is taken once at startup and never written back to the process
//! environment, so child environments are always derived from the same view.

use std::collections::BTreeMap;
use std::path::Path;

/// Immutable view of the process environment, optionally merged with a `.env` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment. Non-UTF-8 entries are skipped.
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Merge `KEY=value` lines from a `.env` file. Existing keys win.
    /// Returns the number of keys added, or `None` when the file is missing
    /// or unreadable (the snapshot is then unchanged). Runs before tracing is
    /// set up, so the caller logs the result.
    pub fn merge_dotenv(&mut self, path: &Path) -> Option<usize> {
        let content = std::fs::read_to_string(path).ok()?;
        let mut merged = 0usize;
        for (key, value) in parse_dotenv(&content) {
            if !self.vars.contains_key(&key) {
                self.vars.insert(key, value);
                merged += 1;
            }
        }
        Some(merged)
    }

    /// Raw lookup. Empty values are returned as-is.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Read primary key or the first set alias; empty values fall back to `default`.
    pub fn env_or<F>(&self, primary: &str, aliases: &[&str], default: F) -> String
    where
        F: FnOnce() -> String,
    {
        self.lookup(primary, aliases)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(default)
    }

    /// Like [`env_or`](Self::env_or) but returns `None` for unset or blank values.
    pub fn env_optional(&self, primary: &str, aliases: &[&str]) -> Option<String> {
        self.lookup(primary, aliases).and_then(|s| {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        })
    }

    /// Boolean flag: 0/false/no/off are false, anything else set is true.
    pub fn env_bool(&self, primary: &str, aliases: &[&str], default: bool) -> bool {
        match self.lookup(primary, aliases) {
            Some(s) => !matches!(
                s.trim().to_lowercase().as_str(),
                "0" | "false" | "no" | "off"
            ),
            None => default,
        }
    }

    /// Parse a value; unset, blank or unparsable values yield `None`.
    pub fn env_parse<T: std::str::FromStr>(&self, primary: &str, aliases: &[&str]) -> Option<T> {
        self.env_optional(primary, aliases)
            .and_then(|s| s.parse::<T>().ok())
    }

    /// Owned copy of all variables, the starting point for child environments.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.vars.clone()
    }

    fn lookup(&self, primary: &str, aliases: &[&str]) -> Option<&str> {
        self.get(primary)
            .or_else(|| aliases.iter().find_map(|a| self.get(a)))
    }
}

/// Parse `.env` content: `KEY=value`, `#` comments, optional quotes,
/// inline comments stripped when the value is unquoted.
pub fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some(eq_pos) = line.find('=') else {
            continue;
        };
        let key = line[..eq_pos].trim();
        let mut value = line[eq_pos + 1..].trim();
        if let Some(hash_pos) = value.find('#') {
            let before_hash = value[..hash_pos].trim_end();
            if !before_hash.contains('"') && !before_hash.contains('\'') {
                value = before_hash;
            }
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            out.push((key.to_string(), value.to_string()));
        }
    }
    out
}
