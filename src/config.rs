//! Runtime configuration from environment variables.

use std::path::PathBuf;

pub const MODEL_PATH_ENV: &str = "NEURODX_MODEL_PATH";
pub const REQUIRE_SIGNED_MODEL_ENV: &str = "NEURODX_REQUIRE_SIGNED_MODEL";
pub const MODEL_PUBKEY_ENV: &str = "NEURODX_MODEL_PUBKEY_B64";
pub const LOG_MODE_ENV: &str = "NEURODX_LOG_MODE";
pub const LOG_FILE_ENV: &str = "NEURODX_LOG_FILE";

const DEFAULT_MODEL_PATH: &str = "models/classifier.json";
const DEFAULT_LOG_FILE: &str = "neurodx.log";

/// Where formatted log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stdout,
    Stderr,
    File,
}

impl LogMode {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdout" => Some(Self::Stdout),
            "file" => Some(Self::File),
            // stdout carries command output, so auto logs to stderr
            "stderr" | "auto" => Some(Self::Stderr),
            _ => None,
        }
    }
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Classifier artifact location
    pub model_path: PathBuf,

    /// Refuse artifacts that have no signed manifest
    pub require_signed_model: bool,

    /// Trusted Ed25519 public key for manifest verification (base64)
    pub model_pubkey_b64: Option<String>,

    pub log_mode: LogMode,
    pub log_file: PathBuf,

    /// Variables that were set but not understood, with their raw value.
    /// Defaults were used in their place.
    pub unrecognized: Vec<(&'static str, String)>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            require_signed_model: false,
            model_pubkey_b64: None,
            log_mode: LogMode::Stderr,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            unrecognized: Vec::new(),
        }
    }
}

impl Settings {
    /// Build settings from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut unrecognized = Vec::new();

        let require_signed_model = match non_empty(REQUIRE_SIGNED_MODEL_ENV) {
            Some(v) => parse_bool(&v).unwrap_or_else(|| {
                unrecognized.push((REQUIRE_SIGNED_MODEL_ENV, v));
                defaults.require_signed_model
            }),
            None => defaults.require_signed_model,
        };
        let log_mode = match non_empty(LOG_MODE_ENV) {
            Some(v) => LogMode::parse(&v).unwrap_or_else(|| {
                unrecognized.push((LOG_MODE_ENV, v));
                defaults.log_mode
            }),
            None => defaults.log_mode,
        };

        Self {
            model_path: non_empty(MODEL_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            require_signed_model,
            model_pubkey_b64: non_empty(MODEL_PUBKEY_ENV).map(|v| v.trim().to_string()),
            log_mode,
            log_file: non_empty(LOG_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
            unrecognized,
        }
    }

    /// Warn about every variable in `unrecognized`. Call once logging is up.
    pub fn warn_unrecognized(&self) {
        for (name, value) in &self.unrecognized {
            tracing::warn!("Ignoring unrecognized value {value:?} for {name}; using the default");
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(vars: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]);
        assert_eq!(settings.model_path, PathBuf::from("models/classifier.json"));
        assert!(!settings.require_signed_model);
        assert!(settings.model_pubkey_b64.is_none());
        assert_eq!(settings.log_mode, LogMode::Stderr);
    }

    #[test]
    fn test_overrides() {
        let settings = settings_from(&[
            (MODEL_PATH_ENV, "/srv/models/gbdt.json"),
            (REQUIRE_SIGNED_MODEL_ENV, "YES"),
            (MODEL_PUBKEY_ENV, " abc= "),
            (LOG_MODE_ENV, "file"),
            (LOG_FILE_ENV, "/var/log/neurodx.log"),
        ]);
        assert_eq!(settings.model_path, PathBuf::from("/srv/models/gbdt.json"));
        assert!(settings.require_signed_model);
        assert_eq!(settings.model_pubkey_b64.as_deref(), Some("abc="));
        assert_eq!(settings.log_mode, LogMode::File);
        assert_eq!(settings.log_file, PathBuf::from("/var/log/neurodx.log"));
    }

    #[test]
    fn test_bool_parsing() {
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("True"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("on"), None);
    }

    #[test]
    fn test_unrecognized_values_are_recorded() {
        let settings = settings_from(&[
            (LOG_MODE_ENV, "syslog"),
            (REQUIRE_SIGNED_MODEL_ENV, "maybe"),
            (MODEL_PATH_ENV, "/srv/models/gbdt.json"),
        ]);
        assert_eq!(settings.log_mode, LogMode::Stderr);
        assert!(!settings.require_signed_model);
        assert_eq!(
            settings.unrecognized,
            vec![
                (REQUIRE_SIGNED_MODEL_ENV, "maybe".to_string()),
                (LOG_MODE_ENV, "syslog".to_string()),
            ]
        );
    }

    #[test]
    fn test_known_values_not_recorded() {
        let settings = settings_from(&[(LOG_MODE_ENV, "AUTO"), (REQUIRE_SIGNED_MODEL_ENV, "false")]);
        assert_eq!(settings.log_mode, LogMode::Stderr);
        assert!(settings.unrecognized.is_empty());
    }

    #[test]
    fn test_empty_values_fall_back() {
        let settings = settings_from(&[(MODEL_PATH_ENV, "  "), (MODEL_PUBKEY_ENV, "")]);
        assert_eq!(settings.model_path, PathBuf::from("models/classifier.json"));
        assert!(settings.model_pubkey_b64.is_none());
    }
}
