use crate::detector::DetectorConfig;
use crate::errors::ConfigLoadError;
use serde::{Deserialize, Serialize};
use std::{env, path::Path, path::PathBuf, str::FromStr};
use tokio::fs;
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config/detector.json";
pub const DEFAULT_ANNOTATION: &str = "Logged via shake";
pub const DEFAULT_SESSION_TTL_MS: u64 = 10 * 60 * 1000;
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(flatten)]
    pub detector: DetectorConfig,
    /// Note attached to every visit logged by shaking.
    pub annotation: String,
    /// Sessions without a batch for this long are evicted.
    pub session_ttl_ms: u64,
    /// Upper bound on live sessions; the least recently active goes first.
    pub max_sessions: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            annotation: DEFAULT_ANNOTATION.to_string(),
            session_ttl_ms: DEFAULT_SESSION_TTL_MS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

pub fn resolve_config_path() -> PathBuf {
    if let Ok(path) = env::var("SHAKE_CONFIG_PATH") {
        return PathBuf::from(path);
    }

    PathBuf::from(DEFAULT_CONFIG_PATH)
}

/// Reads settings from `path` (defaults when the file does not exist), then
/// applies `SHAKE_*` environment overrides and validates the result.
pub async fn load_settings(path: &Path) -> Result<Settings, ConfigLoadError> {
    let mut settings = read_settings_file(path).await?;
    apply_overrides(&mut settings, |key| env::var(key).ok())?;
    settings.detector.validate()?;
    Ok(settings)
}

async fn read_settings_file(path: &Path) -> Result<Settings, ConfigLoadError> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| ConfigLoadError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("no config file at {}, using defaults", path.display());
            Ok(Settings::default())
        }
        Err(source) => Err(ConfigLoadError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn apply_overrides(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigLoadError> {
    let detector = &mut settings.detector;
    if let Some(value) = parse_var(&lookup, "SHAKE_DELTA_THRESHOLD")? {
        detector.delta_threshold = value;
    }
    if let Some(value) = parse_var(&lookup, "SHAKE_SAMPLE_MIN_INTERVAL_MS")? {
        detector.sample_min_interval_ms = value;
    }
    if let Some(value) = parse_var(&lookup, "SHAKE_REQUIRED_CONSECUTIVE")? {
        detector.required_consecutive_shakes = value;
    }
    if let Some(value) = parse_var(&lookup, "SHAKE_MIN_EPISODE_MS")? {
        detector.min_episode_duration_ms = value;
    }
    if let Some(value) = parse_var(&lookup, "SHAKE_COOLDOWN_MS")? {
        detector.cooldown_ms = value;
    }
    if let Some(value) = parse_var(&lookup, "SHAKE_IDLE_RESET_MS")? {
        detector.idle_reset_ms = value;
    }
    if let Some(value) = parse_var(&lookup, "SHAKE_SESSION_TTL_MS")? {
        settings.session_ttl_ms = value;
    }
    if let Some(value) = parse_var(&lookup, "SHAKE_MAX_SESSIONS")? {
        settings.max_sessions = value;
    }
    if let Some(annotation) = lookup("SHAKE_ANNOTATION") {
        settings.annotation = annotation;
    }
    Ok(())
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigLoadError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigLoadError::Env { key, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigurationError;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = read_settings_file(&dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.detector.delta_threshold, 15.0);
        assert_eq!(settings.detector.sample_min_interval_ms, 100);
    }

    #[tokio::test]
    async fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"deltaThreshold": 50, "requiredConsecutiveShakes": 4, "annotation": "shaken"}}"#
        )
        .unwrap();

        let settings = read_settings_file(file.path()).await.unwrap();
        assert_eq!(settings.detector.delta_threshold, 50.0);
        assert_eq!(settings.detector.required_consecutive_shakes, 4);
        assert_eq!(settings.detector.cooldown_ms, 1000);
        assert_eq!(settings.annotation, "shaken");
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = read_settings_file(file.path()).await.unwrap_err();
        assert!(matches!(err, ConfigLoadError::Parse { .. }));
    }

    #[tokio::test]
    async fn invalid_file_values_are_rejected_on_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"cooldownMs": -5}}"#).unwrap();

        let err = load_settings(file.path()).await.unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::Invalid(ConfigurationError::NegativeDuration {
                field: "cooldownMs",
                value: -5
            })
        ));
    }

    #[test]
    fn overrides_replace_file_values() {
        let mut settings = Settings::default();
        let env = vars(&[
            ("SHAKE_DELTA_THRESHOLD", "22.5"),
            ("SHAKE_COOLDOWN_MS", " 2000 "),
            ("SHAKE_ANNOTATION", "via env"),
            ("SHAKE_MAX_SESSIONS", "16"),
        ]);
        apply_overrides(&mut settings, |key| env.get(key).cloned()).unwrap();

        assert_eq!(settings.detector.delta_threshold, 22.5);
        assert_eq!(settings.detector.cooldown_ms, 2000);
        assert_eq!(settings.detector.sample_min_interval_ms, 100);
        assert_eq!(settings.annotation, "via env");
        assert_eq!(settings.max_sessions, 16);
        assert_eq!(settings.session_ttl_ms, DEFAULT_SESSION_TTL_MS);
    }

    #[test]
    fn unparsable_override_names_the_variable() {
        let mut settings = Settings::default();
        let env = vars(&[("SHAKE_REQUIRED_CONSECUTIVE", "many")]);
        let err = apply_overrides(&mut settings, |key| env.get(key).cloned()).unwrap_err();
        match err {
            ConfigLoadError::Env { key, value } => {
                assert_eq!(key, "SHAKE_REQUIRED_CONSECUTIVE");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_override_parses_and_is_left_to_validation() {
        let mut settings = Settings::default();
        let env = vars(&[("SHAKE_IDLE_RESET_MS", "-1")]);
        apply_overrides(&mut settings, |key| env.get(key).cloned()).unwrap();
        assert_eq!(settings.detector.idle_reset_ms, -1);
        assert!(settings.detector.validate().is_err());
    }
}
