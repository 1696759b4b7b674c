use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

pub const ENV_EMPTY_STRING_IS_NULL: &str = "FILTER_EMPTY_STRING_IS_NULL";
pub const ENV_INLINE_LITERALS: &str = "FILTER_INLINE_LITERALS";
pub const ENV_OBJECT_PREFIX: &str = "FILTER_OBJECT_PREFIX";

/// Function type for reading environment variables
pub type EnvGetter = fn(&str) -> Option<String>;

/// Settings that shape how expressions are lowered into filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Treat the empty string and NULL as the same value when comparing
    /// against `""` on a relational backend.
    pub empty_string_is_null: bool,

    /// Render relational literals inline instead of as bound parameters.
    pub inline_literals: bool,

    /// Name that addresses the row under test, e.g. `object.name`.
    pub object_prefix: String,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            empty_string_is_null: false,
            inline_literals: false,
            object_prefix: "object".to_string(),
        }
    }
}

impl CompilerSettings {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading compiler settings from {}", path.display());
        let source = std::fs::read_to_string(path)?;
        Self::from_json(&source)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Applies environment overrides read through `env_getter`.
    pub fn with_env(mut self, env_getter: EnvGetter) -> Result<Self, ConfigError> {
        if let Some(raw) = env_getter(ENV_EMPTY_STRING_IS_NULL) {
            self.empty_string_is_null = parse_flag(ENV_EMPTY_STRING_IS_NULL, &raw)?;
        }
        if let Some(raw) = env_getter(ENV_INLINE_LITERALS) {
            self.inline_literals = parse_flag(ENV_INLINE_LITERALS, &raw)?;
        }
        if let Some(prefix) = env_getter(ENV_OBJECT_PREFIX) {
            let prefix = prefix.trim();
            if prefix.is_empty() || prefix.contains('.') {
                return Err(ConfigError::InvalidEnvValue {
                    var: ENV_OBJECT_PREFIX.to_string(),
                    value: prefix.to_string(),
                });
            }
            self.object_prefix = prefix.to_string();
        }
        Ok(self)
    }
}

fn parse_flag(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvValue {
            var: var.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env(_key: &str) -> Option<String> {
        None
    }

    fn compat_env(key: &str) -> Option<String> {
        match key {
            ENV_EMPTY_STRING_IS_NULL => Some("TRUE".to_string()),
            ENV_OBJECT_PREFIX => Some("row".to_string()),
            _ => None,
        }
    }

    fn broken_env(key: &str) -> Option<String> {
        (key == ENV_INLINE_LITERALS).then(|| "maybe".to_string())
    }

    #[test]
    fn test_defaults() {
        let settings = CompilerSettings::default().with_env(no_env).unwrap();
        assert!(!settings.empty_string_is_null);
        assert!(!settings.inline_literals);
        assert_eq!(settings.object_prefix, "object");
    }

    #[test]
    fn test_env_overrides() {
        let settings = CompilerSettings::default().with_env(compat_env).unwrap();
        assert!(settings.empty_string_is_null);
        assert_eq!(settings.object_prefix, "row");
    }

    #[test]
    fn test_invalid_env_flag() {
        let result = CompilerSettings::default().with_env(broken_env);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidEnvValue { ref var, .. }) if var == ENV_INLINE_LITERALS
        ));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = CompilerSettings::from_json(r#"{"inline_literals": true}"#).unwrap();
        assert!(settings.inline_literals);
        assert_eq!(settings.object_prefix, "object");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"empty_string_is_null": true}}"#).unwrap();

        let settings = CompilerSettings::from_file(file.path()).unwrap();
        assert!(settings.empty_string_is_null);
    }
}
