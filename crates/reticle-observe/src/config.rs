use std::io::IsTerminal;

use serde::{Deserialize, Serialize};

use crate::{LoggerFormat, LoggerLevel, LoggerTimeZone};

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Output format.
    pub format: LoggerFormat,
    /// Filter expression (e.g. `"info"`, `"reticle_core=debug,info"`).
    pub level: LoggerLevel,
    /// Timezone used for timestamps.
    pub tz: LoggerTimeZone,
    /// Include module targets in output.
    pub with_targets: bool,
    /// Allow ANSI colors; only honored when stdout is a terminal.
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
        }
    }
}

impl LoggerConfig {
    /// Color is used only when enabled and stdout is a terminal.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = LoggerConfig::default();

        assert_eq!(config.format, LoggerFormat::Text);
        assert_eq!(config.tz, LoggerTimeZone::Utc);
        assert_eq!(config.level.as_str(), "info");
        assert!(config.with_targets);
        assert!(config.use_color);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: LoggerConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.level.as_str(), "info");
        assert_eq!(config.format, LoggerFormat::Text);
        assert_eq!(config.tz, LoggerTimeZone::Utc);
    }

    #[test]
    fn partial_deserialization() {
        let json = r#"{"format": "json", "level": "reticle_core=debug,info", "tz": "local"}"#;
        let config: LoggerConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.format, LoggerFormat::Json);
        assert_eq!(config.level.as_str(), "reticle_core=debug,info");
        assert_eq!(config.tz, LoggerTimeZone::Local);
        assert!(config.use_color);
    }

    #[test]
    fn invalid_level_is_rejected_at_parse_time() {
        let json = r#"{"level": "reticle=notalevel"}"#;
        assert!(serde_json::from_str::<LoggerConfig>(json).is_err());
    }
}
