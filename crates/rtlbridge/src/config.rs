//! Configuration file parsing and structures.
//!
//! rtlbridge uses a single TOML file describing how to launch the decoder,
//! which sensors to expose and how their services are labelled.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use crate::device::DeviceIdentity;
use crate::supervisor::DecoderCommand;

/// Default location of the rtl_433 binary.
pub const DEFAULT_DECODER_PROGRAM: &str = "/usr/local/bin/rtl_433";

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub decoder: DecoderConfig,

    #[serde(default)]
    pub translations: Translations,

    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"rtlbridge::decoder" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Build the subscriber filter for this logging configuration.
    pub fn targets(&self) -> Targets {
        self.overrides
            .iter()
            .fold(
                Targets::new().with_default(LevelFilter::from(self.level)),
                |targets, (target, level)| {
                    targets.with_target(target.clone(), LevelFilter::from(*level))
                },
            )
    }
}

fn default_program() -> PathBuf {
    PathBuf::from(DEFAULT_DECODER_PROGRAM)
}

fn default_true() -> bool {
    true
}

/// How the external rtl_433 process is launched
#[derive(Debug, Clone, Deserialize)]
pub struct DecoderConfig {
    /// Path to the rtl_433 binary
    #[serde(default = "default_program")]
    pub program: PathBuf,

    /// Kill already running instances of the program before spawning
    #[serde(default = "default_true")]
    pub kill_stale: bool,

    /// Arguments appended after the fixed `-q -F json -C si` set
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            kill_stale: true,
            extra_args: Vec::new(),
        }
    }
}

impl DecoderConfig {
    pub fn command(&self) -> DecoderCommand {
        DecoderCommand::rtl_433(self.program.clone(), self.extra_args.clone())
            .kill_stale(self.kill_stale)
    }
}

/// Display labels for the sensor services
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Translations {
    #[serde(default = "Translations::default_humidity")]
    pub humidity: String,

    #[serde(default = "Translations::default_temperature")]
    pub temperature: String,
}

impl Translations {
    fn default_humidity() -> String {
        "humidity".to_string()
    }

    fn default_temperature() -> String {
        "temperature".to_string()
    }
}

impl Default for Translations {
    fn default() -> Self {
        Self {
            humidity: Self::default_humidity(),
            temperature: Self::default_temperature(),
        }
    }
}

/// One configured sensor
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub name: String,

    #[serde(default)]
    pub watch_battery: bool,

    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub channel: Option<i64>,

    #[serde(default)]
    pub rid: Option<i64>,

    #[serde(default)]
    pub model: Option<String>,
}

impl From<&DeviceConfig> for DeviceIdentity {
    fn from(cfg: &DeviceConfig) -> Self {
        DeviceIdentity::new(cfg.name.clone())
            .with_watch_battery(cfg.watch_battery)
            .with_id(cfg.id)
            .with_channel(cfg.channel)
            .with_rid(cfg.rid)
            .with_model(cfg.model.clone())
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML source
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, device) in self.devices.iter().enumerate() {
            if device.name.trim().is_empty() {
                return Err(ConfigError::Validation {
                    field_path: format!("devices[{}].name", index),
                    message: "device name must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Identities of all configured devices, in configuration order
    pub fn identities(&self) -> Vec<DeviceIdentity> {
        self.devices.iter().map(DeviceIdentity::from).collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field_path}: {message}")]
    Validation { field_path: String, message: String },
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.decoder.program, PathBuf::from(DEFAULT_DECODER_PROGRAM));
        assert!(config.decoder.kill_stale);
        assert_eq!(config.translations, Translations::default());
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [logging]
            level = "debug"

            [logging.overrides]
            "rtlbridge::decoder" = "trace"

            [decoder]
            program = "/opt/rtl_433/bin/rtl_433"
            kill_stale = false
            extra_args = ["-f", "868M"]

            [translations]
            temperature = "Temperatur"
            humidity = "Luftfeuchtigkeit"

            [[devices]]
            name = "Patio"
            watch_battery = true
            id = 7
            channel = 1

            [[devices]]
            name = "Cellar"
            model = "Nexus-TH"
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(
            config.logging.overrides.get("rtlbridge::decoder"),
            Some(&LogLevel::Trace)
        );
        assert!(!config.decoder.kill_stale);
        assert_eq!(config.decoder.extra_args, vec!["-f", "868M"]);
        assert_eq!(config.translations.temperature, "Temperatur");
        assert_eq!(config.devices.len(), 2);

        let patio = &config.devices[0];
        assert_eq!(patio.name, "Patio");
        assert!(patio.watch_battery);
        assert_eq!(patio.id, Some(7));
        assert_eq!(patio.channel, Some(1));
        assert_eq!(patio.rid, None);

        let cellar = &config.devices[1];
        assert!(!cellar.watch_battery);
        assert_eq!(cellar.model.as_deref(), Some("Nexus-TH"));
    }

    #[test]
    fn test_partial_translations_fall_back() {
        let config = Config::from_toml(
            r#"
            [translations]
            humidity = "Feuchte"
            "#,
        )
        .unwrap();
        assert_eq!(config.translations.humidity, "Feuchte");
        assert_eq!(config.translations.temperature, "temperature");
    }

    #[test]
    fn test_decoder_command_from_config() {
        let config = Config::from_toml(
            r#"
            [decoder]
            extra_args = ["-R", "19"]
            "#,
        )
        .unwrap();
        let command = config.decoder.command();
        assert_eq!(command.program(), Path::new(DEFAULT_DECODER_PROGRAM));
        assert_eq!(command.args(), ["-q", "-F", "json", "-C", "si", "-R", "19"]);
        assert!(command.kills_stale());
    }

    #[test]
    fn test_empty_device_name_rejected() {
        let err = Config::from_toml(
            r#"
            [[devices]]
            name = "  "
            id = 3
            "#,
        )
        .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"Invalid value for devices[0].name: device name must not be empty");
    }

    #[test]
    fn test_missing_device_name_is_parse_error() {
        let err = Config::from_toml(
            r#"
            [[devices]]
            id = 3
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[devices]]
            name = "Kitchen"
            rid = 42
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        let identities = config.identities();
        assert_eq!(identities.len(), 1);
        assert_eq!(identities[0].name(), "Kitchen");
        assert_eq!(identities[0].rid(), Some(42));
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml(include_str!("../../../rtlbridge.example.toml")).unwrap();
        let names: Vec<_> = config.devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Patio", "Cellar"]);
        assert_eq!(config.logging.overrides["rtlbridge::dispatcher"], LogLevel::Debug);
    }
}
