//! Marshaller configuration
//!
//! Options come from defaults, then an optional TOML file, then `OCAP_*`
//! environment variables, each layer overriding the one before.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors from loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read or written
    #[error("Configuration I/O failed: {message}")]
    Io {
        /// Error message
        message: String,
    },

    /// The configuration file is not valid TOML for these options
    #[error("Configuration parse failed: {message}")]
    Parse {
        /// Error message
        message: String,
    },

    /// A field holds an unusable value
    #[error("Invalid configuration for {field}: {message}")]
    Invalid {
        /// The offending field
        field: String,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create an I/O error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create an invalid field error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Configuration validation trait
pub trait ConfigValidation {
    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Configuration defaults trait
pub trait ConfigDefaults {
    /// Create configuration with default values
    fn defaults() -> Self;
}

/// Whether outgoing errors carry correlation ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorTagging {
    /// Attach `errorId` and note the original error
    #[default]
    On,
    /// Send name and message only
    Off,
}

impl FromStr for ErrorTagging {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(ErrorTagging::On),
            "off" => Ok(ErrorTagging::Off),
            other => Err(ConfigError::invalid(
                "error_tagging",
                format!("expected \"on\" or \"off\", got {other:?}"),
            )),
        }
    }
}

/// Body format produced by `to_capdata`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    /// JSON with `@qclass` envelopes
    #[default]
    Capdata,
    /// `#`-prefixed JSON with reserved string prefixes
    Smallcaps,
}

impl FromStr for BodyFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "capdata" => Ok(BodyFormat::Capdata),
            "smallcaps" => Ok(BodyFormat::Smallcaps),
            other => Err(ConfigError::invalid(
                "body_format",
                format!("expected \"capdata\" or \"smallcaps\", got {other:?}"),
            )),
        }
    }
}

/// Marshaller options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarshalOptions {
    /// Whether outgoing errors are tagged with ids
    pub error_tagging: ErrorTagging,
    /// Name used inside error ids
    pub marshal_name: String,
    /// Starting value of the error id counter; the first id is one more
    pub error_id_num: u64,
    /// Body format for encoding; decoding accepts both
    pub body_format: BodyFormat,
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self::defaults()
    }
}

impl ConfigDefaults for MarshalOptions {
    fn defaults() -> Self {
        Self {
            error_tagging: ErrorTagging::On,
            marshal_name: "anon-marshal".to_string(),
            error_id_num: 10_000,
            body_format: BodyFormat::Capdata,
        }
    }
}

impl ConfigValidation for MarshalOptions {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.marshal_name.is_empty() {
            return Err(ConfigError::invalid("marshal_name", "must not be empty"));
        }
        if self.marshal_name.contains('#') {
            return Err(ConfigError::invalid(
                "marshal_name",
                format!("must not contain '#': {:?}", self.marshal_name),
            ));
        }
        Ok(())
    }
}

impl MarshalOptions {
    /// Options that encode Smallcaps
    pub fn smallcaps() -> Self {
        Self {
            body_format: BodyFormat::Smallcaps,
            ..Self::defaults()
        }
    }

    /// Set the body format
    pub fn with_body_format(mut self, body_format: BodyFormat) -> Self {
        self.body_format = body_format;
        self
    }

    /// Set error tagging
    pub fn with_error_tagging(mut self, error_tagging: ErrorTagging) -> Self {
        self.error_tagging = error_tagging;
        self
    }

    /// Set the name used inside error ids
    pub fn with_marshal_name(mut self, marshal_name: impl Into<String>) -> Self {
        self.marshal_name = marshal_name.into();
        self
    }

    /// Parse options from TOML text; missing fields keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let options: Self = toml::from_str(text).map_err(|e| ConfigError::parse(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::parse(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| ConfigError::io(format!("{}: {e}", path.display())))
    }

    /// Merge with `OCAP_*` environment variables
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_with_vars(std::env::vars())
    }

    /// Merge with the `OCAP_*` entries of an explicit variable list
    pub fn merge_with_vars<K, V>(&mut self, vars: impl IntoIterator<Item = (K, V)>) -> Result<(), ConfigError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                "OCAP_ERROR_TAGGING" => self.error_tagging = value.parse()?,
                "OCAP_MARSHAL_NAME" => self.marshal_name = value.to_string(),
                "OCAP_ERROR_ID_NUM" => {
                    self.error_id_num = value.parse().map_err(|e| {
                        ConfigError::invalid("error_id_num", format!("{value:?}: {e}"))
                    })?;
                }
                "OCAP_BODY_FORMAT" => self.body_format = value.parse()?,
                _ => {}
            }
        }
        self.validate()
    }
}
