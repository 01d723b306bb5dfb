//! Bridge configuration
//!
//! Loaded from TOML. Every table and field is optional; a missing file section
//! leaves the defaults in place.
//!
//! ```toml
//! [runtime]
//! python_library = "libpython3.11.so.1.0"
//!
//! [errors]
//! print_tracebacks = true
//!
//! [strings]
//! wrap_unencodable = false
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{BridgeError, BridgeResult};
use crate::logging::LogConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub runtime: RuntimeConfig,
    pub errors: ErrorConfig,
    pub strings: StringConfig,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Shared Python library to load with global symbol visibility before the
    /// interpreter starts. Needed when the host loads the bridge as a Lua module
    /// and Python extension modules must resolve interpreter symbols.
    pub python_library: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorConfig {
    /// Print the Python traceback to stderr when a foreign call fails
    pub print_tracebacks: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringConfig {
    /// Hand out a string proxy instead of failing when a Python str
    /// cannot be encoded as UTF-8 (lone surrogates)
    pub wrap_unencodable: bool,
}

impl BridgeConfig {
    pub fn from_toml_str(source: &str) -> BridgeResult<Self> {
        toml::from_str(source).map_err(|e| BridgeError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{LogFormat, LogOutput};

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert!(!config.errors.print_tracebacks);
        assert!(!config.strings.wrap_unencodable);
        assert_eq!(config.runtime.python_library, None);
    }

    #[test]
    fn test_partial_sections() {
        let config = BridgeConfig::from_toml_str(
            r#"
            [errors]
            print_tracebacks = true

            [logging]
            level = "debug"
            format = "json"
            output = { kind = "file", directory = "/tmp/luapy", prefix = "bridge" }
            "#,
        )
        .unwrap();

        assert!(config.errors.print_tracebacks);
        assert!(!config.strings.wrap_unencodable);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(
            config.logging.output,
            LogOutput::File {
                directory: "/tmp/luapy".to_string(),
                prefix: "bridge".to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_config_is_reported() {
        let err = BridgeConfig::from_toml_str("[errors]\nprint_tracebacks = \"yes\"").unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }
}
