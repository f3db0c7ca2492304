//! Runtime services shared by the interpreter and its host components
//!
//! This module holds the component registry, the error types, and the
//! interpreter configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Error types
pub mod error;
/// Component catalog and registry snapshots
pub mod registry;

pub use error::{
    ComponentResult, ConfigError, ConfigResult, EvalError, EvalErrorKind, EvalResult,
    NativeCallError, RegistryError, RegistryResult, Result, SdlError, SyntaxError,
};
pub use registry::{
    ComponentCatalog, ComponentDescriptor, ComponentRegistry, NativeComponent, NativeHandle,
    TypedComponent,
};

/// Configuration for an interpreter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Freeze the global catalog when an interpreter is created from it
    pub freeze_on_start: bool,

    /// Maximum nesting of DSL method calls
    pub max_call_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            freeze_on_start: true,
            max_call_depth: 64,
        }
    }
}

impl InterpreterConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let data = std::fs::read(path)?;
        let config = serde_json::from_slice(&data)?;
        Ok(config)
    }

    /// Write configuration as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf").join("sdl.json");

        let config = InterpreterConfig {
            freeze_on_start: false,
            max_call_depth: 8,
        };
        config.save(&path).unwrap();

        let loaded = InterpreterConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("sdl.json");
        std::fs::write(&path, br#"{ "max_call_depth": 4 }"#).unwrap();

        let loaded = InterpreterConfig::load(&path).unwrap();
        assert_eq!(loaded.max_call_depth, 4);
        assert!(loaded.freeze_on_start);
    }

    #[test]
    fn test_missing_config_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = InterpreterConfig::load(&temp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
