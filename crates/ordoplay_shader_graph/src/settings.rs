// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shader compiler settings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file could not be read
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file is not valid RON
    #[error("Invalid settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Configuration of the GLSL emission engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Spaces substituted for each tab in the final text
    pub indent_width: usize,
    /// Drop repeated macros, uniform members and texture uniforms by name
    pub deduplicate_declarations: bool,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            indent_width: 4,
            deduplicate_declarations: true,
        }
    }
}

impl CompilerSettings {
    /// Parse settings from RON; missing fields keep their defaults
    pub fn from_ron(text: &str) -> Result<Self, SettingsError> {
        Ok(ron::from_str(text)?)
    }

    /// Load settings from a RON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = CompilerSettings::default();
        assert_eq!(settings.indent_width, 4);
        assert!(settings.deduplicate_declarations);
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let settings = CompilerSettings::from_ron("(indent_width: 2)").unwrap();
        assert_eq!(settings.indent_width, 2);
        assert!(settings.deduplicate_declarations);
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            CompilerSettings::from_ron("(indent_width: \"wide\")"),
            Err(SettingsError::Parse(_))
        ));
    }
}
