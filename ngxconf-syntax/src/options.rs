//! Render options and their loader

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default indent width in spaces
pub const DEFAULT_INDENT: usize = 4;

/// Widest indent the renderer accepts
pub const MAX_INDENT: usize = 64;

/// Options controlling the renderer output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderOptions {
    /// Spaces per nesting level
    pub indent: usize,
}

impl RenderOptions {
    /// Reject indent widths above [`MAX_INDENT`]
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.indent > MAX_INDENT {
            return Err(OptionsError::IndentTooWide(self.indent));
        }
        Ok(())
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            indent: DEFAULT_INDENT,
        }
    }
}

/// Options loading error
#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("Failed to read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown options format: {0}")]
    UnknownFormat(String),

    #[error("indent {0} exceeds the maximum of {MAX_INDENT}")]
    IndentTooWide(usize),
}

/// Loader for render options files
pub struct OptionsLoader;

impl OptionsLoader {
    /// Load options from a `.toml` or `.json` file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RenderOptions, OptionsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        tracing::debug!(path = %path.display(), format = ext, "loading render options");

        match ext {
            "toml" => Self::from_toml(&content),
            "json" => Self::from_json(&content),
            _ => Err(OptionsError::UnknownFormat(ext.to_string())),
        }
    }

    /// Parse TOML options
    pub fn from_toml(content: &str) -> Result<RenderOptions, OptionsError> {
        let options: RenderOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    /// Parse JSON options
    pub fn from_json(content: &str) -> Result<RenderOptions, OptionsError> {
        let options: RenderOptions = serde_json::from_str(content)?;
        options.validate()?;
        Ok(options)
    }
}
