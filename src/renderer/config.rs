//! Configuration for rendering

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Default file extension for skins on disk
pub const DEFAULT_SKIN_EXTENSION: &str = "skin";

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// What an unresolved macro renders as
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailMode {
    /// Render nothing
    Silent,
    /// Render a bracketed diagnostic
    #[default]
    Verbose,
}

impl FailMode {
    /// Parse the value of a `failmode` attribute
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "silent" => Some(FailMode::Silent),
            "verbose" => Some(FailMode::Verbose),
            _ => None,
        }
    }
}

/// What rendering a subskin the skin does not contain does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownSubskin {
    /// Fail the render
    #[default]
    Error,
    /// Render the `main` section instead
    Main,
}

/// What a failing macro or filter does to the render
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationErrors {
    /// Render an inline diagnostic and continue
    #[default]
    Inline,
    /// Abort the whole render
    Abort,
}

/// Where skins are loaded from
#[derive(Debug, Clone, PartialEq)]
pub struct SkinsConfig {
    /// Base directory; `None` disables loading from disk
    pub path: Option<PathBuf>,

    /// File extension without the dot
    pub extension: String,
}

impl Default for SkinsConfig {
    fn default() -> Self {
        Self {
            path: None,
            extension: DEFAULT_SKIN_EXTENSION.to_string(),
        }
    }
}

/// Configuration options for rendering
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderConfig {
    /// Failure mode for tags without a `failmode` attribute
    pub failmode: FailMode,

    pub unknown_subskin: UnknownSubskin,

    pub invocation_errors: InvocationErrors,

    pub skins: SkinsConfig,
}

/// TOML structure for deserializing configuration
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    render: Option<TomlRender>,
    skins: Option<TomlSkins>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlRender {
    failmode: Option<FailMode>,
    unknown_subskin: Option<UnknownSubskin>,
    invocation_errors: Option<InvocationErrors>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlSkins {
    path: Option<PathBuf>,
    extension: Option<String>,
}

impl RenderConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    ///
    /// A relative skin path is taken relative to the file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let (Some(skins), Some(dir)) = (config.skins.path.as_mut(), path.parent()) {
            if skins.is_relative() {
                *skins = dir.join(&*skins);
            }
        }
        Ok(config)
    }

    /// Load configuration from a TOML string; missing keys keep their defaults
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;
        let mut config = Self::default();

        if let Some(render) = parsed.render {
            if let Some(failmode) = render.failmode {
                config.failmode = failmode;
            }
            if let Some(unknown) = render.unknown_subskin {
                config.unknown_subskin = unknown;
            }
            if let Some(errors) = render.invocation_errors {
                config.invocation_errors = errors;
            }
        }
        if let Some(skins) = parsed.skins {
            config.skins.path = skins.path;
            if let Some(ext) = skins.extension {
                config.skins.extension = ext.trim_start_matches('.').to_string();
            }
        }

        Ok(config)
    }

    pub fn with_failmode(mut self, failmode: FailMode) -> Self {
        self.failmode = failmode;
        self
    }

    pub fn with_unknown_subskin(mut self, policy: UnknownSubskin) -> Self {
        self.unknown_subskin = policy;
        self
    }

    pub fn with_invocation_errors(mut self, policy: InvocationErrors) -> Self {
        self.invocation_errors = policy;
        self
    }

    pub fn with_skin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.skins.path = Some(path.into());
        self
    }

    pub fn with_skin_extension(mut self, extension: impl Into<String>) -> Self {
        self.skins.extension = extension.into();
        self
    }
}
