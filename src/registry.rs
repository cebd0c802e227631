//! Skin registry for storing and retrieving parsed skins

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::context::RenderContext;
use crate::error::ParseError;
use crate::handler::DataBag;
use crate::renderer::config::{SkinsConfig, DEFAULT_SKIN_EXTENSION};
use crate::skin::Skin;
use crate::RenderError;

/// Separator between skin name and subskin in an identifier
pub const SUBSKIN_SEPARATOR: char = '#';

/// Errors that can occur during registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Skin not registered and not loadable
    #[error("skin not found: {name}")]
    NotFound { name: String },

    /// Duplicate skin name
    #[error("duplicate skin definition: {name}")]
    Duplicate { name: String },

    /// Identifier is not `name` or `name#subskin`
    #[error("invalid skin identifier: '{id}'")]
    InvalidId { id: String },

    /// Error reading a skin file
    #[error("error reading skin file {path}: {message}")]
    FileRead { path: PathBuf, message: String },

    /// Skin source does not parse
    #[error("skin {name} has {} parse error(s)", .errors.len())]
    Parse {
        name: String,
        errors: Vec<ParseError>,
    },
}

/// Split `name#subskin` into its parts
pub fn parse_skin_id(id: &str) -> Result<(&str, Option<&str>), RegistryError> {
    let invalid = || RegistryError::InvalidId { id: id.to_string() };
    match id.split_once(SUBSKIN_SEPARATOR) {
        None if !id.trim().is_empty() => Ok((id.trim(), None)),
        Some((name, sub)) if !name.trim().is_empty() && !sub.trim().is_empty() => {
            Ok((name.trim(), Some(sub.trim())))
        }
        _ => Err(invalid()),
    }
}

/// Registry of named skins, optionally backed by a directory
#[derive(Debug)]
pub struct SkinRegistry {
    skins: HashMap<String, Arc<Skin>>,
    /// Base path for loading skins on demand
    base_path: Option<PathBuf>,
    extension: String,
}

impl Default for SkinRegistry {
    fn default() -> Self {
        Self {
            skins: HashMap::new(),
            base_path: None,
            extension: DEFAULT_SKIN_EXTENSION.to_string(),
        }
    }
}

impl SkinRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that loads skins from `base_path`
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: Some(base_path.into()),
            ..Self::default()
        }
    }

    pub fn from_config(config: &SkinsConfig) -> Self {
        Self {
            skins: HashMap::new(),
            base_path: config.path.clone(),
            extension: config.extension.clone(),
        }
    }

    /// Parse and register a skin from source
    pub fn register(&mut self, name: &str, source: &str) -> Result<Arc<Skin>, RegistryError> {
        if self.skins.contains_key(name) {
            return Err(RegistryError::Duplicate {
                name: name.to_string(),
            });
        }
        let skin = Skin::parse_named(name, source).map_err(|errors| RegistryError::Parse {
            name: name.to_string(),
            errors,
        })?;
        Ok(self.insert(name, skin))
    }

    /// Register an already parsed skin
    pub fn register_skin(&mut self, name: &str, skin: Skin) -> Result<Arc<Skin>, RegistryError> {
        if self.skins.contains_key(name) {
            return Err(RegistryError::Duplicate {
                name: name.to_string(),
            });
        }
        Ok(self.insert(name, skin))
    }

    fn insert(&mut self, name: &str, skin: Skin) -> Arc<Skin> {
        let skin = Arc::new(skin);
        self.skins.insert(name.to_string(), skin.clone());
        skin
    }

    /// Get a registered skin by name
    pub fn get(&self, name: &str) -> Option<Arc<Skin>> {
        self.skins.get(name).cloned()
    }

    /// Check if a skin is registered
    pub fn contains(&self, name: &str) -> bool {
        self.skins.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.skins.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.skins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skins.is_empty()
    }

    /// Get the base path for file loading
    pub fn base_path(&self) -> Option<&PathBuf> {
        self.base_path.as_ref()
    }

    /// Set the base path for file loading
    pub fn set_base_path(&mut self, path: PathBuf) {
        self.base_path = Some(path);
    }

    /// File a skin name maps to: `<base>/<name>.<extension>`
    pub fn resolve_path(&self, name: &str) -> PathBuf {
        let file = format!("{}.{}", name, self.extension);
        match &self.base_path {
            Some(base) => base.join(file),
            None => PathBuf::from(file),
        }
    }

    /// Get a skin, loading it from the base path if it is not registered yet
    ///
    /// Names must stay below the base path: `..` segments and absolute names
    /// are rejected as invalid identifiers.
    pub fn load(&mut self, name: &str) -> Result<Arc<Skin>, RegistryError> {
        if let Some(skin) = self.get(name) {
            return Ok(skin);
        }
        if self.base_path.is_none() {
            return Err(RegistryError::NotFound {
                name: name.to_string(),
            });
        }
        if !is_relative_name(name) {
            return Err(RegistryError::InvalidId {
                id: name.to_string(),
            });
        }
        let path = self.resolve_path(name);
        if !path.is_file() {
            return Err(RegistryError::NotFound {
                name: name.to_string(),
            });
        }
        let source = read_skin(&path)?;
        debug!(name, path = %path.display(), "loaded skin");
        self.register(name, &source)
    }

    /// Load every skin file below the base path
    ///
    /// Skins in subdirectories are named by their relative path with `/`
    /// separators, e.g. `Page/main`. Already registered names are kept.
    pub fn load_dir(&mut self) -> Result<usize, RegistryError> {
        let Some(base) = self.base_path.clone() else {
            return Ok(0);
        };
        let mut files = Vec::new();
        collect_files(&base, &self.extension, &mut files)?;
        files.sort();

        let mut loaded = 0;
        for path in files {
            let Some(name) = skin_name(&base, &path, &self.extension) else {
                continue;
            };
            if self.contains(&name) {
                continue;
            }
            let source = read_skin(&path)?;
            self.register(&name, &source)?;
            loaded += 1;
        }
        debug!(base = %base.display(), loaded, "loaded skin directory");
        Ok(loaded)
    }

    /// Render a skin by identifier `name` or `name#subskin`
    pub fn render(
        &mut self,
        id: &str,
        ctx: &RenderContext,
        params: &DataBag,
    ) -> Result<String, RenderError> {
        let (name, subskin) = parse_skin_id(id)?;
        let skin = match self.load(name) {
            Ok(skin) => skin,
            Err(RegistryError::NotFound { name }) => return Err(RenderError::SkinNotFound { name }),
            Err(RegistryError::Parse { name, errors }) => {
                return Err(RenderError::Parse { skin: name, errors })
            }
            Err(err) => return Err(err.into()),
        };
        skin.render_with(subskin, params, ctx)
    }
}

/// Only plain segments, so the file stays below the base path
fn is_relative_name(name: &str) -> bool {
    Path::new(name)
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
}

fn read_skin(path: &Path) -> Result<String, RegistryError> {
    std::fs::read_to_string(path).map_err(|e| RegistryError::FileRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn collect_files(dir: &Path, extension: &str, files: &mut Vec<PathBuf>) -> Result<(), RegistryError> {
    let entries = std::fs::read_dir(dir).map_err(|e| RegistryError::FileRead {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;
    for entry in entries {
        let path = entry
            .map_err(|e| RegistryError::FileRead {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?
            .path();
        if path.is_dir() {
            collect_files(&path, extension, files)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            files.push(path);
        }
    }
    Ok(())
}

/// Registry name of a skin file relative to the base directory
fn skin_name(base: &Path, path: &Path, extension: &str) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<&str> = relative
        .iter()
        .map(|part| part.to_str())
        .collect::<Option<_>>()?;
    let joined = parts.join("/");
    joined
        .strip_suffix(extension)
        .and_then(|s| s.strip_suffix('.'))
        .map(str::to_string)
}
