//! Tool settings
//!
//! Settings are layered, later sources winning:
//! 1. built-in defaults
//! 2. the user settings file (`~/.config/amdbundle/amdbundle.toml`)
//! 3. `amdbundle.toml` in the current directory
//! 4. an explicitly given settings file
//! 5. `AMDBUNDLE_*` environment variables
//!
//! Command-line flags are applied on top by the binary.

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

use crate::{dirs, error::BundleError};

pub const DEFAULT_SCRIPT_DIRECTORY: &str = "Scripts";
pub const DEFAULT_BUNDLE_DIRECTORY: &str = "bundles";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Root of the web project; must exist
    pub project_path: PathBuf,
    /// Where bundle outputs are considered to live; defaults to the project path
    pub package_path: Option<PathBuf>,
    /// Base for module ids and override paths; defaults to `<project>/<script_directory>`
    pub entry_point: Option<PathBuf>,
    /// RequireJS declaration files; empty means "look for RequireJS.json in the project"
    pub require_configs: Vec<PathBuf>,
    pub script_directory: String,
    pub bundle_directory: String,
    /// Write the concatenated bundle files next to the override files
    pub emit_bundles: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_path: PathBuf::from("."),
            package_path: None,
            entry_point: None,
            require_configs: Vec::new(),
            script_directory: DEFAULT_SCRIPT_DIRECTORY.to_owned(),
            bundle_directory: DEFAULT_BUNDLE_DIRECTORY.to_owned(),
            emit_bundles: true,
        }
    }
}

/// On-disk shape of `amdbundle.toml`; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigFile {
    project: Option<PathBuf>,
    package: Option<PathBuf>,
    entry_point: Option<PathBuf>,
    require_configs: Option<Vec<PathBuf>>,
    script_directory: Option<String>,
    bundle_directory: Option<String>,
    emit_bundles: Option<bool>,
}

impl Config {
    /// Load settings from every layer
    pub fn load(explicit_config: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_file) = dirs::user_config_file()
            && user_file.is_file()
        {
            config.merge_file(&user_file)?;
        }

        let project_file = PathBuf::from(dirs::CONFIG_FILE_NAME);
        if project_file.is_file() {
            config.merge_file(&project_file)?;
        }

        if let Some(path) = explicit_config {
            if !path.is_file() {
                return Err(BundleError::ConfigNotFound(path.to_path_buf()).into());
            }
            config.merge_file(path)?;
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Merge the keys present in a settings file into this config
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        debug!("Loading settings from {}", path.display());
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let file: ConfigFile =
            toml::from_str(&text).map_err(|err| BundleError::InvalidConfig {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        self.merge(file);
        Ok(())
    }

    fn merge(&mut self, file: ConfigFile) {
        if let Some(project) = file.project {
            self.project_path = project;
        }
        if file.package.is_some() {
            self.package_path = file.package;
        }
        if file.entry_point.is_some() {
            self.entry_point = file.entry_point;
        }
        if let Some(require_configs) = file.require_configs {
            self.require_configs = require_configs;
        }
        if let Some(script_directory) = file.script_directory {
            self.script_directory = script_directory;
        }
        if let Some(bundle_directory) = file.bundle_directory {
            self.bundle_directory = bundle_directory;
        }
        if let Some(emit_bundles) = file.emit_bundles {
            self.emit_bundles = emit_bundles;
        }
    }

    /// Apply `AMDBUNDLE_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(project) = env::var_os("AMDBUNDLE_PROJECT") {
            self.project_path = PathBuf::from(project);
        }
        if let Some(package) = env::var_os("AMDBUNDLE_PACKAGE") {
            self.package_path = Some(PathBuf::from(package));
        }
        if let Some(entry_point) = env::var_os("AMDBUNDLE_ENTRY_POINT") {
            self.entry_point = Some(PathBuf::from(entry_point));
        }
        if let Some(require_configs) = env::var_os("AMDBUNDLE_REQUIRE_CONFIG") {
            self.require_configs = env::split_paths(&require_configs)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
        }
        if let Ok(emit) = env::var("AMDBUNDLE_EMIT") {
            self.emit_bundles = emit
                .trim()
                .parse()
                .with_context(|| format!("AMDBUNDLE_EMIT must be true or false, got '{emit}'"))?;
        }
        Ok(())
    }

    /// Copy with the project and package paths made absolute against the
    /// current directory, so paths derived from them can be related lexically
    pub fn absolutized(&self) -> Result<Self> {
        let mut config = self.clone();
        config.project_path = std::path::absolute(&self.project_path).with_context(|| {
            format!("Failed to resolve project path {}", self.project_path.display())
        })?;
        if let Some(package) = &self.package_path {
            config.package_path = Some(std::path::absolute(package).with_context(|| {
                format!("Failed to resolve package path {}", package.display())
            })?);
        }
        Ok(config)
    }

    /// Directory bundle outputs are placed under
    pub fn output_root(&self) -> &Path {
        self.package_path.as_deref().unwrap_or(&self.project_path)
    }

    /// Base directory for module ids and require-relative paths
    pub fn entry_point_path(&self) -> PathBuf {
        match &self.entry_point {
            Some(entry) if entry.is_absolute() => entry.clone(),
            Some(entry) => self.project_path.join(entry),
            None => self.project_path.join(&self.script_directory),
        }
    }
}
