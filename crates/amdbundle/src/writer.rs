//! Override file writers
//!
//! The format is picked from the override file's extension, mirroring the
//! declaration file it sits next to.

use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::info;

use crate::{error::BundleError, overrides::OverrideMapping};

pub trait ConfigWriter: Debug {
    /// Where the override file is written
    fn path(&self) -> &Path;

    fn write_config(&self, mapping: &OverrideMapping) -> Result<()>;
}

#[derive(Debug)]
pub struct JsonConfigWriter {
    path: PathBuf,
}

impl JsonConfigWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigWriter for JsonConfigWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn write_config(&self, mapping: &OverrideMapping) -> Result<()> {
        let mut text = serde_json::to_string_pretty(mapping)
            .context("Failed to serialize override mapping as JSON")?;
        text.push('\n');
        write_file(&self.path, &text)
    }
}

#[derive(Debug)]
pub struct TomlConfigWriter {
    path: PathBuf,
}

impl TomlConfigWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigWriter for TomlConfigWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn write_config(&self, mapping: &OverrideMapping) -> Result<()> {
        let text = toml::to_string_pretty(mapping)
            .context("Failed to serialize override mapping as TOML")?;
        write_file(&self.path, &text)
    }
}

fn write_file(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text)
        .with_context(|| format!("Failed to write override file {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Writer for an override file, chosen by extension
pub fn create_writer(path: &Path) -> Result<Box<dyn ConfigWriter>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Box::new(JsonConfigWriter::new(path))),
        Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Box::new(TomlConfigWriter::new(path))),
        _ => Err(BundleError::UnsupportedOverrideFormat(path.to_path_buf()).into()),
    }
}

/// Override file location for a declaration file: `RequireJS.json` becomes
/// `RequireJS.override.json` in the same directory
pub fn override_path(config_path: &Path) -> PathBuf {
    let stem = config_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match config_path.extension() {
        Some(ext) => format!("{stem}.override.{}", ext.to_string_lossy()),
        None => format!("{stem}.override"),
    };
    config_path.with_file_name(file_name)
}
