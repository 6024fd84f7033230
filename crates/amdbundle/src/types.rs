//! Shared type definitions for the amdbundle crate
//!
//! These types flow between the loader, the discoverer, the orderer and the
//! override composer, so they live here to avoid circular module imports.

use std::path::PathBuf;

/// Name of a bundle as declared in the `bundles` table
pub type BundleId = String;

/// A single member of a bundle as written in the declaration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleItem {
    /// Module id or path relative to the entry point (no `.js` extension required)
    pub module_path: String,
}

impl BundleItem {
    pub fn new(module_path: impl Into<String>) -> Self {
        Self {
            module_path: module_path.into(),
        }
    }
}

/// A bundle as declared by a configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDefinition {
    pub name: BundleId,
    pub items: Vec<BundleItem>,
    /// Declared output location, relative to the output root when not absolute
    pub output_path: Option<String>,
    /// Other bundles whose items this bundle pulls in
    pub includes: Vec<BundleId>,
    /// Virtual bundles only alias other bundles and never produce output
    pub is_virtual: bool,
    /// The declaration file this bundle came from
    pub containing_config: PathBuf,
}

/// A file reached during dependency discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Text after the extractor's rewrite
    pub content: String,
    /// Physical paths of direct dependencies, de-duplicated
    pub dependencies: Vec<PathBuf>,
}

/// One entry in a bundle's ordered file list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub file_name: PathBuf,
    /// Present only when the bundle aggregates source text
    pub content: Option<String>,
}

impl FileSpec {
    pub fn new(file_name: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            content: None,
        }
    }

    pub fn with_content(file_name: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content: Some(content.into()),
        }
    }
}

/// A resolved, ordered bundle ready for override composition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub bundle_id: BundleId,
    pub output: PathBuf,
    pub files: Vec<FileSpec>,
    pub containing_config: PathBuf,
}

impl Bundle {
    /// Concatenated source of every file that carries content, in bundle order
    pub fn concatenated_source(&self) -> String {
        let mut source = String::new();
        for content in self.files.iter().filter_map(|file| file.content.as_deref()) {
            source.push_str(content);
            if !content.ends_with('\n') {
                source.push('\n');
            }
        }
        source
    }
}
