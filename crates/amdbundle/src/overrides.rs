//! Override composition
//!
//! For every bundle, each member module is remapped to the bundle's output so
//! the loader fetches the bundle instead of the individual file.

use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use crate::{resolver::require_relative_path, types::Bundle};

/// Overrides for every bundle declared by one configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverrideMapping {
    pub overrides: Vec<BundleOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleOverride {
    pub bundle_id: String,
    /// Module paths the bundle replaces, in bundle order
    pub bundled_scripts: Vec<String>,
    /// Module path to bundle output path
    pub paths: IndexMap<String, String>,
}

/// Build the override mapping for a group of bundles sharing one configuration file.
///
/// All paths are module-style paths relative to `entry_point`.
pub fn compose<'a>(
    bundles: impl IntoIterator<Item = &'a Bundle>,
    entry_point: &Path,
) -> OverrideMapping {
    let overrides = bundles
        .into_iter()
        .map(|bundle| compose_bundle(bundle, entry_point))
        .collect();
    OverrideMapping { overrides }
}

fn compose_bundle(bundle: &Bundle, entry_point: &Path) -> BundleOverride {
    let output = require_relative_path(entry_point, &bundle.output);
    let bundled_scripts: Vec<String> = bundle
        .files
        .iter()
        .map(|file| require_relative_path(entry_point, &file.file_name))
        .collect();
    let paths = bundled_scripts
        .iter()
        .map(|script| (script.clone(), output.clone()))
        .collect();

    BundleOverride {
        bundle_id: bundle.bundle_id.clone(),
        bundled_scripts,
        paths,
    }
}
