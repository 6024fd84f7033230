//! End-to-end bundling pipeline
//!
//! Loads the declaration files, discovers and orders the files of every
//! non-virtual bundle, then writes the bundle files followed by one override
//! file per declaration file. Every bundle and mapping is computed before the
//! first write, so a failure anywhere in discovery leaves the project
//! untouched.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, info};

use crate::{
    config::Config,
    discovery::DependencyDiscoverer,
    error::BundleError,
    extractor::{AmdExtractor, DependencyExtractor},
    ordering::order,
    overrides::{OverrideMapping, compose},
    require_config::{ConfigLoader, ConfigLoaderOptions, Configuration},
    resolver::PathResolver,
    types::{Bundle, BundleDefinition},
    util::normalize_path,
    writer::{create_writer, override_path},
};

/// Declaration file looked for in the project when none is configured
pub const DEFAULT_REQUIRE_CONFIG: &str = "RequireJS.json";

/// Override file to write and the mapping it receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOverride {
    pub path: PathBuf,
    pub mapping: OverrideMapping,
}

/// Everything a run produces, before anything touches the disk
#[derive(Debug, Clone, Default)]
pub struct BundlePlan {
    pub bundles: Vec<Bundle>,
    pub overrides: Vec<PlannedOverride>,
}

#[derive(Debug)]
pub struct BundleOrchestrator {
    config: Config,
    extractor: Box<dyn DependencyExtractor>,
}

impl BundleOrchestrator {
    pub fn new(config: Config) -> Self {
        Self::with_extractor(config, Box::new(AmdExtractor))
    }

    pub fn with_extractor(config: Config, extractor: Box<dyn DependencyExtractor>) -> Self {
        Self { config, extractor }
    }

    /// Compute bundles, write their concatenated files when `emit_bundles` is
    /// set, then write the override files. Override files are only written
    /// once every bundle file is on disk. Returns the bundles in declaration
    /// order.
    pub fn run(&self) -> Result<Vec<Bundle>> {
        let plan = self.plan()?;
        let writers = plan
            .overrides
            .iter()
            .map(|planned| create_writer(&planned.path).map(|writer| (writer, &planned.mapping)))
            .collect::<Result<Vec<_>>>()?;

        if self.config.emit_bundles {
            write_bundle_outputs(&plan.bundles)?;
        } else {
            info!("Skipping bundle output");
        }

        for (writer, mapping) in writers {
            writer.write_config(mapping)?;
        }

        info!(
            "Bundled {} bundle(s) across {} configuration file(s)",
            plan.bundles.len(),
            plan.overrides.len()
        );
        Ok(plan.bundles)
    }

    /// Compute every bundle and override mapping without writing anything
    pub fn plan(&self) -> Result<BundlePlan> {
        if !self.config.project_path.is_dir() {
            return Err(BundleError::DirectoryNotFound(self.config.project_path.clone()).into());
        }
        let config = self.config.absolutized()?;

        let config_files = find_configs(&config)?;
        let configuration = ConfigLoader::new(
            config_files,
            ConfigLoaderOptions {
                process_bundles: true,
            },
        )
        .load()?;

        let entry_point = config.entry_point_path();
        debug!("Entry point is {}", entry_point.display());
        let resolver = PathResolver::new(entry_point, configuration.paths.clone());

        let bundles = configuration
            .bundles
            .iter()
            .filter(|definition| {
                if definition.is_virtual {
                    debug!("Skipping virtual bundle '{}'", definition.name);
                }
                !definition.is_virtual
            })
            .map(|definition| self.build_bundle(&config, &configuration, &resolver, definition))
            .collect::<Result<Vec<_>>>()?;

        let mut groups: IndexMap<&Path, Vec<&Bundle>> = IndexMap::new();
        for bundle in &bundles {
            groups
                .entry(bundle.containing_config.as_path())
                .or_default()
                .push(bundle);
        }
        let overrides = groups
            .into_iter()
            .map(|(config_path, group)| PlannedOverride {
                path: override_path(config_path),
                mapping: compose(group, resolver.entry_point()),
            })
            .collect();

        Ok(BundlePlan { bundles, overrides })
    }

    fn build_bundle(
        &self,
        config: &Config,
        configuration: &Configuration,
        resolver: &PathResolver,
        definition: &BundleDefinition,
    ) -> Result<Bundle> {
        let entry_paths: Vec<PathBuf> = definition
            .items
            .iter()
            .map(|item| resolver.resolve_physical_path(&item.module_path))
            .collect();

        let discovered = DependencyDiscoverer::new(resolver, self.extractor.as_ref(), configuration)
            .discover(&entry_paths)
            .with_context(|| format!("Failed to build bundle '{}'", definition.name))?;
        let files = order(discovered);

        let output = bundle_output_path(config, definition);
        info!(
            "Bundle '{}': {} file(s) -> {}",
            definition.name,
            files.len(),
            output.display()
        );

        Ok(Bundle {
            bundle_id: definition.name.clone(),
            output,
            files,
            containing_config: definition.containing_config.clone(),
        })
    }
}

/// Declaration files to load: the configured ones relative to the project, or
/// the project's `RequireJS.json`
fn find_configs(config: &Config) -> Result<Vec<PathBuf>> {
    if config.require_configs.is_empty() {
        let default = config.project_path.join(DEFAULT_REQUIRE_CONFIG);
        if !default.is_file() {
            return Err(BundleError::ConfigNotFound(default).into());
        }
        return Ok(vec![default]);
    }

    Ok(config
        .require_configs
        .iter()
        .map(|path| normalize_path(&config.project_path.join(path)))
        .collect())
}

/// Where a bundle's concatenated file goes: an explicit `outputPath` is taken
/// relative to the output root, otherwise `<script dir>/<bundle dir>/<name>.js`
pub fn bundle_output_path(config: &Config, definition: &BundleDefinition) -> PathBuf {
    let root = config.output_root();
    match &definition.output_path {
        Some(output_path) => normalize_path(&root.join(output_path)),
        None => root
            .join(&config.script_directory)
            .join(&config.bundle_directory)
            .join(format!("{}.js", definition.name)),
    }
}

/// Write each bundle's concatenated source to its output path
pub fn write_bundle_outputs(bundles: &[Bundle]) -> Result<()> {
    for bundle in bundles {
        if let Some(parent) = bundle.output.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(&bundle.output, bundle.concatenated_source())
            .with_context(|| format!("Failed to write bundle {}", bundle.output.display()))?;
        info!("Wrote {}", bundle.output.display());
    }
    Ok(())
}
