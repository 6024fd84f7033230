//! Loader for RequireJS declaration files
//!
//! A declaration file is JSON shaped like:
//!
//! ```json
//! {
//!   "paths": { "jquery": "lib/jquery-3.7.1", "app": "Controllers/app" },
//!   "bundles": {
//!     "core": { "outputPath": "bundles/core.js", "items": ["jquery", "app/main"] },
//!     "admin": { "includes": ["core"], "items": [{ "path": "app/admin" }] },
//!     "everything": { "virtual": true, "includes": ["core", "admin"] }
//!   }
//! }
//! ```
//!
//! Keys other than `paths` and `bundles` (`shim`, `map`, ...) belong to the
//! loader at runtime and are ignored here. Files ending in `.toml` are read
//! as TOML with the same shape.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{
    Deserialize, Deserializer,
    de::{self, MapAccess, Visitor},
};

use crate::{
    error::BundleError,
    types::{BundleDefinition, BundleItem},
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoaderOptions {
    /// Expand `includes` into each bundle's item list
    pub process_bundles: bool,
}

/// Everything the pipeline needs from the declaration files
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    /// Module id prefix to path (relative to the entry point), merged across files
    pub paths: IndexMap<String, String>,
    /// Bundles in declaration order
    pub bundles: Vec<BundleDefinition>,
}

#[derive(Debug, Deserialize)]
struct RequireConfigFile {
    #[serde(default)]
    paths: IndexMap<String, String>,
    #[serde(default, deserialize_with = "unique_bundles")]
    bundles: IndexMap<String, BundleEntry>,
}

/// Bundle table that rejects a name declared twice in the same file
fn unique_bundles<'de, D>(deserializer: D) -> Result<IndexMap<String, BundleEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueBundles;

    impl<'de> Visitor<'de> for UniqueBundles {
        type Value = IndexMap<String, BundleEntry>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a map of bundle names to bundle entries")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut bundles = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, entry)) = map.next_entry::<String, BundleEntry>()? {
                if bundles.contains_key(&name) {
                    return Err(de::Error::custom(format!(
                        "bundle '{name}' is declared more than once"
                    )));
                }
                bundles.insert(name, entry);
            }
            Ok(bundles)
        }
    }

    deserializer.deserialize_map(UniqueBundles)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct BundleEntry {
    output_path: Option<String>,
    #[serde(default)]
    items: Vec<ItemEntry>,
    #[serde(default)]
    includes: Vec<String>,
    #[serde(default, rename = "virtual")]
    is_virtual: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemEntry {
    Id(String),
    Detailed { path: String },
}

impl ItemEntry {
    fn into_item(self) -> BundleItem {
        match self {
            Self::Id(path) | Self::Detailed { path } => BundleItem::new(path),
        }
    }
}

#[derive(Debug)]
pub struct ConfigLoader {
    paths: Vec<PathBuf>,
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new(paths: Vec<PathBuf>, options: ConfigLoaderOptions) -> Self {
        Self { paths, options }
    }

    /// Read and merge every declaration file
    pub fn load(&self) -> Result<Configuration> {
        let mut configuration = Configuration::default();
        let mut seen_bundles = IndexSet::new();

        for path in &self.paths {
            let file = read_config_file(path)?;
            debug!(
                "Loaded {} path(s) and {} bundle(s) from {}",
                file.paths.len(),
                file.bundles.len(),
                path.display()
            );

            configuration.paths.extend(file.paths);

            for (name, entry) in file.bundles {
                if !seen_bundles.insert(name.clone()) {
                    return Err(BundleError::DuplicateBundle {
                        name,
                        path: path.clone(),
                    }
                    .into());
                }
                configuration.bundles.push(BundleDefinition {
                    name,
                    items: entry.items.into_iter().map(ItemEntry::into_item).collect(),
                    output_path: entry.output_path.filter(|p| !p.trim().is_empty()),
                    includes: entry.includes,
                    is_virtual: entry.is_virtual,
                    containing_config: path.clone(),
                });
            }
        }

        if self.options.process_bundles {
            expand_includes(&mut configuration.bundles)?;
        }

        Ok(configuration)
    }
}

fn read_config_file(path: &Path) -> Result<RequireConfigFile> {
    if !path.is_file() {
        return Err(BundleError::ConfigNotFound(path.to_path_buf()).into());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let parsed: Result<RequireConfigFile, String> = if is_toml {
        toml::from_str(&text).map_err(|err| err.to_string())
    } else {
        serde_json::from_str(&text).map_err(|err| err.to_string())
    };
    parsed.map_err(|reason| {
        BundleError::InvalidConfig {
            path: path.to_path_buf(),
            reason,
        }
        .into()
    })
}

/// Replace each bundle's items with its included bundles' items followed by its own
fn expand_includes(bundles: &mut [BundleDefinition]) -> Result<()> {
    let mut resolved: FxHashMap<String, Vec<BundleItem>> = FxHashMap::default();
    {
        let by_name: FxHashMap<&str, &BundleDefinition> = bundles
            .iter()
            .map(|bundle| (bundle.name.as_str(), bundle))
            .collect();
        for bundle in bundles.iter() {
            let mut stack = Vec::new();
            collect_items(bundle, &by_name, &mut resolved, &mut stack)?;
        }
    }

    for bundle in bundles.iter_mut() {
        if let Some(items) = resolved.remove(&bundle.name) {
            bundle.items = items;
        }
    }
    Ok(())
}

fn collect_items(
    bundle: &BundleDefinition,
    by_name: &FxHashMap<&str, &BundleDefinition>,
    resolved: &mut FxHashMap<String, Vec<BundleItem>>,
    stack: &mut Vec<String>,
) -> Result<Vec<BundleItem>> {
    if let Some(items) = resolved.get(&bundle.name) {
        return Ok(items.clone());
    }
    if let Some(start) = stack.iter().position(|name| *name == bundle.name) {
        let mut cycle = stack[start..].to_vec();
        cycle.push(bundle.name.clone());
        return Err(BundleError::IncludeCycle(cycle).into());
    }

    stack.push(bundle.name.clone());

    let mut seen = FxHashSet::default();
    let mut items = Vec::new();
    for include in &bundle.includes {
        let Some(included) = by_name.get(include.as_str()) else {
            return Err(BundleError::UnknownInclude {
                bundle: bundle.name.clone(),
                include: include.clone(),
            }
            .into());
        };
        trace!("Bundle '{}' includes '{}'", bundle.name, include);
        for item in collect_items(included, by_name, resolved, stack)? {
            if seen.insert(item.module_path.clone()) {
                items.push(item);
            }
        }
    }
    for item in &bundle.items {
        if seen.insert(item.module_path.clone()) {
            items.push(item.clone());
        }
    }

    stack.pop();
    resolved.insert(bundle.name.clone(), items.clone());
    Ok(items)
}
