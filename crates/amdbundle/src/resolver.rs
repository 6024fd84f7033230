use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::trace;

use crate::util::{normalize_path, relative_path, to_forward_slashes};

const SCRIPT_EXTENSION: &str = "js";

/// Maps module ids to files under the entry point and back again
#[derive(Debug, Clone)]
pub struct PathResolver {
    entry_point: PathBuf,
    /// Module id prefix to path, as declared in the `paths` table
    paths: IndexMap<String, String>,
}

impl PathResolver {
    pub fn new(entry_point: impl Into<PathBuf>, paths: IndexMap<String, String>) -> Self {
        Self {
            entry_point: normalize_path(&entry_point.into()),
            paths,
        }
    }

    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }

    /// Physical file for a module id or entry-relative path
    pub fn resolve_physical_path(&self, module: &str) -> PathBuf {
        let mapped = self.apply_path_mapping(module);
        with_script_extension(&self.entry_point.join(mapped.trim_start_matches('/')))
    }

    /// Physical file for a dependency id referenced from the file at `from`.
    ///
    /// Ids starting with `./` or `../` are taken relative to the referencing
    /// file's directory. Returns `None` for ids that do not name a local
    /// script (URLs).
    pub fn resolve_dependency(&self, module: &str, from: &Path) -> Option<PathBuf> {
        if is_url(module) {
            trace!("Skipping URL dependency '{module}'");
            return None;
        }

        if module.starts_with("./") || module.starts_with("../") {
            let base = from.parent().unwrap_or(self.entry_point.as_path());
            return Some(with_script_extension(&base.join(module)));
        }

        Some(self.resolve_physical_path(module))
    }

    /// Lexical path of `path` relative to `base`
    pub fn get_relative_path(&self, path: &Path, base: &Path) -> PathBuf {
        relative_path(path, base)
    }

    /// Module-style path of `path` relative to the entry point: `/` separated, no `.js`
    pub fn get_require_relative_path(&self, path: &Path) -> String {
        require_relative_path(&self.entry_point, path)
    }

    /// Longest `paths` prefix match on `/` segment boundaries
    fn apply_path_mapping(&self, module: &str) -> String {
        let mut best: Option<(&str, &str)> = None;
        for (prefix, target) in &self.paths {
            let matches = module == prefix
                || (module.starts_with(prefix.as_str())
                    && module[prefix.len()..].starts_with('/'));
            if matches && best.is_none_or(|(current, _)| prefix.len() > current.len()) {
                best = Some((prefix.as_str(), target.as_str()));
            }
        }

        match best {
            Some((prefix, target)) => {
                let mapped = format!("{}{}", target.trim_end_matches('/'), &module[prefix.len()..]);
                trace!("Mapped module '{module}' to '{mapped}'");
                mapped
            }
            None => module.to_owned(),
        }
    }
}

/// Module-style path of `path` relative to `entry_point`
pub fn require_relative_path(entry_point: &Path, path: &Path) -> String {
    let relative = relative_path(path, entry_point);
    let rendered = to_forward_slashes(&relative);
    match rendered.strip_suffix(".js") {
        Some(stripped) => stripped.to_owned(),
        None => rendered,
    }
}

fn with_script_extension(path: &Path) -> PathBuf {
    if path.extension().and_then(|ext| ext.to_str()) == Some(SCRIPT_EXTENSION) {
        return normalize_path(path);
    }
    let mut file_name = path.as_os_str().to_owned();
    file_name.push(".");
    file_name.push(SCRIPT_EXTENSION);
    normalize_path(Path::new(&file_name))
}

fn is_url(module: &str) -> bool {
    module.starts_with("//") || module.starts_with("http:") || module.starts_with("https:")
}
