//! Path helpers shared by the resolver, discoverer and orderer.

use std::path::{Component, Path, PathBuf};

use cow_utils::CowUtils;

/// Identity key for a physical path.
///
/// Paths are compared case-insensitively and with `/` as the only separator,
/// regardless of what the host filesystem does.
pub fn path_key(path: &Path) -> String {
    let lossy = path.to_string_lossy();
    let lowered = lossy.cow_to_lowercase();
    lowered.cow_replace('\\', "/").into_owned()
}

/// Resolve `.` and `..` components without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Lexical path of `path` relative to `base`, using `..` where the two diverge
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path = normalize_path(path);
    let base = normalize_path(base);

    let path_components: Vec<_> = path.components().collect();
    let base_components: Vec<_> = base.components().collect();

    let common = path_components
        .iter()
        .zip(&base_components)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_components.len() {
        relative.push("..");
    }
    for component in &path_components[common..] {
        relative.push(component.as_os_str());
    }
    relative
}

/// Render a path with `/` separators
pub fn to_forward_slashes(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_owned()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_key_ignores_case_and_separators() {
        assert_eq!(
            path_key(Path::new("/Project/Scripts/App.js")),
            path_key(Path::new("/project/scripts/app.js"))
        );
        assert_eq!(path_key(Path::new("Scripts\\app.js")), "scripts/app.js");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./c/../d.js")),
            PathBuf::from("/a/b/d.js")
        );
        assert_eq!(normalize_path(Path::new("../x/./y")), PathBuf::from("../x/y"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/p/Scripts/app/main.js"), Path::new("/p/Scripts")),
            PathBuf::from("app/main.js")
        );
        assert_eq!(
            relative_path(Path::new("/p/out/bundle.js"), Path::new("/p/Scripts")),
            PathBuf::from("../out/bundle.js")
        );
    }

    #[test]
    fn test_to_forward_slashes() {
        assert_eq!(
            to_forward_slashes(Path::new("../out/bundles/core.js")),
            "../out/bundles/core.js"
        );
    }
}
