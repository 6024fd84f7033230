//! Emission order for a bundle's files
//!
//! Repeatedly extracts every file whose dependencies have all been emitted.
//! When no file qualifies the whole remainder is emitted as-is, which is how
//! dependency cycles (and dependencies that were never discovered) are broken.

use log::{debug, warn};
use rustc_hash::FxHashSet;

use crate::{
    cycles::find_cycles,
    types::{DiscoveredFile, FileSpec},
    util::path_key,
};

/// Order discovered files so dependencies come first.
///
/// Files that become ready in the same pass keep their discovery order.
pub fn order(files: Vec<DiscoveredFile>) -> Vec<FileSpec> {
    let mut remaining = files;
    let mut emitted = Vec::with_capacity(remaining.len());
    let mut added: FxHashSet<String> = FxHashSet::default();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<_>, Vec<_>) = remaining.into_iter().partition(|file| {
            file.dependencies
                .iter()
                .all(|dependency| added.contains(&path_key(dependency)))
        });

        let ready = if ready.is_empty() {
            report_stuck(&blocked, &added);
            remaining = Vec::new();
            blocked
        } else {
            remaining = blocked;
            ready
        };

        for file in ready {
            added.insert(path_key(&file.path));
            emitted.push(FileSpec::with_content(file.path, file.content));
        }
    }

    emitted
}

/// Explain why the fallback fired: unresolved dependencies and real cycles
/// are reported separately.
fn report_stuck(stuck: &[DiscoveredFile], added: &FxHashSet<String>) {
    let stuck_keys: FxHashSet<String> = stuck.iter().map(|file| path_key(&file.path)).collect();

    for file in stuck {
        for dependency in &file.dependencies {
            let key = path_key(dependency);
            if !added.contains(&key) && !stuck_keys.contains(&key) {
                warn!(
                    "{} depends on {}, which is not part of the bundle; emitting it anyway",
                    file.path.display(),
                    dependency.display()
                );
            }
        }
    }

    for cycle in find_cycles(stuck) {
        let members: Vec<_> = cycle.iter().map(|path| path.display().to_string()).collect();
        debug!("Breaking dependency cycle: {}", members.join(" -> "));
    }
    debug!("Emitting {} file(s) in discovery order", stuck.len());
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    fn file(name: &str, dependencies: &[&str]) -> DiscoveredFile {
        DiscoveredFile {
            path: PathBuf::from(format!("/s/{name}.js")),
            content: format!("// {name}"),
            dependencies: dependencies
                .iter()
                .map(|dep| PathBuf::from(format!("/s/{dep}.js")))
                .collect(),
        }
    }

    fn emitted_names(specs: &[FileSpec]) -> Vec<String> {
        specs
            .iter()
            .map(|spec| {
                spec.file_name
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect()
    }

    fn assert_topological(files: &[DiscoveredFile], specs: &[FileSpec]) {
        let position = |path: &PathBuf| {
            specs
                .iter()
                .position(|spec| &spec.file_name == path)
                .expect("every file is emitted")
        };
        for file in files {
            for dependency in &file.dependencies {
                assert!(
                    position(dependency) < position(&file.path),
                    "{} must come before {}",
                    dependency.display(),
                    file.path.display()
                );
            }
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(order(Vec::new()).is_empty());
    }

    #[test]
    fn test_dependencies_come_first() {
        let files = vec![
            file("main", &["view", "model"]),
            file("view", &["model", "dom"]),
            file("model", &["ajax"]),
            file("dom", &[]),
            file("ajax", &[]),
        ];

        let specs = order(files.clone());

        assert_eq!(emitted_names(&specs), vec!["dom", "ajax", "model", "view", "main"]);
        assert_topological(&files, &specs);
    }

    #[test]
    fn test_content_is_carried() {
        let specs = order(vec![file("only", &[])]);
        assert_eq!(specs, vec![FileSpec::with_content("/s/only.js", "// only")]);
    }

    #[test]
    fn test_cycle_is_emitted_via_fallback() {
        let files = vec![
            file("main", &["utils"]),
            file("utils", &["main"]),
            file("leaf", &[]),
        ];

        let specs = order(files);

        assert_eq!(emitted_names(&specs), vec!["leaf", "main", "utils"]);
    }

    #[test]
    fn test_self_dependency_is_emitted() {
        let specs = order(vec![file("me", &["me"])]);
        assert_eq!(emitted_names(&specs), vec!["me"]);
    }

    #[test]
    fn test_fallback_emits_whole_remainder() {
        // `after` only waits on `cyclic`, but the fallback takes everything left
        let files = vec![
            file("cyclic", &["other"]),
            file("other", &["cyclic"]),
            file("after", &["cyclic"]),
        ];

        let specs = order(files);

        assert_eq!(emitted_names(&specs), vec!["cyclic", "other", "after"]);
    }

    #[test]
    fn test_undiscovered_dependency_falls_back() {
        let files = vec![file("main", &["ghost"]), file("util", &[])];

        let specs = order(files);

        assert_eq!(emitted_names(&specs), vec!["util", "main"]);
    }

    #[test]
    fn test_every_file_emitted_once() {
        let files = vec![
            file("a", &["b"]),
            file("b", &["c"]),
            file("c", &["a"]),
            file("d", &["a", "e"]),
            file("e", &[]),
        ];

        let specs = order(files.clone());

        assert_eq!(specs.len(), files.len());
        let unique: FxHashSet<_> = specs.iter().map(|spec| spec.file_name.clone()).collect();
        assert_eq!(unique.len(), files.len());
    }
}
