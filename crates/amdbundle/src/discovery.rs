//! Breadth-first discovery of every file a bundle reaches
//!
//! Starting from a bundle's entry files, each file is read once, run through
//! the extractor, and its dependency ids resolved to physical paths which are
//! queued in turn. Path identity is case-insensitive (see [`path_key`]).

use std::{collections::VecDeque, fs, path::PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, trace};
use rustc_hash::FxHashSet;

use crate::{
    extractor::DependencyExtractor,
    require_config::Configuration,
    resolver::PathResolver,
    types::DiscoveredFile,
    util::path_key,
};

#[derive(Debug)]
pub struct DependencyDiscoverer<'a> {
    resolver: &'a PathResolver,
    extractor: &'a dyn DependencyExtractor,
    configuration: &'a Configuration,
}

/// Working set of a single traversal
#[derive(Debug, Default)]
struct DiscoveryState {
    /// Files already processed, keyed by normalized path, in discovery order
    discovered: IndexMap<String, DiscoveredFile>,
    /// Keys currently sitting in the queue
    pending: FxHashSet<String>,
    queue: VecDeque<PathBuf>,
}

impl DiscoveryState {
    fn enqueue(&mut self, path: PathBuf) {
        let key = path_key(&path);
        if self.discovered.contains_key(&key) || !self.pending.insert(key) {
            return;
        }
        self.queue.push_back(path);
    }

    fn dequeue(&mut self) -> Option<(String, PathBuf)> {
        let path = self.queue.pop_front()?;
        let key = path_key(&path);
        self.pending.remove(&key);
        Some((key, path))
    }
}

impl<'a> DependencyDiscoverer<'a> {
    pub fn new(
        resolver: &'a PathResolver,
        extractor: &'a dyn DependencyExtractor,
        configuration: &'a Configuration,
    ) -> Self {
        Self {
            resolver,
            extractor,
            configuration,
        }
    }

    /// Discover every file reachable from `entry_paths`, each exactly once, in
    /// the order they were dequeued
    pub fn discover(&self, entry_paths: &[PathBuf]) -> Result<Vec<DiscoveredFile>> {
        let mut state = DiscoveryState::default();
        for path in entry_paths {
            state.enqueue(path.clone());
        }

        while let Some((key, path)) = state.dequeue() {
            if state.discovered.contains_key(&key) {
                continue;
            }

            let file = self.process_file(path)?;
            let dependencies = file.dependencies.clone();
            state.discovered.insert(key, file);

            for dependency in dependencies {
                state.enqueue(dependency);
            }
        }

        Ok(state.discovered.into_values().collect())
    }

    fn process_file(&self, path: PathBuf) -> Result<DiscoveredFile> {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        let relative_path = self.resolver.get_require_relative_path(&path);

        let processed = self
            .extractor
            .process(&relative_path, &text, self.configuration)
            .with_context(|| format!("Failed to process script {}", path.display()))?;

        let mut seen = FxHashSet::default();
        let mut dependencies = Vec::new();
        for id in &processed.dependencies {
            let Some(dependency) = self.resolver.resolve_dependency(id, &path) else {
                continue;
            };
            trace!("{relative_path}: '{id}' -> {}", dependency.display());
            if seen.insert(path_key(&dependency)) {
                dependencies.push(dependency);
            }
        }

        debug!(
            "Discovered {relative_path} ({} dependencies)",
            dependencies.len()
        );

        Ok(DiscoveredFile {
            path,
            content: processed.processed_text,
            dependencies,
        })
    }
}
