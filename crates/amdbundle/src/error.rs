//! Typed error conditions surfaced by the bundler.
//!
//! Most functions return `anyhow::Result`; these variants are what callers can
//! match on with `downcast_ref::<BundleError>()`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("could not find project directory: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("could not find configuration file: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("invalid configuration in {}: {reason}", .path.display())]
    InvalidConfig { path: PathBuf, reason: String },

    #[error("bundle '{bundle}' includes unknown bundle '{include}'")]
    UnknownInclude { bundle: String, include: String },

    #[error("bundle includes form a cycle: {}", .0.join(" -> "))]
    IncludeCycle(Vec<String>),

    #[error("bundle '{name}' is declared more than once ({})", .path.display())]
    DuplicateBundle { name: String, path: PathBuf },

    #[error("unsupported override file format: {}", .0.display())]
    UnsupportedOverrideFormat(PathBuf),
}
