// src/fs/mod.rs

//! Filesystem discovery collaborator.
//!
//! The foreach-source step resolves an input pattern through a
//! [`FileDiscovery`] rather than touching the filesystem directly, so tests
//! can substitute a preset item list (see [`mock`]).

use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::Glob;

use crate::errors::{FanflowError, Result};

pub mod mock;

/// Resolve a glob-style pattern to the ordered set of matching paths.
///
/// An empty result is valid; it is the engine's job to treat zero items as
/// a zero-branch run, not an error.
pub trait FileDiscovery: Send + Sync + Debug {
    fn discover(&self, pattern: &str) -> Result<Vec<PathBuf>>;
}

/// Implementation that walks the real filesystem under a root directory and
/// matches paths (relative to that root) with `globset`.
#[derive(Debug, Clone)]
pub struct GlobDiscovery {
    root: PathBuf,
}

impl GlobDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileDiscovery for GlobDiscovery {
    fn discover(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let matcher = Glob::new(pattern)
            .map_err(|e| {
                FanflowError::Config(format!("invalid input pattern '{pattern}': {e}"))
            })?
            .compile_matcher();

        let mut matches = Vec::new();
        walk_files(&self.root, &mut |path| {
            let rel = path.strip_prefix(&self.root).unwrap_or(path);
            if matcher.is_match(rel) {
                // Drop a leading "./" so logged paths stay tidy.
                let cleaned = path
                    .strip_prefix(".")
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| path.to_path_buf());
                matches.push(cleaned);
            }
        })?;

        // Deterministic order regardless of directory iteration order.
        matches.sort();
        Ok(matches)
    }
}

fn walk_files(dir: &Path, visit: &mut dyn FnMut(&Path)) -> Result<()> {
    let entries = fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))?;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk_files(&path, visit)?;
        } else if path.is_file() {
            visit(&path);
        }
    }
    Ok(())
}
