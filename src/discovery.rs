// src/discovery.rs

//! Project discovery: find project directories below a root.
//!
//! A directory is a project when every configured marker file exists in it.
//! The walk is depth-bounded, never descends into a project, and skips
//! well-known non-project directories such as `node_modules` and `.git`.
//! Symbolic links are never followed, so a link back up the tree cannot loop
//! and a linked project is not listed twice.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::RunSection;
use crate::errors::{QkError, Result};
use crate::fs::FileSystem;

/// A project found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredProject {
    pub name: String,
    pub dir: PathBuf,
}

/// Knobs for [`discover_projects`].
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// `None` means unlimited.
    pub max_depth: Option<usize>,
    pub markers: Vec<String>,
    pub ignore: Vec<String>,
}

impl DiscoveryOptions {
    pub fn from_config(run: &RunSection) -> Self {
        Self {
            max_depth: run.max_depth(),
            markers: run.markers.clone(),
            ignore: run.ignore.clone(),
        }
    }
}

/// Find all projects below `root`, in directory-name order.
///
/// - `root` itself is listed first if it is a project.
/// - A sub-directory that is a project is listed when its level is below
///   `max_depth` and is not descended into.
/// - A sub-directory that is not a project is descended into while its level
///   is at most `max_depth`, unless its name is ignored.
///
/// An unreadable `root` is an error; unreadable nested directories are
/// skipped with a warning.
pub fn discover_projects(
    fs: &dyn FileSystem,
    root: &Path,
    options: &DiscoveryOptions,
) -> Result<Vec<DiscoveredProject>> {
    if !fs.is_dir(root) {
        return Err(QkError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a directory", root.display()),
        )));
    }

    let mut found = Vec::new();

    if is_project(fs, root, &options.markers) {
        found.push(DiscoveredProject {
            name: dir_name(root),
            dir: root.to_path_buf(),
        });
    }

    walk(fs, root, options, 0, &mut found)?;

    debug!(root = %root.display(), count = found.len(), "project discovery complete");
    Ok(found)
}

fn walk(
    fs: &dyn FileSystem,
    dir: &Path,
    options: &DiscoveryOptions,
    level: usize,
    found: &mut Vec<DiscoveredProject>,
) -> Result<()> {
    let mut entries = Vec::new();
    for entry in fs.read_dir(dir)? {
        if fs.is_symlink(&entry) {
            debug!(path = %entry.display(), "not following symlink");
        } else if fs.is_dir(&entry) {
            entries.push(entry);
        }
    }
    entries.sort();

    for sub in entries {
        let name = dir_name(&sub);

        if !is_project(fs, &sub, &options.markers) {
            let within_depth = options.max_depth.is_none_or(|max| level <= max);
            if within_depth && !options.ignore.iter().any(|i| *i == name) {
                if let Err(err) = walk(fs, &sub, options, level + 1, found) {
                    warn!(dir = %sub.display(), error = %err, "skipping unreadable directory");
                }
            }
            continue;
        }

        if options.max_depth.is_some_and(|max| level >= max) {
            debug!(dir = %sub.display(), level, "project below max depth; skipping");
            continue;
        }

        found.push(DiscoveredProject { name, dir: sub });
    }

    Ok(())
}

fn is_project(fs: &dyn FileSystem, dir: &Path, markers: &[String]) -> bool {
    !markers.is_empty() && markers.iter().all(|m| fs.is_file(&dir.join(m)))
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}
