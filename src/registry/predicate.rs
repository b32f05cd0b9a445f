// src/registry/predicate.rs

//! Project predicates for conditional command registration.
//!
//! ```ignore
//! registry.add_optional_command(&has_file(fs.clone(), "yarn.lock"), render, "yarn", args);
//! registry.add_optional_command(&not(has_file(fs, "yarn.lock")), render, "npm", args);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::fs::FileSystem;
use crate::registry::project::Project;

/// Boxed predicate over a project.
pub type Predicate = Box<dyn Fn(&Project) -> bool + Send + Sync>;

/// The part of `package.json` the predicates care about.
#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    scripts: BTreeMap<String, String>,
}

/// Project directory contains a file called `name` (e.g. `yarn.lock`).
pub fn has_file(fs: Arc<dyn FileSystem>, name: impl Into<String>) -> Predicate {
    let name = name.into();
    Box::new(move |project| fs.is_file(&project.dir().join(&name)))
}

/// Project's `package.json` declares a script called `script`.
///
/// A missing or malformed manifest counts as "not declared".
pub fn has_script(fs: Arc<dyn FileSystem>, script: impl Into<String>) -> Predicate {
    let script = script.into();
    Box::new(move |project| {
        let path = project.dir().join("package.json");
        let contents = match fs.read_to_string(&path) {
            Ok(c) => c,
            Err(err) => {
                debug!(project = %project.name(), error = %err, "no readable package.json");
                return false;
            }
        };
        match serde_json::from_str::<PackageJson>(&contents) {
            Ok(pkg) => pkg.scripts.contains_key(&script),
            Err(err) => {
                debug!(project = %project.name(), error = %err, "package.json is not valid JSON");
                false
            }
        }
    })
}

pub fn not(pred: Predicate) -> Predicate {
    Box::new(move |project| !pred(project))
}

/// All predicates hold (true for an empty list).
pub fn and(preds: Vec<Predicate>) -> Predicate {
    Box::new(move |project| preds.iter().all(|p| p(project)))
}

/// At least one predicate holds (false for an empty list).
pub fn or(preds: Vec<Predicate>) -> Predicate {
    Box::new(move |project| preds.iter().any(|p| p(project)))
}
