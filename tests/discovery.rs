// tests/discovery.rs
//
// Discovery and registration against a real directory tree.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use qk::cli::QkCommand;
use qk::commands::register;
use qk::config::RunSection;
use qk::discovery::{discover_projects, DiscoveryOptions};
use qk::fs::{FileSystem, RealFileSystem};
use qk::registry::Registry;

fn write(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// ```text
/// root/
///   web/        package.json (start, lint), composer.json, yarn.lock
///   api/        package.json (start),       composer.json
///   libs/ui/    package.json,               composer.json
///   node_modules/dep/  package.json, composer.json
///   notes/      README.md
/// ```
fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(
        &root.join("web/package.json"),
        r#"{"scripts":{"start":"vite","lint":"eslint ."}}"#,
    );
    write(&root.join("web/composer.json"), "{}");
    write(&root.join("web/yarn.lock"), "");

    write(&root.join("api/package.json"), r#"{"scripts":{"start":"node ."}}"#);
    write(&root.join("api/composer.json"), "{}");

    write(&root.join("libs/ui/package.json"), "{}");
    write(&root.join("libs/ui/composer.json"), "{}");

    write(&root.join("node_modules/dep/package.json"), "{}");
    write(&root.join("node_modules/dep/composer.json"), "{}");

    write(&root.join("notes/README.md"), "# notes");
    dir
}

fn options() -> DiscoveryOptions {
    DiscoveryOptions::from_config(&RunSection::default())
}

#[test]
fn discovers_projects_on_disk() {
    let dir = workspace();

    let found = discover_projects(&RealFileSystem, dir.path(), &options()).unwrap();
    let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();

    assert_eq!(names, vec!["api", "ui", "web"]);
    assert_eq!(found[1].dir, dir.path().join("libs/ui"));
}

#[test]
fn shallow_depth_skips_nested_projects() {
    let dir = workspace();
    let mut opts = options();
    opts.max_depth = Some(1);

    let found = discover_projects(&RealFileSystem, dir.path(), &opts).unwrap();
    let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();

    assert_eq!(names, vec!["api", "web"]);
}

fn registry_for(dir: &Path, command: QkCommand) -> Registry {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let found = discover_projects(fs.as_ref(), dir, &options()).unwrap();
    let mut registry = Registry::from_discovered(found, 10);
    register(&mut registry, &command, fs).unwrap();
    registry
}

fn command_lines(registry: &Registry) -> Vec<(String, String)> {
    registry
        .projects()
        .iter()
        .flat_map(|p| {
            p.units()
                .iter()
                .map(move |u| (p.name().to_string(), u.command_line()))
        })
        .collect()
}

#[test]
fn watch_picks_yarn_or_npm_per_project() {
    let dir = workspace();
    let registry = registry_for(dir.path(), QkCommand::Watch);

    assert_eq!(
        command_lines(&registry),
        vec![
            ("api".to_string(), "npm run start".to_string()),
            ("ui".to_string(), "npm run start".to_string()),
            ("web".to_string(), "yarn start".to_string()),
        ]
    );
}

#[test]
fn run_only_targets_projects_declaring_the_script() {
    let dir = workspace();

    let lint = registry_for(dir.path(), QkCommand::Run { script: "lint".into() });
    assert_eq!(
        command_lines(&lint),
        vec![("web".to_string(), "yarn lint".to_string())]
    );

    let start = registry_for(dir.path(), QkCommand::Run { script: "start".into() });
    assert_eq!(
        command_lines(&start),
        vec![
            ("api".to_string(), "npm run start".to_string()),
            ("web".to_string(), "yarn start".to_string()),
        ]
    );
}

#[cfg(unix)]
#[test]
fn symlinked_directories_are_not_followed() {
    use std::os::unix::fs::symlink;

    let dir = workspace();
    let root = dir.path();
    symlink(root, root.join("loop")).unwrap();
    symlink(root.join("web"), root.join("app-link")).unwrap();

    let mut opts = options();
    opts.max_depth = None;

    let found = discover_projects(&RealFileSystem, root, &opts).unwrap();
    let names: Vec<&str> = found.iter().map(|p| p.name.as_str()).collect();

    assert_eq!(names, vec!["api", "ui", "web"]);
    assert_eq!(found[2].dir, root.join("web"));
}
