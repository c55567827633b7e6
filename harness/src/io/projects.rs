//! Project discovery: one script per project directory.
//!
//! The projects directory holds one subdirectory per project, each carrying
//! a single `.hsc` script file. Ambiguity is resolved the conservative way:
//! with several candidates, only a file whose stem matches the directory
//! name is taken, otherwise the project is skipped.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// File extension identifying a project script.
pub const SCRIPT_EXT: &str = "hsc";

/// Collect the script texts of every project under `projects_dir`.
///
/// Project directories are visited in name order so the playback queue is
/// deterministic. A missing projects directory yields an empty list; an
/// unreadable script file is logged and skipped.
pub fn find_scripts(projects_dir: &Path) -> Result<Vec<String>> {
    if !projects_dir.is_dir() {
        debug!(dir = %projects_dir.display(), "no projects directory");
        return Ok(Vec::new());
    }
    let mut project_dirs: Vec<PathBuf> = fs::read_dir(projects_dir)
        .with_context(|| format!("read projects directory {}", projects_dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_dir())
        .collect();
    project_dirs.sort();

    let mut scripts = Vec::new();
    for dir in project_dirs {
        let Some(file) = find_project_file(&dir) else {
            debug!(dir = %dir.display(), "no project script file");
            continue;
        };
        debug!(file = %file.display(), "loading script");
        match load_script(&file) {
            Ok(script) => scripts.push(script),
            Err(err) => warn!(file = %file.display(), error = ?err, "error loading script"),
        }
    }
    Ok(scripts)
}

/// Find the project script file within one project directory.
///
/// Exactly one `.hsc` candidate wins outright; with several, the one named
/// after the directory wins; otherwise there is no project file.
fn find_project_file(project_dir: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = fs::read_dir(project_dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == SCRIPT_EXT))
        .collect();
    if candidates.len() == 1 {
        return candidates.pop();
    }
    let dir_name = project_dir.file_name()?;
    candidates
        .into_iter()
        .find(|path| path.file_stem().is_some_and(|stem| stem == dir_name))
}

/// Read a script and prepend its working-directory binding, so paths inside
/// the script resolve relative to the project directory.
fn load_script(file: &Path) -> Result<String> {
    let body = fs::read_to_string(file).with_context(|| format!("read {}", file.display()))?;
    let dir = file
        .parent()
        .with_context(|| format!("script {} has no parent directory", file.display()))?;
    let dir = fs::canonicalize(dir).with_context(|| format!("resolve {}", dir.display()))?;
    Ok(format!("set _PWD {}\n{}", dir.display(), body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(root: &Path, name: &str, files: &[(&str, &str)]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).expect("create project dir");
        for (file, contents) in files {
            fs::write(dir.join(file), contents).expect("write script");
        }
    }

    #[test]
    fn missing_projects_directory_yields_no_scripts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let scripts = find_scripts(&temp.path().join("absent")).expect("find");
        assert!(scripts.is_empty());
    }

    #[test]
    fn scripts_load_in_directory_name_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        project(temp.path(), "beta", &[("beta.hsc", "second")]);
        project(temp.path(), "alpha", &[("alpha.hsc", "first")]);

        let scripts = find_scripts(temp.path()).expect("find");
        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].ends_with("first"));
        assert!(scripts[1].ends_with("second"));
    }

    #[test]
    fn scripts_carry_a_working_directory_binding() {
        let temp = tempfile::tempdir().expect("tempdir");
        project(temp.path(), "demo", &[("demo.hsc", "body")]);

        let scripts = find_scripts(temp.path()).expect("find");
        assert_eq!(scripts.len(), 1);
        let first_line = scripts[0].lines().next().expect("binding line");
        assert!(first_line.starts_with("set _PWD "));
        assert!(first_line.contains("demo"));
    }

    #[test]
    fn single_candidate_wins_regardless_of_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        project(temp.path(), "demo", &[("other.hsc", "body"), ("notes.txt", "x")]);

        let scripts = find_scripts(temp.path()).expect("find");
        assert_eq!(scripts.len(), 1);
    }

    #[test]
    fn ambiguity_resolves_to_the_directory_name() {
        let temp = tempfile::tempdir().expect("tempdir");
        project(
            temp.path(),
            "demo",
            &[("demo.hsc", "chosen"), ("stray.hsc", "ignored")],
        );

        let scripts = find_scripts(temp.path()).expect("find");
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].ends_with("chosen"));
    }

    #[test]
    fn unresolvable_ambiguity_skips_the_project() {
        let temp = tempfile::tempdir().expect("tempdir");
        project(
            temp.path(),
            "demo",
            &[("one.hsc", "a"), ("two.hsc", "b")],
        );

        let scripts = find_scripts(temp.path()).expect("find");
        assert!(scripts.is_empty());
    }
}
