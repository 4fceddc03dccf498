//! Derive a descriptive SLURM job name from where a config file lives
//!
//! The name is the path of the config relative to the nearest git repository (prefixed with the
//! repository directory name) or relative to the home directory, whichever is reached first when
//! walking up from the file.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};

/// Directory that marks the root of a git working tree
static REPOSITORY_MARKER: &str = ".git";

/// Where the upward walk stopped
#[derive(Debug, PartialEq, Eq)]
pub enum RootSearch {
    /// An ancestor contains a repository marker
    Repository { root: PathBuf, relative: PathBuf },
    /// The home directory was reached before any repository
    Home { relative: PathBuf },
    NotFound,
}

/// Resolve `.` and `..` without touching the filesystem
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Walk the ancestors of `path`, nearest first, checking for a repository marker before
/// comparing against `home`
pub fn find_root(path: &Path, home: Option<&Path>) -> RootSearch {
    let path = normalize(path);
    let home = home.map(normalize);

    for parent in path.ancestors().skip(1) {
        if parent.join(REPOSITORY_MARKER).is_dir() {
            return match path.strip_prefix(parent) {
                Ok(relative) => RootSearch::Repository {
                    root: parent.to_path_buf(),
                    relative: relative.to_path_buf(),
                },
                Err(_) => RootSearch::NotFound,
            };
        }
        if Some(parent) == home.as_deref() {
            return match path.strip_prefix(parent) {
                Ok(relative) => RootSearch::Home { relative: relative.to_path_buf() },
                Err(_) => RootSearch::NotFound,
            };
        }
    }

    RootSearch::NotFound
}

/// Underscore-joined job name for a config file
///
/// Falls back to the bare file name when neither a repository nor the home directory encloses
/// the file.
pub fn job_name(path: &Path, home: Option<&Path>) -> String {
    let search = find_root(path, home);
    debug!("Root search for {}: {:?}", path.display(), search);

    let parts: Vec<String> = match search {
        RootSearch::Repository { root, relative } => root
            .file_name()
            .into_iter()
            .chain(relative.iter())
            .map(lossy)
            .collect(),
        RootSearch::Home { relative } => relative.iter().map(lossy).collect(),
        RootSearch::NotFound => {
            warn!(
                "{} is outside any repository or home, using the file name as job name",
                path.display()
            );
            normalize(path).file_name().into_iter().map(lossy).collect()
        }
    };

    parts.join("_")
}

fn lossy(part: &OsStr) -> String {
    part.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/home/user/proj/.git/../run1/./input.conf")),
            PathBuf::from("/home/user/proj/run1/input.conf")
        );
        assert_eq!(normalize(Path::new("/a/b/../../c")), PathBuf::from("/c"));
    }

    #[test]
    fn test_repository_before_home() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("user");
        fs::create_dir_all(home.join("proj").join(".git")).unwrap();
        let config = home.join("proj").join("run1").join("input.conf");
        touch(&config);

        let dotted = home.join("proj/.git/../run1/input.conf");
        assert_eq!(job_name(&dotted, Some(&home)), "proj_run1_input.conf");
        assert_eq!(
            find_root(&config, Some(&home)),
            RootSearch::Repository {
                root: home.join("proj"),
                relative: PathBuf::from("run1/input.conf")
            }
        );
    }

    #[test]
    fn test_home_before_repository() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("repo").join(".git")).unwrap();
        let home = temp.path().join("repo").join("user");
        let config = home.join("sim").join("eq.namd");
        touch(&config);

        assert_eq!(job_name(&config, Some(&home)), "sim_eq.namd");
        assert_eq!(
            find_root(&config, Some(&home)),
            RootSearch::Home { relative: PathBuf::from("sim/eq.namd") }
        );
    }

    #[test]
    fn test_marker_must_be_directory() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("user");
        touch(&home.join("proj").join(".git"));
        let config = home.join("proj").join("md.conf");
        touch(&config);

        assert_eq!(job_name(&config, Some(&home)), "proj_md.conf");
    }

    #[test]
    fn test_not_found_falls_back_to_file_name() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("loose").join("prod.conf");
        touch(&config);
        let elsewhere = temp.path().join("elsewhere");

        assert_eq!(find_root(&config, Some(&elsewhere)), RootSearch::NotFound);
        assert_eq!(job_name(&config, Some(&elsewhere)), "prod.conf");
        assert_eq!(job_name(&config, None), "prod.conf");
    }
}
