use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::Builder;

/// Paths for one probe invocation. The probe runner owns their lifecycle;
/// nothing here deletes anything automatically except [`CleanupGuard`].
pub struct ScratchSet {
    pub source_path: PathBuf,
    pub executable_path: PathBuf,
}

/// Create a uniquely named C source file tagged with `label` for human
/// traceability.
///
/// Returns the open file together with its path and the path the compiled
/// executable will be written to. Any stale file already sitting at the
/// executable path is removed so a leftover binary from an earlier run can
/// never be mistaken for a fresh compile.
pub fn create_source(label: &str) -> io::Result<(File, ScratchSet)> {
    let named = Builder::new()
        .prefix(&format!("tmp-{label}-"))
        .suffix(".c")
        .tempfile()?;
    // The runner decides when scratch files die, not tempfile's Drop.
    let (file, source_path) = named.keep().map_err(|err| err.error)?;
    let executable_path = executable_path_for(&source_path);
    remove_if_exists(&executable_path);
    Ok((
        file,
        ScratchSet {
            source_path,
            executable_path,
        },
    ))
}

/// Executable path for a generated source: same stem, `.exe` on Windows,
/// no extension elsewhere.
pub fn executable_path_for(source_path: &Path) -> PathBuf {
    if cfg!(windows) {
        source_path.with_extension("exe")
    } else {
        source_path.with_extension("")
    }
}

/// Remove `path`, tolerating the file already being gone or inaccessible.
/// Cleanup must never fail the caller, whatever state the filesystem is in.
pub fn remove_if_exists(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
            ) => {}
        Err(err) => log::warn!("could not remove {}: {err}", path.display()),
    }
}

/// Scoped cleanup: every path pushed here is removed when the guard drops,
/// on success and on every error path alike. Removal is idempotent, so a
/// path deleted earlier by the runner is harmless to list again.
#[derive(Default)]
pub struct CleanupGuard {
    paths: Vec<PathBuf>,
}

impl CleanupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: PathBuf) {
        self.paths.push(path);
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            remove_if_exists(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn source_names_are_unique() {
        let (_a_file, a) = create_source("unique").expect("create a");
        let (_b_file, b) = create_source("unique").expect("create b");
        assert_ne!(a.source_path, b.source_path);
        assert_ne!(a.executable_path, b.executable_path);
        remove_if_exists(&a.source_path);
        remove_if_exists(&b.source_path);
    }

    #[test]
    fn label_lands_in_the_file_name() {
        let (_file, set) = create_source("trace-me").expect("create");
        let name = set
            .source_path
            .file_name()
            .expect("file name")
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with("tmp-trace-me-"), "unexpected name {name}");
        assert!(name.ends_with(".c"), "unexpected name {name}");
        remove_if_exists(&set.source_path);
    }

    #[test]
    fn executable_path_replaces_the_source_extension() {
        let exe = executable_path_for(Path::new("/tmp/tmp-x-abc123.c"));
        if cfg!(windows) {
            assert_eq!(exe, Path::new("/tmp/tmp-x-abc123.exe"));
        } else {
            assert_eq!(exe, Path::new("/tmp/tmp-x-abc123"));
        }
    }

    #[test]
    fn stale_executable_is_removed_by_remove_if_exists() {
        let (_file, set) = create_source("stale").expect("create");
        fs::write(&set.executable_path, b"stale binary").expect("plant stale file");
        remove_if_exists(&set.executable_path);
        assert!(!set.executable_path.exists());
        remove_if_exists(&set.source_path);
    }

    #[test]
    fn remove_if_exists_tolerates_missing_files() {
        let path = Path::new("/tmp/cprobe-definitely-not-here-404");
        remove_if_exists(path);
        remove_if_exists(path);
    }

    #[test]
    fn cleanup_guard_removes_its_paths_on_drop() {
        let (mut file, set) = create_source("guarded").expect("create");
        writeln!(file, "int main(void) {{ return 0; }}").expect("write");
        drop(file);
        {
            let mut guard = CleanupGuard::new();
            guard.push(set.source_path.clone());
            guard.push(set.executable_path.clone());
        }
        assert!(!set.source_path.exists());
        assert!(!set.executable_path.exists());
    }
}
