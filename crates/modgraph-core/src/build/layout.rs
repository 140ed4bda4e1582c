use std::path::{Path, PathBuf};

use super::BuildError;

/// Snapshot file name inside the target directory.
pub const SNAPSHOT_FILE: &str = "depfile.txt";
/// Object directory name inside the target directory.
pub const OBJ_DIR: &str = "obj";
/// Lock file name inside the target directory.
pub const LOCK_FILE: &str = ".lock";

/// Paths used by one build of one root file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetLayout {
    pub root_file: PathBuf,
    pub target_dir: PathBuf,
    pub snapshot: PathBuf,
    pub obj_dir: PathBuf,
    pub artifact: PathBuf,
}

impl TargetLayout {
    /// Layout for `root_file` (`dir/name.d`): target dir `<build_dir>/name`,
    /// artifact `<exe_dir>/name`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] if `root_file` does not end in `.d`.
    pub fn for_root(root_file: &Path, build_dir: &Path, exe_dir: &Path) -> Result<Self, BuildError> {
        if root_file.extension().and_then(|e| e.to_str()) != Some("d") {
            return Err(BuildError::Config(format!(
                "root file must have the .d extension: {}",
                root_file.display()
            )));
        }
        let Some(stem) = root_file.file_stem().filter(|s| !s.is_empty()) else {
            return Err(BuildError::Config(format!(
                "root file has no name: {}",
                root_file.display()
            )));
        };

        let target_dir = build_dir.join(stem);
        Ok(Self {
            root_file: root_file.to_path_buf(),
            snapshot: target_dir.join(SNAPSHOT_FILE),
            obj_dir: target_dir.join(OBJ_DIR),
            artifact: exe_dir.join(stem),
            target_dir,
        })
    }

    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.target_dir.join(LOCK_FILE)
    }
}
