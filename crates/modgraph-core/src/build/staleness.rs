//! Up-to-date decision for one build target.
//!
//! Everything is compared against the mtime of the previous dependency
//! snapshot. The decision only ever errs towards rebuilding: an unreadable
//! timestamp counts as missing, and a missing file forces a rebuild.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, trace};

use crate::deps::DependencyEdge;
use crate::filter::ModuleFilter;

use super::TargetLayout;

/// Modification time of `path`, or `None` if it cannot be read.
#[must_use]
pub fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

// ---------------------------------------------------------------------------
// Compile units
// ---------------------------------------------------------------------------

/// Source files to compile for `root`, given the edges of its snapshot.
///
/// The root comes first, followed by every imported file once, in first-seen
/// order. Files of ignored modules and interface files (`.di`) are skipped.
/// Relative paths are resolved against `base`.
#[must_use]
pub fn compile_units(
    root: &Path,
    edges: &[DependencyEdge],
    filter: &ModuleFilter,
    base: &Path,
) -> Vec<PathBuf> {
    let root = base.join(root);
    let mut seen: HashSet<PathBuf> = HashSet::new();
    seen.insert(root.clone());
    let mut units = vec![root];
    let mut skipped = 0usize;

    for edge in edges {
        let file = base.join(&edge.to_file);
        if !seen.insert(file.clone()) {
            continue;
        }
        let interface = file.extension().is_some_and(|ext| ext == "di");
        if interface || filter.is_excluded(&edge.to_module) {
            trace!(module = %edge.to_module, file = %file.display(), "not compiled");
            skipped += 1;
            continue;
        }
        units.push(file);
    }

    debug!(
        files = units.len(),
        import_only = skipped,
        import_lines = edges.len(),
        "collected compile units"
    );
    units
}

/// Every file `edges` names, importers and imports alike, plus `root`.
///
/// This is the set whose timestamps decide staleness. Unlike
/// [`compile_units`] it keeps interface files and files of ignored modules,
/// so an edited `.di` header forces a rebuild too.
#[must_use]
pub fn listed_files(root: &Path, edges: &[DependencyEdge], base: &Path) -> Vec<PathBuf> {
    let root = base.join(root);
    let mut seen: HashSet<PathBuf> = HashSet::new();
    seen.insert(root.clone());
    let mut files = vec![root];
    for edge in edges {
        for file in [&edge.from_file, &edge.to_file] {
            let file = base.join(file);
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }
    files
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why a target has to be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildReason {
    /// The snapshot's mtime is at or before the Unix epoch.
    SnapshotPredatesEpoch,
    SourceNewer(PathBuf),
    SourceMissing(PathBuf),
    ArtifactMissing,
    /// A previous build stopped after regenerating the snapshot.
    ArtifactOlder,
}

impl fmt::Display for RebuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SnapshotPredatesEpoch => write!(f, "snapshot has no usable timestamp"),
            Self::SourceNewer(path) => write!(f, "{} changed", path.display()),
            Self::SourceMissing(path) => write!(f, "{} is missing", path.display()),
            Self::ArtifactMissing => write!(f, "executable is missing"),
            Self::ArtifactOlder => write!(f, "executable is older than the snapshot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    /// No previous snapshot; the target has never been built here.
    StaleUnknown,
    UpToDate,
    Rebuild(RebuildReason),
}

impl Staleness {
    #[must_use]
    pub const fn needs_build(&self) -> bool {
        !matches!(self, Self::UpToDate)
    }
}

/// Timestamps that the decision is made from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildState {
    pub snapshot: Option<SystemTime>,
    pub sources: Vec<(PathBuf, Option<SystemTime>)>,
    pub artifact: Option<SystemTime>,
}

impl BuildState {
    /// Read the current timestamps for `layout` and `sources`, normally the
    /// result of [`listed_files`].
    #[must_use]
    pub fn capture(layout: &TargetLayout, sources: &[PathBuf]) -> Self {
        Self {
            snapshot: mtime(&layout.snapshot),
            sources: sources.iter().map(|p| (p.clone(), mtime(p))).collect(),
            artifact: mtime(&layout.artifact),
        }
    }

    #[must_use]
    pub fn decide(&self) -> Staleness {
        let Some(snapshot) = self.snapshot else {
            return Staleness::StaleUnknown;
        };
        if snapshot <= UNIX_EPOCH {
            return Staleness::Rebuild(RebuildReason::SnapshotPredatesEpoch);
        }

        for (path, modified) in &self.sources {
            match modified {
                None => return Staleness::Rebuild(RebuildReason::SourceMissing(path.clone())),
                Some(t) if *t > snapshot => {
                    return Staleness::Rebuild(RebuildReason::SourceNewer(path.clone()));
                }
                Some(_) => {}
            }
        }

        match self.artifact {
            None => Staleness::Rebuild(RebuildReason::ArtifactMissing),
            Some(t) if t < snapshot => Staleness::Rebuild(RebuildReason::ArtifactOlder),
            Some(_) => Staleness::UpToDate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn at(secs: u64) -> Option<SystemTime> {
        Some(UNIX_EPOCH + Duration::from_secs(secs))
    }

    fn state(snapshot: Option<SystemTime>, sources: &[Option<SystemTime>], artifact: Option<SystemTime>) -> BuildState {
        BuildState {
            snapshot,
            sources: sources
                .iter()
                .enumerate()
                .map(|(i, t)| (PathBuf::from(format!("m{i}.d")), *t))
                .collect(),
            artifact,
        }
    }

    fn edge(module: &str, file: &str) -> DependencyEdge {
        DependencyEdge {
            from_module: "app".to_string(),
            from_file: PathBuf::from("app.d"),
            kind: "private".to_string(),
            to_module: module.to_string(),
            to_file: PathBuf::from(file),
        }
    }

    #[test]
    fn no_snapshot_is_stale_unknown() {
        let s = state(None, &[at(10)], at(10));
        assert_eq!(s.decide(), Staleness::StaleUnknown);
        assert!(s.decide().needs_build());
    }

    #[test]
    fn older_sources_and_newer_artifact_are_up_to_date() {
        let s = state(at(100), &[at(90), at(100)], at(150));
        assert_eq!(s.decide(), Staleness::UpToDate);
        assert!(!s.decide().needs_build());
    }

    #[test]
    fn newer_source_triggers_rebuild() {
        let s = state(at(100), &[at(90), at(101)], at(150));
        assert_eq!(
            s.decide(),
            Staleness::Rebuild(RebuildReason::SourceNewer(PathBuf::from("m1.d")))
        );
    }

    #[test]
    fn missing_source_triggers_rebuild() {
        let s = state(at(100), &[None], at(150));
        assert!(matches!(
            s.decide(),
            Staleness::Rebuild(RebuildReason::SourceMissing(_))
        ));
    }

    #[test]
    fn artifact_older_than_snapshot_triggers_rebuild() {
        let s = state(at(100), &[at(50)], at(99));
        assert_eq!(s.decide(), Staleness::Rebuild(RebuildReason::ArtifactOlder));
        let s = state(at(100), &[at(50)], None);
        assert_eq!(s.decide(), Staleness::Rebuild(RebuildReason::ArtifactMissing));
    }

    #[test]
    fn epoch_snapshot_triggers_rebuild() {
        let s = state(Some(UNIX_EPOCH), &[], at(10));
        assert_eq!(
            s.decide(),
            Staleness::Rebuild(RebuildReason::SnapshotPredatesEpoch)
        );
    }

    #[test]
    fn capture_reads_pinned_mtimes() {
        let dir = TempDir::new().expect("tempdir");
        let layout = TargetLayout::for_root(
            Path::new("app.d"),
            &dir.path().join("build"),
            &dir.path().join("bin"),
        )
        .expect("layout");
        fs::create_dir_all(&layout.target_dir).expect("target dir");
        fs::create_dir_all(dir.path().join("bin")).expect("bin dir");

        let source = dir.path().join("app.d");
        let pin = |path: &Path, secs: u64| {
            let file = fs::File::create(path).expect("create");
            file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
                .expect("set mtime");
        };
        pin(&source, 1_000);
        pin(&layout.snapshot, 2_000);
        pin(&layout.artifact, 3_000);

        let captured = BuildState::capture(&layout, std::slice::from_ref(&source));
        assert_eq!(captured.snapshot, at(2_000));
        assert_eq!(captured.artifact, at(3_000));
        assert_eq!(captured.decide(), Staleness::UpToDate);

        pin(&source, 2_500);
        let captured = BuildState::capture(&layout, std::slice::from_ref(&source));
        assert_eq!(
            captured.decide(),
            Staleness::Rebuild(RebuildReason::SourceNewer(source))
        );
    }

    #[test]
    fn compile_units_keep_root_first_and_dedupe() {
        let edges = vec![
            edge("app.util", "app/util.d"),
            edge("std.stdio", "/usr/include/d/std/stdio.d"),
            edge("app.util", "app/util.d"),
            edge("c.zlib", "c/zlib.di"),
            edge("app.main", "app.d"),
            edge("app.net", "app/net.d"),
        ];
        let units = compile_units(
            Path::new("app.d"),
            &edges,
            &ModuleFilter::default(),
            Path::new("/work"),
        );
        assert_eq!(
            units,
            vec![
                PathBuf::from("/work/app.d"),
                PathBuf::from("/work/app/util.d"),
                PathBuf::from("/work/app/net.d"),
            ]
        );
    }

    #[test]
    fn listed_files_keep_interfaces_and_ignored_modules() {
        let edges = vec![
            edge("app.util", "app/util.d"),
            edge("std.stdio", "/usr/include/d/std/stdio.d"),
            edge("c.zlib", "c/zlib.di"),
            DependencyEdge {
                from_module: "app.util".to_string(),
                from_file: PathBuf::from("app/util.d"),
                kind: "private".to_string(),
                to_module: "app.util".to_string(),
                to_file: PathBuf::from("app/util.d"),
            },
        ];
        let files = listed_files(Path::new("app.d"), &edges, Path::new("/work"));
        assert_eq!(
            files,
            vec![
                PathBuf::from("/work/app.d"),
                PathBuf::from("/work/app/util.d"),
                PathBuf::from("/usr/include/d/std/stdio.d"),
                PathBuf::from("/work/c/zlib.di"),
            ]
        );
    }

    #[test]
    fn edited_interface_file_triggers_rebuild() {
        let dir = TempDir::new().expect("tempdir");
        let layout = TargetLayout::for_root(
            Path::new("app.d"),
            &dir.path().join("build"),
            &dir.path().join("bin"),
        )
        .expect("layout");
        fs::create_dir_all(&layout.target_dir).expect("target dir");
        fs::create_dir_all(dir.path().join("bin")).expect("bin dir");

        let pin = |path: &Path, secs: u64| {
            let file = fs::File::create(path).expect("create");
            file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
                .expect("set mtime");
        };
        let header = dir.path().join("zlib.di");
        pin(&dir.path().join("app.d"), 1_000);
        pin(&header, 2_500);
        pin(&layout.snapshot, 2_000);
        pin(&layout.artifact, 3_000);

        let edges = vec![edge("c.zlib", "zlib.di")];
        let units = compile_units(Path::new("app.d"), &edges, &ModuleFilter::default(), dir.path());
        assert_eq!(units, vec![dir.path().join("app.d")]);

        let files = listed_files(Path::new("app.d"), &edges, dir.path());
        assert_eq!(
            BuildState::capture(&layout, &files).decide(),
            Staleness::Rebuild(RebuildReason::SourceNewer(header))
        );
    }

    #[test]
    fn absolute_paths_are_not_rebased() {
        let units = compile_units(
            Path::new("/src/app.d"),
            &[edge("lib.x", "/lib/x.d")],
            &ModuleFilter::default(),
            Path::new("/work"),
        );
        assert_eq!(units, vec![PathBuf::from("/src/app.d"), PathBuf::from("/lib/x.d")]);
    }
}
