use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use crate::deps::try_read_listing;
use crate::filter::ModuleFilter;

use super::layout::LOCK_FILE;
use super::staleness::{BuildState, Staleness, compile_units, listed_files};
use super::{BuildError, TargetLayout, Toolchain};

/// What a call to [`BuildDriver::run`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    UpToDate,
    Built {
        /// Decision that led to the rebuild.
        reason: Staleness,
        sources: usize,
        objects: usize,
    },
}

/// Runs the decide, regenerate, compile, link sequence for one target.
pub struct BuildDriver<'a, T> {
    layout: &'a TargetLayout,
    filter: &'a ModuleFilter,
    work_root: &'a Path,
    toolchain: T,
    force_clean: bool,
}

impl<'a, T: Toolchain> BuildDriver<'a, T> {
    /// `work_root` is the directory relative source paths are resolved
    /// against (the compiler's working directory).
    pub const fn new(
        layout: &'a TargetLayout,
        filter: &'a ModuleFilter,
        work_root: &'a Path,
        toolchain: T,
    ) -> Self {
        Self {
            layout,
            filter,
            work_root,
            toolchain,
            force_clean: false,
        }
    }

    /// Empty the target directory before building. The lock file is kept.
    #[must_use]
    pub const fn force_clean(mut self, force: bool) -> Self {
        self.force_clean = force;
        self
    }

    pub const fn toolchain(&self) -> &T {
        &self.toolchain
    }

    /// Decide from the previous snapshot whether a build is needed.
    ///
    /// A snapshot that cannot be read or parsed is treated like a missing
    /// one, since it is regenerated anyway.
    #[must_use]
    pub fn inspect(&self) -> Staleness {
        let edges = match try_read_listing(&self.layout.snapshot) {
            Ok(Some(edges)) => edges,
            Ok(None) => return Staleness::StaleUnknown,
            Err(err) => {
                warn!(error = %err, "ignoring unusable dependency snapshot");
                return Staleness::StaleUnknown;
            }
        };
        let files = listed_files(&self.layout.root_file, &edges, self.work_root);
        BuildState::capture(self.layout, &files).decide()
    }

    /// Build the target unless it is up to date.
    ///
    /// # Errors
    ///
    /// Fails if the target directory cannot be prepared, any toolchain phase
    /// fails, or the compiler leaves no usable snapshot behind.
    #[instrument(skip_all, fields(root = %self.layout.root_file.display()))]
    pub fn run(&mut self) -> Result<BuildOutcome, BuildError> {
        info!("Working directory: '{}'", self.layout.target_dir.display());
        if self.force_clean {
            clear_dir_except(&self.layout.target_dir, LOCK_FILE)?;
        }
        fs::create_dir_all(&self.layout.obj_dir)
            .map_err(|e| BuildError::io(&self.layout.obj_dir, e))?;

        let staleness = self.inspect();
        match &staleness {
            Staleness::UpToDate => {
                info!("Everything seems to be up-to-date, not compiling.");
                return Ok(BuildOutcome::UpToDate);
            }
            Staleness::StaleUnknown => info!("no previous build found"),
            Staleness::Rebuild(reason) => info!(%reason, "rebuilding"),
        }

        remove_dir_if_exists(&self.layout.obj_dir)?;
        fs::create_dir_all(&self.layout.obj_dir)
            .map_err(|e| BuildError::io(&self.layout.obj_dir, e))?;
        remove_file_if_exists(&self.layout.snapshot)?;

        self.toolchain.emit_dependencies(
            &self.layout.root_file,
            &self.layout.obj_dir,
            &self.layout.snapshot,
        )?;

        let edges = match try_read_listing(&self.layout.snapshot)? {
            Some(edges) if !edges.is_empty() => edges,
            _ => {
                return Err(BuildError::MissingSnapshot {
                    path: self.layout.snapshot.clone(),
                });
            }
        };

        let sources = compile_units(&self.layout.root_file, &edges, self.filter, self.work_root);
        self.toolchain.compile(&sources, &self.layout.obj_dir)?;

        let objects = collect_objects(&self.layout.obj_dir)?;
        if let Some(exe_dir) = self.layout.artifact.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(exe_dir).map_err(|e| BuildError::io(exe_dir, e))?;
        }
        self.toolchain.link(&objects, &self.layout.artifact)?;

        Ok(BuildOutcome::Built {
            reason: staleness,
            sources: sources.len(),
            objects: objects.len(),
        })
    }
}

/// Remove `build_dir` and everything below it. Returns `false` if it did
/// not exist.
///
/// # Errors
///
/// Fails if the directory exists but cannot be removed.
pub fn clean_build_dir(build_dir: &Path) -> Result<bool, BuildError> {
    let existed = build_dir.exists();
    remove_dir_if_exists(build_dir)?;
    if existed {
        info!(dir = %build_dir.display(), "removed build directory");
    }
    Ok(existed)
}

/// Remove everything in `dir` except the entry named `keep`.
fn clear_dir_except(dir: &Path, keep: &str) -> Result<(), BuildError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(BuildError::io(dir, err)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| BuildError::io(dir, e))?;
        if entry.file_name() == keep {
            continue;
        }
        let path = entry.path();
        let removed = if entry.file_type().is_ok_and(|t| t.is_dir()) {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| BuildError::io(&path, e))?;
    }
    Ok(())
}

fn remove_dir_if_exists(dir: &Path) -> Result<(), BuildError> {
    match fs::remove_dir_all(dir) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(BuildError::io(dir, err)),
        _ => Ok(()),
    }
}

fn remove_file_if_exists(path: &Path) -> Result<(), BuildError> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(BuildError::io(path, err)),
        _ => Ok(()),
    }
}

/// Every file below `obj_dir`, sorted by path.
fn collect_objects(obj_dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
    let mut objects = Vec::new();
    for entry in WalkDir::new(obj_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(obj_dir).to_path_buf();
            BuildError::io(path, io::Error::other(e))
        })?;
        if entry.file_type().is_file() {
            objects.push(entry.into_path());
        }
    }
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Phase;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    use crate::build::RebuildReason;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Dependencies,
        Compile(Vec<PathBuf>),
        Link(Vec<PathBuf>),
    }

    /// Writes a fixed listing, one `.o` per source, and an empty artifact.
    #[derive(Default)]
    struct FakeToolchain {
        listing: String,
        fail: Option<Phase>,
        /// Report success for the dependency phase without writing a listing.
        silent: bool,
        calls: Vec<Call>,
    }

    impl FakeToolchain {
        fn new(listing: &str) -> Self {
            Self {
                listing: listing.to_string(),
                ..Self::default()
            }
        }

        fn check(&self, phase: Phase) -> Result<(), BuildError> {
            if self.fail == Some(phase) {
                return Err(BuildError::ToolFailed {
                    phase,
                    status: "exit status: 1".to_string(),
                });
            }
            Ok(())
        }
    }

    impl Toolchain for FakeToolchain {
        fn emit_dependencies(
            &mut self,
            _root: &Path,
            _obj_dir: &Path,
            snapshot: &Path,
        ) -> Result<(), BuildError> {
            self.calls.push(Call::Dependencies);
            self.check(Phase::Dependencies)?;
            if self.silent {
                return Ok(());
            }
            fs::write(snapshot, &self.listing).map_err(|e| BuildError::io(snapshot, e))
        }

        fn compile(&mut self, sources: &[PathBuf], obj_dir: &Path) -> Result<(), BuildError> {
            self.calls.push(Call::Compile(sources.to_vec()));
            self.check(Phase::Compile)?;
            for source in sources {
                let stem = source.file_stem().expect("stem");
                let obj = obj_dir.join(stem).with_extension("o");
                fs::write(&obj, b"").map_err(|e| BuildError::io(&obj, e))?;
            }
            Ok(())
        }

        fn link(&mut self, objects: &[PathBuf], artifact: &Path) -> Result<(), BuildError> {
            self.calls.push(Call::Link(objects.to_vec()));
            self.check(Phase::Link)?;
            fs::write(artifact, b"exe").map_err(|e| BuildError::io(artifact, e))
        }
    }

    const LISTING: &str = "\
app (app.d) : private : util (util.d)
app (app.d) : private : std.stdio (imports/std/stdio.d)
util (util.d) : private : object (imports/object.d)
app (app.d) : private : c.zlib (imports/zlib.di)
";

    /// Files of `LISTING` that are imported but never compiled.
    const IMPORT_ONLY: [&str; 3] = ["imports/std/stdio.d", "imports/object.d", "imports/zlib.di"];

    struct Project {
        dir: TempDir,
        layout: TargetLayout,
    }

    impl Project {
        fn new() -> Self {
            let dir = TempDir::new().expect("tempdir");
            fs::write(dir.path().join("app.d"), "import util;").expect("app.d");
            fs::write(dir.path().join("util.d"), "module util;").expect("util.d");
            fs::create_dir_all(dir.path().join("imports/std")).expect("imports dir");
            for file in IMPORT_ONLY {
                fs::write(dir.path().join(file), "").expect("import-only file");
            }
            let layout = TargetLayout::for_root(
                Path::new("app.d"),
                &dir.path().join("build"),
                &dir.path().join("bin"),
            )
            .expect("layout");
            Self { dir, layout }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn pin(&self, path: &Path, secs: u64) {
            let file = fs::OpenOptions::new()
                .write(true)
                .open(path)
                .expect("open for mtime");
            file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
                .expect("set mtime");
        }

        /// Sources at 1000s, snapshot at 2000s, executable at 3000s.
        fn pin_built(&self) {
            self.pin(&self.root().join("app.d"), 1_000);
            self.pin(&self.root().join("util.d"), 1_000);
            for file in IMPORT_ONLY {
                self.pin(&self.root().join(file), 1_000);
            }
            self.pin(&self.layout.snapshot, 2_000);
            self.pin(&self.layout.artifact, 3_000);
        }
    }

    #[test]
    fn first_build_runs_every_phase() {
        let project = Project::new();
        let filter = ModuleFilter::default();
        let mut driver =
            BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(LISTING));

        let outcome = driver.run().expect("build");
        assert_eq!(
            outcome,
            BuildOutcome::Built {
                reason: Staleness::StaleUnknown,
                sources: 2,
                objects: 2,
            }
        );

        let obj = &project.layout.obj_dir;
        assert_eq!(
            driver.toolchain().calls,
            vec![
                Call::Dependencies,
                Call::Compile(vec![project.root().join("app.d"), project.root().join("util.d")]),
                Call::Link(vec![obj.join("app.o"), obj.join("util.o")]),
            ]
        );
        assert!(project.layout.artifact.exists());
    }

    #[test]
    fn second_build_is_up_to_date() {
        let project = Project::new();
        let filter = ModuleFilter::default();
        BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(LISTING))
            .run()
            .expect("first build");
        project.pin_built();

        let mut driver =
            BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(LISTING));
        assert_eq!(driver.run().expect("second build"), BuildOutcome::UpToDate);
        assert!(driver.toolchain().calls.is_empty());
    }

    #[test]
    fn touched_source_triggers_rebuild() {
        let project = Project::new();
        let filter = ModuleFilter::default();
        BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(LISTING))
            .run()
            .expect("first build");
        project.pin_built();
        project.pin(&project.root().join("util.d"), 2_500);

        let mut driver =
            BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(LISTING));
        let outcome = driver.run().expect("rebuild");
        assert_eq!(
            outcome,
            BuildOutcome::Built {
                reason: Staleness::Rebuild(RebuildReason::SourceNewer(
                    project.root().join("util.d")
                )),
                sources: 2,
                objects: 2,
            }
        );
    }

    #[test]
    fn touched_interface_file_triggers_rebuild() {
        let project = Project::new();
        let filter = ModuleFilter::default();
        BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(LISTING))
            .run()
            .expect("first build");
        project.pin_built();
        project.pin(&project.root().join("imports/zlib.di"), 2_500);

        let mut driver =
            BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(LISTING));
        assert_eq!(
            driver.inspect(),
            Staleness::Rebuild(RebuildReason::SourceNewer(
                project.root().join("imports/zlib.di")
            ))
        );
        let outcome = driver.run().expect("rebuild");
        assert!(matches!(outcome, BuildOutcome::Built { sources: 2, .. }));
    }

    #[test]
    fn previous_snapshot_is_not_reused_when_regeneration_writes_nothing() {
        let project = Project::new();
        let filter = ModuleFilter::default();
        BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(LISTING))
            .run()
            .expect("first build");
        project.pin_built();
        project.pin(&project.root().join("app.d"), 2_500);

        let mut toolchain = FakeToolchain::new(LISTING);
        toolchain.silent = true;
        let mut driver = BuildDriver::new(&project.layout, &filter, project.root(), toolchain);
        let err = driver.run().unwrap_err();
        assert!(matches!(err, BuildError::MissingSnapshot { .. }));
        assert_eq!(driver.toolchain().calls, vec![Call::Dependencies]);
        assert!(!project.layout.snapshot.exists());
    }

    #[test]
    fn rebuild_clears_stale_objects() {
        let project = Project::new();
        let filter = ModuleFilter::default();
        fs::create_dir_all(&project.layout.obj_dir).expect("obj dir");
        fs::write(project.layout.obj_dir.join("removed.o"), b"").expect("stale obj");

        let mut driver =
            BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(LISTING));
        driver.run().expect("build");
        assert!(!project.layout.obj_dir.join("removed.o").exists());
    }

    #[test]
    fn malformed_prior_snapshot_is_rebuilt() {
        let project = Project::new();
        let filter = ModuleFilter::default();
        fs::create_dir_all(&project.layout.target_dir).expect("target dir");
        fs::write(&project.layout.snapshot, "garbage\n").expect("snapshot");

        let mut driver =
            BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(LISTING));
        assert_eq!(driver.inspect(), Staleness::StaleUnknown);
        assert!(matches!(driver.run(), Ok(BuildOutcome::Built { .. })));
    }

    #[test]
    fn empty_regenerated_snapshot_is_fatal() {
        let project = Project::new();
        let filter = ModuleFilter::default();
        let mut driver =
            BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(""));
        let err = driver.run().unwrap_err();
        assert!(matches!(err, BuildError::MissingSnapshot { .. }));
        assert_eq!(driver.toolchain().calls, vec![Call::Dependencies]);
    }

    #[test]
    fn compile_failure_stops_before_link() {
        let project = Project::new();
        let filter = ModuleFilter::default();
        let mut toolchain = FakeToolchain::new(LISTING);
        toolchain.fail = Some(Phase::Compile);
        let mut driver = BuildDriver::new(&project.layout, &filter, project.root(), toolchain);

        let err = driver.run().unwrap_err();
        assert_eq!(err.code().code(), "E3002");
        assert!(!driver
            .toolchain()
            .calls
            .iter()
            .any(|c| matches!(c, Call::Link(_))));
        assert!(!project.layout.artifact.exists());
    }

    #[test]
    fn force_clean_removes_target_dir() {
        let project = Project::new();
        let filter = ModuleFilter::default();
        fs::create_dir_all(&project.layout.target_dir).expect("target dir");
        let marker = project.layout.target_dir.join("compile.rsp");
        fs::write(&marker, "-c\n").expect("marker");
        fs::write(project.layout.lock_path(), b"").expect("lock file");

        BuildDriver::new(&project.layout, &filter, project.root(), FakeToolchain::new(LISTING))
            .force_clean(true)
            .run()
            .expect("build");
        assert!(!marker.exists());
        assert!(project.layout.lock_path().exists());
        assert!(project.layout.snapshot.exists());
    }

    #[test]
    fn clean_removes_build_dir() {
        let dir = TempDir::new().expect("tempdir");
        let build_dir = dir.path().join("build");
        fs::create_dir_all(build_dir.join("app/obj")).expect("mkdir");

        assert!(clean_build_dir(&build_dir).expect("clean"));
        assert!(!build_dir.exists());
        assert!(!clean_build_dir(&build_dir).expect("clean again"));
    }
}
