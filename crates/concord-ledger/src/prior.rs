//! Sources for the last committed ledger revision.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

/// Supplies the committed content of a ledger file, if there is one.
///
/// `Ok(None)` means "no prior committed revision", which puts the guard in
/// bootstrap mode. Failing to reach the source at all is an error.
pub trait PriorRevisionProvider {
    fn prior(&self, path: &Path) -> LedgerResult<Option<Vec<u8>>>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

/// Reads the prior revision from git with `git show <rev>:./<file>`.
///
/// The revision must resolve to a commit. The one exception is `HEAD` in a
/// repository with no commits yet, which has no prior revision. A resolvable
/// revision that lacks the file also has no prior revision.
#[derive(Clone, Debug)]
pub struct GitPriorRevision {
    rev: String,
}

impl GitPriorRevision {
    pub fn new(rev: impl Into<String>) -> Self {
        Self { rev: rev.into() }
    }

    pub fn head() -> Self {
        Self::new("HEAD")
    }
}

impl Default for GitPriorRevision {
    fn default() -> Self {
        Self::head()
    }
}

/// stderr fragments git prints when the revision exists but has no such file.
const ABSENT_MARKERS: &[&str] = &["does not exist in", "exists on disk, but not in"];

fn git(dir: &Path, args: &[&str]) -> LedgerResult<Output> {
    Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(|e| LedgerError::PriorRevision(format!("failed to run git: {e}")))
}

impl GitPriorRevision {
    /// Whether the revision names a commit in the repository at `dir`.
    fn resolves(&self, dir: &Path) -> LedgerResult<bool> {
        let commit = format!("{}^{{commit}}", self.rev);
        let output = git(dir, &["rev-parse", "--verify", "--quiet", &commit])?;
        Ok(output.status.success())
    }

    /// `HEAD` inside a repository that has no commits.
    fn is_unborn_head(&self, dir: &Path) -> LedgerResult<bool> {
        if self.rev != "HEAD" {
            return Ok(false);
        }
        let in_repo = git(dir, &["rev-parse", "--git-dir"])?.status.success();
        let has_head = git(dir, &["rev-parse", "--verify", "--quiet", "HEAD"])?
            .status
            .success();
        Ok(in_repo && !has_head)
    }
}

impl PriorRevisionProvider for GitPriorRevision {
    fn prior(&self, path: &Path) -> LedgerResult<Option<Vec<u8>>> {
        let file_name = path.file_name().ok_or_else(|| {
            LedgerError::PriorRevision(format!("{} has no file name", path.display()))
        })?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if self.rev.is_empty() || self.rev.starts_with('-') {
            let reason = format!("invalid revision {:?}", self.rev);
            return Err(LedgerError::PriorRevision(reason));
        }

        if !self.resolves(&dir)? {
            if self.is_unborn_head(&dir)? {
                debug!(dir = %dir.display(), "repository has no commits; no prior revision");
                return Ok(None);
            }
            return Err(LedgerError::PriorRevision(format!(
                "revision {} does not resolve to a commit in {}",
                self.rev,
                dir.display()
            )));
        }

        let object = format!("{}:./{}", self.rev, file_name.to_string_lossy());
        let output = git(&dir, &["show", &object])?;

        if output.status.success() {
            debug!(object = %object, bytes = output.stdout.len(), "read prior revision from git");
            return Ok(Some(output.stdout));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if ABSENT_MARKERS.iter().any(|m| stderr.contains(m)) {
            debug!(object = %object, "no prior revision in git");
            return Ok(None);
        }
        Err(LedgerError::PriorRevision(format!(
            "git show {object} failed: {}",
            stderr.trim()
        )))
    }

    fn describe(&self) -> String {
        format!("git:{}", self.rev)
    }
}

/// Uses a caller-named snapshot file as the committed revision.
#[derive(Clone, Debug)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PriorRevisionProvider for SnapshotFile {
    fn prior(&self, _path: &Path) -> LedgerResult<Option<Vec<u8>>> {
        fs::read(&self.path)
            .map(Some)
            .map_err(|e| LedgerError::io(&self.path, e))
    }

    fn describe(&self) -> String {
        format!("snapshot:{}", self.path.display())
    }
}

/// There is never a prior revision; every check is a bootstrap check.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPrior;

impl PriorRevisionProvider for NoPrior {
    fn prior(&self, _path: &Path) -> LedgerResult<Option<Vec<u8>>> {
        Ok(None)
    }

    fn describe(&self) -> String {
        "none".into()
    }
}

/// Fixed in-memory prior revision, for tests and embedding.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPrior {
    bytes: Option<Vec<u8>>,
}

impl InMemoryPrior {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }
}

impl PriorRevisionProvider for InMemoryPrior {
    fn prior(&self, _path: &Path) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.bytes.clone())
    }

    fn describe(&self) -> String {
        "memory".into()
    }
}
