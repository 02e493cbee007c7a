// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Resource synchronization.
//!
//! Worktrees of the same repository share history, but not the files that
//! version control ignores: installed dependencies, environment files, build
//! artifacts, etc. The __synchronizer__ re-establishes those resources in a
//! receiving worktree by either linking them back to the main worktree, or by
//! copying them over.
//!
//! # Resource Processing
//!
//! Every declared resource is processed on its own, in declaration order,
//! symlink resources first. Each one yields exactly one [`SyncOutcome`]:
//!
//! 1. Source missing from the main worktree? Skip it.
//! 2. Destination already present? Leave it alone.
//! 3. Otherwise create the parent directories of the destination, then link
//!    or copy.
//!
//! Existence is always checked without following symbolic links, so a
//! dangling link counts as present. Because present destinations are never
//! touched, running the synchronizer twice is harmless.
//!
//! A failure on one resource is recorded in its outcome and never stops the
//! remaining resources from being processed. Callers should scan the outcomes
//! for [`SyncOutcome::success`] to find out whether anything went wrong.

pub mod copy;
pub mod link;

use crate::config::ResourceSpec;

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{create_dir_all, symlink_metadata},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Action taken for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Linked to the source.
    Symlink,

    /// Duplicated from the source.
    Copy,

    /// Source was missing.
    Skip,

    /// Destination was already present.
    Exists,

    /// Failed before a link or copy could be attempted.
    Error,
}

impl Display for SyncMode {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let mode = match self {
            Self::Symlink => "symlink",
            Self::Copy => "copy",
            Self::Skip => "skip",
            Self::Exists => "exists",
            Self::Error => "error",
        };
        fmt.write_str(mode)
    }
}

/// Result of synchronizing one resource.
#[derive(Debug)]
pub struct SyncOutcome {
    resource: String,
    mode: SyncMode,
    failure: Option<SyncError>,
}

impl SyncOutcome {
    pub(crate) fn done(resource: &str, mode: SyncMode) -> Self {
        Self {
            resource: resource.into(),
            mode,
            failure: None,
        }
    }

    pub(crate) fn failed(resource: &str, mode: SyncMode, failure: SyncError) -> Self {
        Self {
            resource: resource.into(),
            mode,
            failure: Some(failure),
        }
    }

    /// Resource path exactly as it was declared.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Action actually taken.
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Resource is in place at the destination.
    ///
    /// True for linked, copied, and already present resources.
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// Cause of failure for skipped or failed resources.
    pub fn failure(&self) -> Option<&SyncError> {
        self.failure.as_ref()
    }
}

/// Synchronize resources from source tree into destination tree.
///
/// Symlink resources are linked, unless `force_copy` is set in which case
/// they are copied like copy resources. Returns one outcome per declared
/// resource, in declaration order, symlink resources first.
pub fn synchronize(
    resources: &ResourceSpec,
    source_root: impl AsRef<Path>,
    dest_root: impl AsRef<Path>,
    force_copy: bool,
) -> Vec<SyncOutcome> {
    synchronize_with_progress(resources, source_root, dest_root, force_copy, |_| {})
}

/// Synchronize resources while reporting progress.
///
/// Same as [`synchronize`], but calls `progress` with the name of each
/// resource right before it is processed.
#[instrument(
    skip_all,
    fields(source = ?source_root.as_ref(), dest = ?dest_root.as_ref()),
    level = "debug"
)]
pub fn synchronize_with_progress(
    resources: &ResourceSpec,
    source_root: impl AsRef<Path>,
    dest_root: impl AsRef<Path>,
    force_copy: bool,
    mut progress: impl FnMut(&str),
) -> Vec<SyncOutcome> {
    let linking = if force_copy {
        SyncMode::Copy
    } else {
        SyncMode::Symlink
    };

    let symlinks = resources.symlink.iter().map(|resource| (resource, linking));
    let copies = resources.copy.iter().map(|resource| (resource, SyncMode::Copy));

    symlinks
        .chain(copies)
        .map(|(resource, mode)| {
            progress(resource.as_str());
            sync_resource(resource.as_str(), source_root.as_ref(), dest_root.as_ref(), mode)
        })
        .collect()
}

fn sync_resource(
    resource: &str,
    source_root: &Path,
    dest_root: &Path,
    mode: SyncMode,
) -> SyncOutcome {
    let source = source_root.join(resource);
    let dest = dest_root.join(resource);

    match symlink_metadata(&source) {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!("skip {resource:?}: not found in {:?}", source_root.display());
            return SyncOutcome::failed(
                resource,
                SyncMode::Skip,
                SyncError::SourceMissing {
                    resource: resource.into(),
                },
            );
        }
        Err(err) => {
            return SyncOutcome::failed(
                resource,
                SyncMode::Error,
                SyncError::StatSource {
                    source: err,
                    path: source,
                },
            );
        }
    }

    // INVARIANT: Never write over anything already at the destination.
    if symlink_metadata(&dest).is_ok() {
        debug!("{resource:?} already present at {:?}", dest.display());
        return SyncOutcome::done(resource, SyncMode::Exists);
    }

    if let Some(parent) = dest.parent() {
        if let Err(err) = create_dir_all(parent) {
            return SyncOutcome::failed(
                resource,
                SyncMode::Error,
                SyncError::CreateParent {
                    source: err,
                    path: parent.into(),
                },
            );
        }
    }

    let result = match mode {
        SyncMode::Symlink => link::link_absolute(&source, &dest),
        _ => copy::copy_resource(&source, &dest),
    };

    match result {
        Ok(()) => {
            debug!("{mode} {resource:?} done");
            SyncOutcome::done(resource, mode)
        }
        Err(err) => SyncOutcome::failed(resource, mode, err),
    }
}

/// Check whether every declared resource is present at destination.
///
/// Only presence is checked. A stale or unrelated entry at a resource path
/// still counts as synced.
pub fn check_sync_status(resources: &ResourceSpec, dest_root: impl AsRef<Path>) -> bool {
    resources
        .iter()
        .all(|resource| is_present(&dest_root.as_ref().join(resource)))
}

/// List declared resources absent from destination, in declaration order.
pub fn missing_resources<'a>(
    resources: &'a ResourceSpec,
    dest_root: impl AsRef<Path>,
) -> Vec<&'a str> {
    resources
        .iter()
        .filter(|resource| !is_present(&dest_root.as_ref().join(resource)))
        .collect()
}

fn is_present(path: &Path) -> bool {
    !matches!(symlink_metadata(path), Err(err) if err.kind() == ErrorKind::NotFound)
}

/// Per-resource failure causes.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Resource is not in the source tree.
    #[error("source does not exist: {resource}")]
    SourceMissing { resource: String },

    /// Resource in the source tree cannot be inspected.
    #[error("failed to stat source {:?}", path.display())]
    StatSource {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Parent directories of destination cannot be created.
    #[error("failed to create parent directory {:?}", path.display())]
    CreateParent {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Absolute form of source path cannot be determined.
    #[error("failed to get absolute path of {:?}", path.display())]
    AbsolutePath {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Symbolic link cannot be created.
    #[error("failed to create symlink {:?} -> {:?}", link.display(), target.display())]
    Symlink {
        #[source]
        source: std::io::Error,
        link: PathBuf,
        target: PathBuf,
    },

    /// Symbolic link target cannot be read.
    #[error("failed to read symlink {:?}", path.display())]
    ReadLink {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// File contents cannot be copied.
    #[error("failed to copy {:?} to {:?}", from.display(), to.display())]
    CopyFile {
        #[source]
        source: std::io::Error,
        from: PathBuf,
        to: PathBuf,
    },

    /// Directory cannot be created while copying.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Permission bits cannot be applied to copied entry.
    #[error("failed to set permissions on {:?}", path.display())]
    SetPermissions {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Source directory cannot be walked.
    #[error(transparent)]
    Walk(#[from] ignore::Error),
}

/// Friendly result alias :3
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
