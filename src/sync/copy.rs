// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Resource duplication.
//!
//! Copies preserve permission bits of every entry. Symbolic links inside a
//! copied directory are reproduced as links with the same target instead of
//! being dereferenced, so relative links inside dependency trees keep
//! pointing at their siblings.
//!
//! Copying stops at the first failing entry. Whatever was written before the
//! failure is left in place.

use crate::sync::{link::create_symlink, Result, SyncError};

use ignore::WalkBuilder;
use std::{
    fs::{
        canonicalize, create_dir, metadata, read_link, set_permissions, symlink_metadata, File,
        Permissions,
    },
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Copy file or directory at `source` to `dest`.
///
/// A `source` that is itself a symbolic link is followed, so the contents of
/// its target get duplicated. Only links nested inside a copied directory
/// are reproduced as links.
///
/// # Errors
///
/// - Return [`SyncError::StatSource`] if `source` or its link target cannot
///   be inspected, e.g., a dangling link.
/// - Return [`SyncError`] describing the first entry that failed to copy.
pub fn copy_resource(source: &Path, dest: &Path) -> Result<()> {
    let stat_error = |err| SyncError::StatSource {
        source: err,
        path: source.into(),
    };

    if !metadata(source).map_err(stat_error)?.is_dir() {
        return copy_file(source, dest);
    }

    // INVARIANT: Walk the real directory, not a link to it.
    if symlink_metadata(source).map_err(stat_error)?.file_type().is_symlink() {
        let resolved = canonicalize(source).map_err(stat_error)?;
        debug!("follow {:?} to {:?}", source.display(), resolved.display());
        return copy_dir(&resolved, dest);
    }

    copy_dir(source, dest)
}

/// Copy directory tree at `source` to `dest`.
///
/// Every entry is visited, hidden ones and ones that ignore files would
/// exclude included. Directory permissions are applied once their contents
/// have been written, deepest first, so read-only directories copy cleanly.
///
/// # Errors
///
/// - Return [`SyncError::Walk`] if the source tree cannot be walked.
/// - Return [`SyncError::CreateDir`] if a directory cannot be created.
/// - Return [`SyncError`] variants of [`copy_file`] and [`copy_symlink`].
#[instrument(skip(source, dest), level = "debug")]
pub fn copy_dir(source: &Path, dest: &Path) -> Result<()> {
    let walker = WalkBuilder::new(source)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();

    let mut directories: Vec<(PathBuf, Permissions)> = Vec::new();
    for entry in walker {
        let entry = entry?;

        // INVARIANT: Walker only yields paths below its root.
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(relative);

        let metadata = symlink_metadata(entry.path()).map_err(|err| SyncError::StatSource {
            source: err,
            path: entry.path().into(),
        })?;
        let file_type = metadata.file_type();

        if file_type.is_dir() {
            debug!("create directory {:?}", target.display());
            create_dir(&target).map_err(|err| SyncError::CreateDir {
                source: err,
                path: target.clone(),
            })?;
            directories.push((target, metadata.permissions()));
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }

    for (path, permissions) in directories.into_iter().rev() {
        set_permissions(&path, permissions)
            .map_err(|err| SyncError::SetPermissions { source: err, path })?;
    }

    Ok(())
}

/// Copy file contents byte-for-byte, then match permission bits.
///
/// # Errors
///
/// - Return [`SyncError::CopyFile`] if contents cannot be copied.
/// - Return [`SyncError::SetPermissions`] if permissions cannot be applied.
pub fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let copy_error = |err| SyncError::CopyFile {
        source: err,
        from: source.into(),
        to: dest.into(),
    };

    let mut reader = File::open(source).map_err(copy_error)?;
    let mut writer = File::create(dest).map_err(copy_error)?;
    io::copy(&mut reader, &mut writer).map_err(copy_error)?;
    let permissions = reader.metadata().map_err(copy_error)?.permissions();

    set_permissions(dest, permissions).map_err(|err| SyncError::SetPermissions {
        source: err,
        path: dest.into(),
    })
}

/// Reproduce symbolic link at `source` as a link at `dest` with same target.
///
/// # Errors
///
/// - Return [`SyncError::ReadLink`] if link target cannot be read.
/// - Return [`SyncError::Symlink`] if new link cannot be created.
pub fn copy_symlink(source: &Path, dest: &Path) -> Result<()> {
    let target = read_link(source).map_err(|err| SyncError::ReadLink {
        source: err,
        path: source.into(),
    })?;

    create_symlink(&target, dest)
}
