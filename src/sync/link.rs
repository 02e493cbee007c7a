// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Symbolic link creation.

use crate::sync::{Result, SyncError};

use std::path::{absolute, Path};
use tracing::debug;

/// Link `dest` to the absolute form of `source`.
///
/// The link keeps working if the destination tree moves, but breaks if the
/// source tree moves.
///
/// # Errors
///
/// - Return [`SyncError::AbsolutePath`] if `source` cannot be made absolute.
/// - Return [`SyncError::Symlink`] if the link cannot be created.
pub fn link_absolute(source: &Path, dest: &Path) -> Result<()> {
    let target = absolute(source).map_err(|err| SyncError::AbsolutePath {
        source: err,
        path: source.into(),
    })?;

    create_symlink(&target, dest)
}

/// Create symbolic link at `link` pointing to `target` verbatim.
///
/// # Errors
///
/// - Return [`SyncError::Symlink`] if the link cannot be created.
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    debug!("link {:?} -> {:?}", link.display(), target.display());
    platform_symlink(target, link).map_err(|err| SyncError::Symlink {
        source: err,
        link: link.into(),
        target: target.into(),
    })
}

#[cfg(unix)]
fn platform_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

// Windows needs to know up front whether the link points at a directory.
#[cfg(windows)]
fn platform_symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    let resolved = match link.parent() {
        Some(parent) => parent.join(target),
        None => target.to_path_buf(),
    };

    if resolved.is_dir() {
        symlink_dir(target, link)
    } else {
        symlink_file(target, link)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;
    use std::{env::current_dir, fs};

    #[sealed_test]
    fn relative_source_becomes_absolute_target() -> anyhow::Result<()> {
        fs::create_dir_all("main/node_modules")?;
        fs::create_dir_all("feature")?;

        link_absolute(
            Path::new("main/node_modules"),
            Path::new("feature/node_modules"),
        )?;

        let target = fs::read_link("feature/node_modules")?;
        assert_eq!(target, current_dir()?.join("main/node_modules"));
        assert!(Path::new("feature/node_modules").is_dir());

        Ok(())
    }

    #[sealed_test]
    fn occupied_link_path_is_an_error() -> anyhow::Result<()> {
        fs::write("occupied", "x")?;

        let result = create_symlink(Path::new("/somewhere"), Path::new("occupied"));
        assert!(matches!(result, Err(SyncError::Symlink { .. })));

        Ok(())
    }
}
