// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine process-global path information, e.g., where the user keeps
//! their global sync definition. The library itself always receives explicit
//! roots, so only the command-line layer should need these.

use std::path::{Component, Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to global sync definition file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/gws/config.toml`. Does not
/// check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn global_definition_path() -> Result<PathBuf> {
    let config_dir = match dirs::config_dir() {
        Some(path) => path,
        None => home_dir()?.join(".config"),
    };

    Ok(config_dir.join("gws").join("config.toml"))
}

/// Resolve relative `path` against directory `base`.
///
/// Absolute paths are returned as is. Otherwise "." and ".." components are
/// normalized lexically, without touching the filesystem, so "../feature"
/// resolved against the main worktree lands beside it even though
/// "feature" does not exist yet.
pub fn resolve_against(base: impl AsRef<Path>, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let mut resolved = PathBuf::new();
    for component in base.as_ref().join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }

    resolved
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
