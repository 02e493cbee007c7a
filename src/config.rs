// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the sync definition file that tells gws which
//! resources of the main worktree should be shared with other worktrees, and
//! how to locate the definition that applies to a given repository.
//!
//! # Definition Resolution
//!
//! A repository may carry its own definition at the top-level of its main
//! worktree named ".gwt.toml". If it does not, the user's global definition
//! is consulted instead. If neither exists, a built-in default is used that
//! links "node_modules" and copies ".env".

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument};

/// Name of the per-repository sync definition file.
pub const DEFINITION_FILE_NAME: &str = ".gwt.toml";

/// Placeholder substituted with the branch name in worktree paths.
pub const BRANCH_PLACEHOLDER: &str = "{branch}";

/// Sync definition layout.
///
/// A __sync definition__ lists the resources that should be shared between
/// the main worktree and every other worktree, and where new worktrees should
/// be placed.
///
/// # General Layout
///
/// ```toml
/// worktree_path = "../{branch}"
///
/// [resources]
/// symlink = ["node_modules"]
/// copy = [".env"]
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncDefinition {
    /// Path template for new worktrees.
    pub worktree_path: String,

    /// Resources to synchronize.
    pub resources: ResourceSpec,
}

impl SyncDefinition {
    /// Substitute branch name into worktree path template.
    pub fn resolve_worktree_path(&self, branch: impl AsRef<str>) -> PathBuf {
        PathBuf::from(
            self.worktree_path
                .replace(BRANCH_PLACEHOLDER, branch.as_ref()),
        )
    }
}

impl Default for SyncDefinition {
    fn default() -> Self {
        Self {
            worktree_path: format!("../{BRANCH_PLACEHOLDER}"),
            resources: ResourceSpec::default(),
        }
    }
}

impl FromStr for SyncDefinition {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut definition: SyncDefinition =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on worktree path template.
        definition.worktree_path = shellexpand::full(definition.worktree_path.as_str())
            .map_err(ConfigError::ShellExpansion)?
            .into_owned();

        Ok(definition)
    }
}

impl Display for SyncDefinition {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Resources to share between worktrees.
///
/// Each entry is a path relative to the root of both the main worktree and
/// the receiving worktree. Order is preserved.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResourceSpec {
    /// Resources to link into the receiving worktree.
    pub symlink: Vec<String>,

    /// Resources to duplicate into the receiving worktree.
    pub copy: Vec<String>,
}

impl ResourceSpec {
    /// Iterate over every declared resource, symlinks first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symlink.iter().chain(self.copy.iter()).map(String::as_str)
    }

    /// Total number of declared resources.
    pub fn len(&self) -> usize {
        self.symlink.len() + self.copy.len()
    }

    /// No resources declared at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Built-in sync definition used when no definition file can be found.
pub fn default_definition() -> SyncDefinition {
    SyncDefinition {
        resources: ResourceSpec {
            symlink: vec!["node_modules".into()],
            copy: vec![".env".into()],
        },
        ..Default::default()
    }
}

/// Where a resolved sync definition came from.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum DefinitionOrigin {
    /// Definition file of the repository itself.
    Repository(PathBuf),

    /// User's global definition file.
    Global(PathBuf),

    /// Built-in default.
    BuiltIn,
}

impl Display for DefinitionOrigin {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Repository(path) | Self::Global(path) => {
                write!(fmt, "{}", path.display())
            }
            Self::BuiltIn => fmt.write_str("built-in default"),
        }
    }
}

/// Path to definition file inside target directory.
pub fn definition_path(dir: impl AsRef<Path>) -> PathBuf {
    dir.as_ref().join(DEFINITION_FILE_NAME)
}

/// Read and parse sync definition file at target path.
///
/// # Errors
///
/// - Return [`ConfigError::Read`] if file cannot be read.
/// - Return [`ConfigError::Deserialize`] if file contents are invalid.
pub fn read_definition(path: impl AsRef<Path>) -> Result<SyncDefinition> {
    let path = path.as_ref();
    let data = read_to_string(path).map_err(|err| ConfigError::Read {
        source: err,
        path: path.into(),
    })?;

    data.parse()
}

/// Serialize and write sync definition to target path.
///
/// # Errors
///
/// - Return [`ConfigError::Write`] if file cannot be written.
pub fn write_definition(path: impl AsRef<Path>, definition: &SyncDefinition) -> Result<()> {
    let path = path.as_ref();
    let data = toml::ser::to_string_pretty(definition).map_err(ConfigError::Serialize)?;
    write(path, data.as_bytes()).map_err(|err| ConfigError::Write {
        source: err,
        path: path.into(),
    })
}

/// Resolve the sync definition that applies to a main worktree.
///
/// Tries the definition file at the top-level of the main worktree first,
/// then the global definition file if one was given, and falls back to the
/// built-in default. A definition file that exists but fails to parse is an
/// error rather than a reason to fall back.
///
/// # Errors
///
/// - Return [`ConfigError`] if an existing definition file cannot be read or
///   parsed.
#[instrument(skip(main_worktree, global), level = "debug")]
pub fn resolve_definition(
    main_worktree: impl AsRef<Path>,
    global: Option<&Path>,
) -> Result<(SyncDefinition, DefinitionOrigin)> {
    let local = definition_path(main_worktree);
    if local.is_file() {
        debug!("use repository definition {:?}", local.display());
        return Ok((read_definition(&local)?, DefinitionOrigin::Repository(local)));
    }

    if let Some(global) = global.filter(|path| path.is_file()) {
        debug!("use global definition {:?}", global.display());
        return Ok((
            read_definition(global)?,
            DefinitionOrigin::Global(global.into()),
        ));
    }

    debug!("no definition file found, use built-in default");
    Ok((default_definition(), DefinitionOrigin::BuiltIn))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read definition file.
    #[error("failed to read sync definition at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to write definition file.
    #[error("failed to write sync definition at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
