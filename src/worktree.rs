// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Worktree management.
//!
//! Git lets one repository have several working trees checked out at once.
//! The first one, created along with the repository itself, is the __main
//! worktree__. Every other one is a __linked worktree__ whose gitdir lives
//! under the main worktree's gitdir at `$GIT_COMMON_DIR/worktrees/<name>`.
//!
//! gws only needs a narrow slice of this: find the main worktree, list all
//! worktrees, and add a new linked worktree on a fresh branch. The
//! synchronizer never talks to Git itself. It only receives the roots that
//! this module discovers.

use git2::{BranchType, Repository, WorktreeAddOptions};
use std::{
    fs::create_dir_all,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Working tree of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    /// Root directory of the working tree.
    pub path: PathBuf,

    /// Branch checked out, if HEAD is not detached.
    pub branch: Option<String>,

    /// Working tree is the main worktree.
    pub is_main: bool,
}

/// Layer of indirection for worktree management.
pub trait WorktreeAccess {
    /// Root of the main worktree.
    fn main_worktree(&self) -> Result<PathBuf>;

    /// List every worktree, main worktree first.
    fn list_worktrees(&self) -> Result<Vec<Worktree>>;

    /// Check if a local branch exists.
    fn branch_exists(&self, branch: &str) -> bool;

    /// Create new branch from `base` (or HEAD), and check it out into a new
    /// linked worktree at `path`.
    fn create_worktree(&self, branch: &str, path: &Path, base: Option<&str>) -> Result<()>;
}

/// Worktree management through libgit2.
pub struct Git2Worktrees {
    repository: Repository,
}

impl Git2Worktrees {
    /// Open repository containing target path.
    ///
    /// Searches upwards from `path`, so any directory inside the main
    /// worktree or a linked worktree will do.
    ///
    /// # Errors
    ///
    /// - Return [`WorktreeError::NotARepository`] if no repository contains
    ///   target path.
    /// - Return [`WorktreeError::BareRepository`] if the repository has no
    ///   main worktree.
    #[instrument(skip(path), level = "debug")]
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("discover repository from {:?}", path.display());
        let repository =
            Repository::discover(path).map_err(|err| WorktreeError::NotARepository {
                source: err,
                path: path.into(),
            })?;

        if repository.is_bare() {
            return Err(WorktreeError::BareRepository {
                path: repository.path().into(),
            });
        }

        Ok(Self { repository })
    }

    /// Root of the worktree the repository was discovered from.
    pub fn current_worktree(&self) -> Option<&Path> {
        self.repository.workdir()
    }

    fn head_branch(repository: &Repository) -> Option<String> {
        let head = repository.head().ok()?;
        if !head.is_branch() {
            return None;
        }

        head.shorthand().map(ToString::to_string)
    }

    /// Name new linked worktree after its directory.
    ///
    /// Worktree names cannot contain path separators, so only the final
    /// component of `path` is used. A numeric suffix is appended when a
    /// worktree with that name already exists, e.g., `login`, `login1`,
    /// `login2`, like git-worktree(1) does.
    fn unique_worktree_name(&self, path: &Path) -> Result<String> {
        let base = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| WorktreeError::InvalidPath { path: path.into() })?;

        let admin = self.repository.commondir().join("worktrees");
        let mut name = base.clone();
        let mut suffix = 1;
        while admin.join(&name).symlink_metadata().is_ok() {
            name = format!("{base}{suffix}");
            suffix += 1;
        }

        Ok(name)
    }
}

impl WorktreeAccess for Git2Worktrees {
    fn main_worktree(&self) -> Result<PathBuf> {
        // INVARIANT: Common dir of a non-bare repository is the main
        //   worktree's gitdir, which sits at the top of the main worktree.
        let common = self.repository.commondir();
        common
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| WorktreeError::BareRepository {
                path: common.into(),
            })
    }

    fn list_worktrees(&self) -> Result<Vec<Worktree>> {
        let main_path = self.main_worktree()?;
        let main = Repository::open(&main_path)?;
        let mut worktrees = vec![Worktree {
            branch: Self::head_branch(&main),
            path: main_path,
            is_main: true,
        }];

        for name in main.worktrees()?.iter().flatten() {
            let worktree = main.find_worktree(name)?;
            let branch = Repository::open_from_worktree(&worktree)
                .ok()
                .and_then(|repository| Self::head_branch(&repository));

            worktrees.push(Worktree {
                path: worktree.path().to_path_buf(),
                branch,
                is_main: false,
            });
        }

        Ok(worktrees)
    }

    fn branch_exists(&self, branch: &str) -> bool {
        self.repository
            .find_branch(branch, BranchType::Local)
            .is_ok()
    }

    #[instrument(skip(self), level = "debug")]
    fn create_worktree(&self, branch: &str, path: &Path, base: Option<&str>) -> Result<()> {
        if path.symlink_metadata().is_ok() {
            return Err(WorktreeError::PathExists { path: path.into() });
        }

        if self.branch_exists(branch) {
            return Err(WorktreeError::BranchExists {
                branch: branch.into(),
            });
        }

        let commit = match base {
            Some(base) => self.repository.revparse_single(base)?.peel_to_commit()?,
            None => self.repository.head()?.peel_to_commit()?,
        };

        let name = self.unique_worktree_name(path)?;

        // INVARIANT: libgit2 only creates the final component of `path`.
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            create_dir_all(parent).map_err(|err| WorktreeError::CreateParent {
                source: err,
                path: parent.into(),
            })?;
        }

        info!("create branch {branch:?} at {}", commit.id());
        let mut new_branch = self.repository.branch(branch, &commit, false)?;

        let mut opts = WorktreeAddOptions::new();
        opts.reference(Some(new_branch.get()));

        info!("create worktree {name:?} at {:?}", path.display());
        let added = self.repository.worktree(&name, path, Some(&opts));
        drop(opts);

        if let Err(err) = added {
            debug!("remove branch {branch:?} left behind by failed worktree");
            if let Err(cleanup) = new_branch.delete() {
                warn!("failed to remove branch {branch:?}: {cleanup}");
            }
            return Err(err.into());
        }

        Ok(())
    }
}

/// Worktree management error types.
#[derive(Debug, thiserror::Error)]
pub enum WorktreeError {
    /// No repository contains target path.
    #[error("not a git repository: {:?}", path.display())]
    NotARepository {
        #[source]
        source: git2::Error,
        path: PathBuf,
    },

    /// Repository has no working tree.
    #[error("bare repository has no main worktree: {:?}", path.display())]
    BareRepository { path: PathBuf },

    /// Target path for new worktree is taken.
    #[error("path already exists: {:?}", path.display())]
    PathExists { path: PathBuf },

    /// Branch for new worktree is taken.
    #[error("branch {branch:?} already exists")]
    BranchExists { branch: String },

    /// Parent directories of new worktree cannot be created.
    #[error("failed to create parent directory {:?}", path.display())]
    CreateParent {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Target path for new worktree has no final component.
    #[error("invalid worktree path: {:?}", path.display())]
    InvalidPath { path: PathBuf },

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = WorktreeError> = std::result::Result<T, E>;
