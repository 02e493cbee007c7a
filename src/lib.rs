// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Share non-versioned resources between Git worktrees.
//!
//! Installed dependencies, environment files, and build artifacts are not
//! tracked by Git, so every new worktree starts without them. gws links or
//! copies them over from the main worktree, as listed by a sync definition.
//!
//! - [`sync`] decides per resource whether to link, copy, or leave it alone.
//! - [`config`] describes which resources to share.
//! - [`worktree`] finds and creates worktrees.
//! - [`report`] renders sync outcomes for the user.
//! - [`path`] locates process-global files and resolves worktree paths.

pub mod config;
pub mod path;
pub mod report;
pub mod sync;
pub mod worktree;
