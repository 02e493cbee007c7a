// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{RepoFixture, RepoKind};

use anyhow::Result;
use gws::{
    config::{resolve_definition, DefinitionOrigin, DEFINITION_FILE_NAME},
    sync::{check_sync_status, missing_resources, synchronize, SyncMode},
    worktree::{Git2Worktrees, WorktreeAccess, WorktreeError},
};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    env::current_dir,
    fs::{self, canonicalize},
    path::PathBuf,
};

fn main_repo() -> Result<(RepoFixture, PathBuf)> {
    let root = current_dir()?;
    let fixture = RepoFixture::new(root.join("project"), RepoKind::Normal)?;
    fixture.stage_and_commit("README.md", "# project\n")?;
    Ok((fixture, root))
}

#[sealed_test]
fn list_fresh_repository() -> Result<()> {
    let (fixture, _) = main_repo()?;
    let worktrees = Git2Worktrees::discover(fixture.workdir())?;

    let listing = worktrees.list_worktrees()?;
    assert_eq!(listing.len(), 1);
    assert!(listing[0].is_main);
    assert_eq!(listing[0].branch.as_deref(), Some("main"));
    assert_eq!(canonicalize(&listing[0].path)?, canonicalize(fixture.workdir())?);

    Ok(())
}

#[sealed_test]
fn create_and_list_linked_worktree() -> Result<()> {
    let (fixture, root) = main_repo()?;
    let worktrees = Git2Worktrees::discover(fixture.workdir())?;
    let feature = root.join("feature");

    assert!(!worktrees.branch_exists("feature"));
    worktrees.create_worktree("feature", &feature, None)?;
    assert!(worktrees.branch_exists("feature"));
    assert_eq!(fs::read_to_string(feature.join("README.md"))?, "# project\n");

    let listing = worktrees.list_worktrees()?;
    assert_eq!(listing.len(), 2);
    assert!(listing[0].is_main);
    assert!(!listing[1].is_main);
    assert_eq!(listing[1].branch.as_deref(), Some("feature"));
    assert_eq!(canonicalize(&listing[1].path)?, canonicalize(&feature)?);

    Ok(())
}

#[sealed_test]
fn create_worktree_from_base_branch() -> Result<()> {
    let (fixture, root) = main_repo()?;
    let worktrees = Git2Worktrees::discover(fixture.workdir())?;
    worktrees.create_worktree("release", &root.join("release"), None)?;
    fixture.stage_and_commit("CHANGELOG.md", "unreleased\n")?;

    worktrees.create_worktree("hotfix", &root.join("hotfix"), Some("release"))?;
    assert!(root.join("hotfix/README.md").is_file());
    assert!(!root.join("hotfix/CHANGELOG.md").exists());

    Ok(())
}

#[sealed_test]
fn create_worktree_refuses_taken_path_or_branch() -> Result<()> {
    let (fixture, root) = main_repo()?;
    let worktrees = Git2Worktrees::discover(fixture.workdir())?;
    fs::create_dir_all(root.join("taken"))?;

    let result = worktrees.create_worktree("feature", &root.join("taken"), None);
    assert!(matches!(result, Err(WorktreeError::PathExists { .. })));

    let result = worktrees.create_worktree("main", &root.join("other"), None);
    assert!(matches!(result, Err(WorktreeError::BranchExists { .. })));

    Ok(())
}

#[sealed_test]
fn create_worktree_for_nested_branch_path() -> Result<()> {
    let (fixture, root) = main_repo()?;
    let worktrees = Git2Worktrees::discover(fixture.workdir())?;
    let login = root.join("feature/login");

    worktrees.create_worktree("feature/login", &login, None)?;
    assert_eq!(fs::read_to_string(login.join("README.md"))?, "# project\n");

    let listing = worktrees.list_worktrees()?;
    assert_eq!(listing.len(), 2);
    assert_eq!(listing[1].branch.as_deref(), Some("feature/login"));
    assert_eq!(canonicalize(&listing[1].path)?, canonicalize(&login)?);

    Ok(())
}

#[sealed_test]
fn create_worktree_with_same_directory_name_twice() -> Result<()> {
    let (fixture, root) = main_repo()?;
    let worktrees = Git2Worktrees::discover(fixture.workdir())?;

    worktrees.create_worktree("a/login", &root.join("a/login"), None)?;
    worktrees.create_worktree("b/login", &root.join("b/login"), None)?;

    let listing = worktrees
        .list_worktrees()?
        .into_iter()
        .filter(|worktree| !worktree.is_main)
        .map(|worktree| -> Result<_> { Ok((worktree.branch, canonicalize(worktree.path)?)) })
        .collect::<Result<Vec<_>>>()?;
    assert_eq!(listing.len(), 2);
    assert!(listing.contains(&(Some("a/login".into()), canonicalize(root.join("a/login"))?)));
    assert!(listing.contains(&(Some("b/login".into()), canonicalize(root.join("b/login"))?)));

    Ok(())
}

#[sealed_test]
fn failed_worktree_does_not_leave_branch_behind() -> Result<()> {
    let (fixture, root) = main_repo()?;
    let worktrees = Git2Worktrees::discover(fixture.workdir())?;

    // Administrative directory for linked worktrees cannot be created.
    fs::write(fixture.workdir().join(".git/worktrees"), "")?;

    let result = worktrees.create_worktree("feature", &root.join("feature"), None);
    assert!(matches!(result, Err(WorktreeError::Git2(_))));
    assert!(!worktrees.branch_exists("feature"));

    Ok(())
}

#[sealed_test]
fn create_worktree_refuses_unusable_parent() -> Result<()> {
    let (fixture, root) = main_repo()?;
    let worktrees = Git2Worktrees::discover(fixture.workdir())?;
    fs::write(root.join("feature"), "not a directory")?;

    let result = worktrees.create_worktree("feature/login", &root.join("feature/login"), None);
    assert!(matches!(result, Err(WorktreeError::CreateParent { .. })));
    assert!(!worktrees.branch_exists("feature/login"));

    Ok(())
}

#[sealed_test]
fn main_worktree_found_from_linked_worktree() -> Result<()> {
    let (fixture, root) = main_repo()?;
    let feature = root.join("feature");
    Git2Worktrees::discover(fixture.workdir())?.create_worktree("feature", &feature, None)?;

    let from_linked = Git2Worktrees::discover(&feature)?;
    assert_eq!(
        canonicalize(from_linked.main_worktree()?)?,
        canonicalize(fixture.workdir())?
    );
    let current = from_linked.current_worktree().map(canonicalize).transpose()?;
    assert_eq!(current, Some(canonicalize(&feature)?));

    Ok(())
}

#[sealed_test]
fn discover_rejects_plain_and_bare_directories() -> Result<()> {
    let root = current_dir()?;
    fs::create_dir_all(root.join("plain"))?;
    RepoFixture::new(root.join("bare.git"), RepoKind::Bare)?;

    let result = Git2Worktrees::discover(root.join("plain"));
    assert!(matches!(result, Err(WorktreeError::NotARepository { .. })));

    let result = Git2Worktrees::discover(root.join("bare.git"));
    assert!(matches!(result, Err(WorktreeError::BareRepository { .. })));

    Ok(())
}

#[sealed_test]
fn synchronize_new_worktree_from_main() -> Result<()> {
    let (fixture, root) = main_repo()?;
    fixture.stage_and_commit(
        DEFINITION_FILE_NAME,
        "[resources]\nsymlink = [\"node_modules\"]\ncopy = [\".env\", \".env.local\"]\n",
    )?;
    fixture.write_untracked("node_modules/left-pad/index.js", "module.exports = 1;")?;
    fixture.write_untracked(".env", "SECRET=1\n")?;

    let worktrees = Git2Worktrees::discover(fixture.workdir())?;
    let main = worktrees.main_worktree()?;
    let feature = root.join("feature");
    worktrees.create_worktree("feature", &feature, None)?;

    let (definition, origin) = resolve_definition(&main, None)?;
    assert!(matches!(origin, DefinitionOrigin::Repository(_)));
    assert!(!check_sync_status(&definition.resources, &feature));

    let outcomes = synchronize(&definition.resources, &main, &feature, false);
    let summary = outcomes
        .iter()
        .map(|outcome| (outcome.resource(), outcome.mode(), outcome.success()))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("node_modules", SyncMode::Symlink, true),
            (".env", SyncMode::Copy, true),
            (".env.local", SyncMode::Skip, false),
        ]
    );

    assert_eq!(
        fs::read_to_string(feature.join("node_modules/left-pad/index.js"))?,
        "module.exports = 1;"
    );
    assert_eq!(fs::read_to_string(feature.join(".env"))?, "SECRET=1\n");
    assert!(!check_sync_status(&definition.resources, &feature));
    assert_eq!(
        missing_resources(&definition.resources, &feature),
        vec![".env.local"]
    );

    fixture.write_untracked(".env.local", "LOCAL=1\n")?;
    let outcomes = synchronize(&definition.resources, &main, &feature, false);
    let modes = outcomes.iter().map(|outcome| outcome.mode()).collect::<Vec<_>>();
    assert_eq!(modes, vec![SyncMode::Exists, SyncMode::Exists, SyncMode::Copy]);
    assert!(check_sync_status(&definition.resources, &feature));

    Ok(())
}
