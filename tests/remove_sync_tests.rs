//! Remove, sync and first-run integration tests

mod common;

use common::{MINILAY, TestPrefix, minimerge_cmd};
use predicates::prelude::*;
use std::path::Path;

#[test]
fn test_remove_deletes_install_paths() {
    let prefix = TestPrefix::new();
    let source = prefix.source_tree("src", &[("README", "")]);
    prefix.script_minibuild("zlib", "", &source, "true");
    prefix.script_minibuild("libxml2", "zlib", &source, "true");
    prefix.cmd().arg("libxml2").assert().success();

    prefix
        .cmd()
        .args(["--rm", "libxml2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 1 package(s)"));

    assert!(!prefix.file_exists("dependencies/libxml2"));
    // dependencies are never removed along
    assert!(prefix.file_exists("dependencies/zlib"));
}

#[test]
fn test_remove_missing_install_is_not_an_error() {
    let prefix = TestPrefix::new();
    let source = prefix.source_tree("src", &[("README", "")]);
    prefix.script_minibuild("zlib", "", &source, "true");

    prefix
        .cmd()
        .args(["--remove", "zlib"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 package(s)"));
}

#[test]
fn test_remove_unknown_package_changes_nothing() {
    let prefix = TestPrefix::new();
    let source = prefix.source_tree("src", &[("README", "")]);
    prefix.script_minibuild("zlib", "", &source, "true");
    prefix.cmd().arg("zlib").assert().success();

    prefix
        .cmd()
        .args(["--rm", "zlib", "ghost"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("'ghost' not found"));

    assert!(prefix.file_exists("dependencies/zlib"));
}

#[test]
fn test_first_run_bootstraps_the_prefix() {
    let prefix = TestPrefix::bare();

    prefix
        .cmd()
        .arg("--sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("first time"))
        .stdout(predicate::str::contains("Minilays synced, 0 minibuild(s)"));

    assert!(prefix.file_exists("etc/minimerge.yaml"));
    for dir in ["minilays", "logs", "eggs/cache", "dependencies", "downloads"] {
        assert!(prefix.file_exists(dir), "{dir} should exist");
    }

    // the generated configuration is picked up on the next run
    prefix
        .cmd()
        .arg("--sync")
        .assert()
        .success()
        .stdout(predicate::str::contains("first time").not());
}

#[test]
fn test_user_config_in_home_is_used() {
    let prefix = TestPrefix::new();
    std::fs::write(prefix.home.join(".minimerge.yaml"), "default_action: sync\n")
        .expect("write user config");

    // no packages needed: the configured default action is sync
    prefix
        .cmd()
        .assert()
        .success()
        .stdout(predicate::str::contains("Minilays synced"));
}

#[test]
fn test_prefix_from_environment_beats_configured_prefix() {
    let prefix = TestPrefix::new();
    let elsewhere = prefix.temp.path().join("elsewhere");
    prefix.write_file(
        "etc/minimerge.yaml",
        &format!("default_action: install\nprefix: {}\n", elsewhere.display()),
    );
    let source = prefix.source_tree("src", &[("README", "")]);
    prefix.script_minibuild("zlib", "", &source, "touch built");

    minimerge_cmd()
        .env("HOME", &prefix.home)
        .env("MINIMERGE_PREFIX", &prefix.path)
        .env_remove("MINIMERGE_CONFIG")
        .env_remove("MINILAYS")
        .env_remove("RUST_LOG")
        .arg("zlib")
        .assert()
        .success();

    assert!(prefix.file_exists("dependencies/zlib/built"));
    assert!(!elsewhere.exists());
}

#[test]
fn test_extra_minilays_from_environment() {
    let prefix = TestPrefix::new();
    let extra = prefix.temp.path().join("extra-minilay");
    std::fs::create_dir_all(&extra).expect("mkdir");
    std::fs::write(extra.join("zope"), "[minibuild]\ncategory=meta\n").expect("write");

    prefix
        .cmd()
        .env("MINILAYS", &extra)
        .arg("zope")
        .assert()
        .success();
}

fn commit_all(repo: &git2::Repository, message: &str) {
    let mut index = repo.index().expect("index");
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .expect("add");
    index.write().expect("write index");
    let tree = repo
        .find_tree(index.write_tree().expect("write tree"))
        .expect("tree");
    let signature = git2::Signature::now("Test", "test@example.org").expect("signature");
    let parents: Vec<git2::Commit<'_>> = repo
        .head()
        .ok()
        .and_then(|head| head.peel_to_commit().ok())
        .into_iter()
        .collect();
    let parents: Vec<&git2::Commit<'_>> = parents.iter().collect();
    repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
        .expect("commit");
}

fn write_descriptor(dir: &Path, name: &str) {
    std::fs::write(dir.join(name), "[minibuild]\ncategory=meta\n").expect("write descriptor");
}

#[test]
fn test_sync_pulls_git_minilays() {
    let prefix = TestPrefix::new();
    let upstream_path = prefix.temp.path().join("upstream");
    std::fs::create_dir_all(&upstream_path).expect("mkdir");
    let upstream = git2::Repository::init(&upstream_path).expect("init upstream");
    write_descriptor(&upstream_path, "zlib");
    commit_all(&upstream, "initial");

    let minilay = prefix.path.join("minilays/community");
    git2::Repository::clone(&upstream_path.display().to_string(), &minilay).expect("clone");

    write_descriptor(&upstream_path, "bzip2");
    commit_all(&upstream, "add bzip2");

    prefix
        .cmd()
        .arg("-s")
        .assert()
        .success()
        .stdout(predicate::str::contains("Minilays synced, 2 minibuild(s)"));

    assert!(minilay.join("bzip2").is_file());
    // plain minilays are rescanned but left alone
    assert!(prefix.file_exists(MINILAY));
}
