use crate::common::redirect_temp_dir;
use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use bitcat::config::Config;
use fake::Fake;
use fake::faker::lorem::en::Words;
use rstest::fixture;
use std::path::Path;

pub const AUTHOR_NAME: &str = "Fake User";
pub const AUTHOR_EMAIL: &str = "fake_email@email.com";
pub const AUTHOR_DATE: &str = "1700000000 +0200";

#[fixture]
pub fn repository_dir() -> TempDir {
    redirect_temp_dir();
    let dir = TempDir::new().expect("Failed to create temp dir");

    git(dir.path(), &["init", "-q"]);
    git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);

    dir
}

/// Three commits over a nested tree, where `notes.txt` grows a little each
/// time so that packing turns it into a delta chain
#[fixture]
pub fn committed_repository_dir(repository_dir: TempDir) -> TempDir {
    let lines = (0..200)
        .map(|line| format!("{line:03} {}", Words(4..8).fake::<Vec<String>>().join(" ")))
        .collect::<Vec<_>>();

    repository_dir.child("1.txt").write_str("one\n").unwrap();
    repository_dir.child("a/2.txt").write_str("two\n").unwrap();
    repository_dir.child("a/b/3.txt").write_str("three\n").unwrap();

    for revision in 0..3 {
        let mut content = lines.clone();
        content.truncate(150 + revision * 25);
        repository_dir
            .child("notes.txt")
            .write_str(&(content.join("\n") + "\n"))
            .unwrap();

        git(repository_dir.path(), &["add", "."]);
        git_commit(repository_dir.path(), &format!("Revision {revision}"));
    }

    repository_dir
}

pub fn run_bitcat_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("bitcat").expect("Failed to find bitcat binary");
    cmd.env_remove("GIT_DIR");
    cmd.env_remove("RUST_LOG");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

pub fn run_git_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir);
    cmd.envs(vec![
        ("GIT_AUTHOR_NAME", AUTHOR_NAME),
        ("GIT_AUTHOR_EMAIL", AUTHOR_EMAIL),
        ("GIT_AUTHOR_DATE", AUTHOR_DATE),
        ("GIT_COMMITTER_NAME", AUTHOR_NAME),
        ("GIT_COMMITTER_EMAIL", AUTHOR_EMAIL),
        ("GIT_COMMITTER_DATE", AUTHOR_DATE),
        ("GIT_CONFIG_NOSYSTEM", "1"),
    ]);
    cmd.env_remove("GIT_DIR");
    cmd.args(["-c", "commit.gpgsign=false", "-c", "tag.gpgsign=false"]);
    cmd.args(["-c", "core.autocrlf=false"]);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

/// Run git, assert success and return its trimmed stdout
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = run_git_command(dir, args).assert().success();
    String::from_utf8(output.get_output().stdout.clone())
        .expect("git output is not UTF-8")
        .trim()
        .to_string()
}

pub fn git_commit(dir: &Path, message: &str) -> String {
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

/// Move every object into a single pack and drop the loose copies
pub fn repack(dir: &Path, extra_args: &[&str]) {
    let mut args = vec!["repack", "-a", "-d", "-f", "-q", "--window=50", "--depth=50"];
    args.extend_from_slice(extra_args);
    git(dir, &args);
    git(dir, &["prune-packed"]);
}

pub fn config(dir: &Path) -> Config {
    Config::new(dir.join(".git"))
}

/// Path of the single pack index written by [`repack`]
pub fn pack_index_path(dir: &Path) -> std::path::PathBuf {
    std::fs::read_dir(dir.join(".git/objects/pack"))
        .expect("Failed to list pack directory")
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .find(|path| path.extension().is_some_and(|ext| ext == "idx"))
        .expect("no pack index written")
}
