use assert_cmd::prelude::*;
use pretty_assertions::assert_eq;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::{tempdir, TempDir};

const DAY: u64 = 24 * 60 * 60;

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    assert!(Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn init_git_repo(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    git(dir, &["init", "--quiet"]);
    git(dir, &["config", "core.autocrlf", "false"]);
    git(dir, &["config", "core.safecrlf", "false"]);
    git(dir, &["config", "user.email", "you@example.com"]);
    git(dir, &["config", "user.name", "Your Name"]);
}

/// Writes `files` and commits them as `author`, dated `age` seconds ago.
fn commit_as(dir: &Path, author: &str, age: u64, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut f = File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.sync_all().unwrap();
    }
    git(dir, &["add", "."]);

    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    let date = format!("{} +0000", now - age);
    let email = format!("{author}@example.com");
    assert!(Command::new("git")
        .args(["commit", "--quiet", "-m", &format!("work by {author}")])
        .env("GIT_AUTHOR_NAME", author)
        .env("GIT_AUTHOR_EMAIL", &email)
        .env("GIT_COMMITTER_NAME", author)
        .env("GIT_COMMITTER_EMAIL", &email)
        .env("GIT_AUTHOR_DATE", &date)
        .env("GIT_COMMITTER_DATE", &date)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

/// Repository A: two commits inside a 7 day window on top of an old one.
/// Repository B: a single commit ten days before the cutoff.
fn workspace() -> TempDir {
    let root = tempdir().unwrap();

    let a = root.path().join("A");
    init_git_repo(&a);
    commit_as(
        &a,
        "carol",
        30 * DAY,
        &[("file1.txt", "1\n2\n3\n4\n5\n"), ("file2.txt", "x\n")],
    );
    commit_as(
        &a,
        "alice",
        DAY,
        &[("file1.txt", "1\n2\n3\na\nb\nc\nd\ne\nf\ng\nh\ni\nj\n")],
    );
    commit_as(&a, "bob", 60 * 60, &[("file2.txt", "y\n")]);

    let b = root.path().join("B");
    init_git_repo(&b);
    commit_as(&b, "dave", 17 * DAY, &[("old.txt", "ancient\n")]);

    root
}

fn workedon(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("workedon").unwrap();
    cmd.current_dir(root)
        .env_remove("RUST_LOG")
        .env_remove("CLICOLOR_FORCE");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).unwrap()
}

#[test]
fn per_file_report_for_recent_changes() {
    if !has_git() {
        return;
    }
    let root = workspace();

    let out = stdout_of(workedon(root.path()).args(["--files", "A", "B"]));
    assert_eq!(
        out,
        "PATH         CHANGES   AUTHORS\n\
         A/file1.txt  12 (86%)  alice\n\
         A/file2.txt  2 (14%)   bob\n"
    );
}

#[test]
fn per_repo_report_lists_authors_newest_first() {
    if !has_git() {
        return;
    }
    let root = workspace();

    let out = stdout_of(workedon(root.path()).args(["A", "B"]));
    assert_eq!(out, "PATH  CHANGES    AUTHORS\nA     14 (100%)  bob, alice\n");
}

#[test]
fn wider_window_reaches_older_commits() {
    if !has_git() {
        return;
    }
    let root = workspace();

    let out = stdout_of(workedon(root.path()).args(["--days", "20", "A", "B"]));
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("A "));
    assert!(lines[2].starts_with("B "));
    assert!(lines[2].contains("dave"));
}

#[test]
fn commit_with_an_older_date_does_not_hide_earlier_recent_work() {
    if !has_git() {
        return;
    }
    let root = tempdir().unwrap();
    let skew = root.path().join("S");
    init_git_repo(&skew);
    commit_as(&skew, "alice", 60 * 60, &[("one.txt", "1\n")]);
    commit_as(&skew, "bob", 30 * DAY, &[("two.txt", "2\n")]);
    commit_as(&skew, "carol", 60, &[("three.txt", "3\n")]);

    let out = workedon(root.path())
        .args(["--files", "--json", "S"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let paths: Vec<&str> = v["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["path"].as_str().unwrap())
        .collect();

    assert_eq!(paths, vec!["S/three.txt", "S/one.txt"]);
    assert_eq!(v["total"], 2);
}

#[test]
fn paths_that_are_not_repositories_are_skipped() {
    if !has_git() {
        return;
    }
    let root = workspace();
    fs::create_dir_all(root.path().join("plain")).unwrap();

    let assert = workedon(root.path())
        .args(["plain", "A", "missing"])
        .assert()
        .success();
    let output = assert.get_output();
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    let stderr = String::from_utf8(output.stderr.clone()).unwrap();

    assert!(stdout.contains("A     14 (100%)"));
    assert!(!stdout.contains("plain"));
    assert!(stderr.contains("plain"));
    assert!(stderr.contains("missing"));
}

#[test]
fn ignored_file_is_left_out_of_totals() {
    if !has_git() {
        return;
    }
    let root = workspace();

    let out = stdout_of(workedon(root.path()).args(["--files", "--ignore", "file1.txt", "A"]));
    assert_eq!(
        out,
        "PATH         CHANGES   AUTHORS\nA/file2.txt  2 (100%)  bob\n"
    );
}

#[test]
fn author_filter_keeps_only_their_changes() {
    if !has_git() {
        return;
    }
    let root = workspace();

    let out = stdout_of(workedon(root.path()).args(["--files", "--author", "alice", "A", "B"]));
    assert_eq!(
        out,
        "PATH         CHANGES    AUTHORS\nA/file1.txt  12 (100%)  alice\n"
    );

    let out = stdout_of(workedon(root.path()).args(["--author", "nobody", "A", "B"]));
    assert!(out.is_empty());
}

#[test]
fn top_limits_rows() {
    if !has_git() {
        return;
    }
    let root = workspace();

    let out = stdout_of(workedon(root.path()).args(["--files", "--top", "1", "A"]));
    assert_eq!(out.lines().count(), 2);
    assert!(out.contains("A/file1.txt"));
}

#[test]
fn json_output_carries_the_same_rows() {
    if !has_git() {
        return;
    }
    let root = workspace();

    let out = workedon(root.path())
        .args(["--files", "--json", "--workers", "1", "A", "B"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();

    assert_eq!(v["days"], 7);
    assert_eq!(v["total"], 14);
    let rows = v["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["path"], "A/file1.txt");
    assert_eq!(rows[0]["changes"], 12);
    assert_eq!(rows[0]["percent"], 86);
    assert_eq!(rows[1]["authors"], serde_json::json!(["bob"]));
}

#[test]
fn repeated_runs_give_identical_reports() {
    if !has_git() {
        return;
    }
    let root = workspace();

    let first = stdout_of(workedon(root.path()).args(["--files", "--workers", "1", "A", "B"]));
    let second = stdout_of(workedon(root.path()).args(["--files", "--workers", "8", "A", "B"]));
    assert_eq!(first, second);
}

#[test]
fn failed_pull_falls_back_to_local_history() {
    if !has_git() {
        return;
    }
    let root = workspace();

    let assert = workedon(root.path()).args(["--pull", "A"]).assert().success();
    let output = assert.get_output();
    let stdout = String::from_utf8(output.stdout.clone()).unwrap();
    let stderr = String::from_utf8(output.stderr.clone()).unwrap();

    assert!(stderr.contains("pulling repo"));
    assert!(stdout.contains("14 (100%)"));
}

#[test]
fn pull_brings_in_remote_commits() {
    if !has_git() {
        return;
    }
    let root = workspace();
    let upstream = root.path().join("A");
    let clone = root.path().join("clone");
    git(
        root.path(),
        &["clone", "--quiet", upstream.to_str().unwrap(), clone.to_str().unwrap()],
    );
    commit_as(&upstream, "erin", 60, &[("file3.txt", "new\nlines\n")]);

    let out = stdout_of(workedon(root.path()).args(["--pull", "--files", "clone"]));
    assert!(out.contains("clone/file3.txt"));
    assert!(out.contains("erin"));
}

#[test]
fn unreadable_history_aborts_unless_keep_going() {
    if !has_git() {
        return;
    }
    let root = workspace();
    let a = root.path().join("A");

    // Drop the loose object holding bob's version of file2.txt.
    let output = Command::new("git")
        .args(["rev-parse", "HEAD:file2.txt"])
        .current_dir(&a)
        .output()
        .unwrap();
    let blob = String::from_utf8(output.stdout).unwrap().trim().to_string();
    fs::remove_file(a.join(".git/objects").join(&blob[..2]).join(&blob[2..])).unwrap();

    let clean = root.path().join("C");
    init_git_repo(&clean);
    commit_as(&clean, "frank", 60, &[("ok.txt", "fine\n")]);

    let assert = workedon(root.path()).args(["A", "C"]).assert().failure();
    assert!(assert.get_output().stdout.is_empty());

    let out = stdout_of(workedon(root.path()).args(["--keep-going", "A", "C"]));
    assert!(out.contains("C "));
    assert!(!out.contains("A "));
}

#[test]
fn missing_repositories_argument_is_a_usage_error() {
    Command::cargo_bin("workedon").unwrap().assert().failure();
}
