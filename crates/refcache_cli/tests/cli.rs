//! Integration tests for the refcache CLI

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{TempDir, tempdir};

const CONFIG: &str = r#"{
    "indexes": [{
        "name": "comments",
        "value": "/doc/members/member",
        "key": "@name",
        "sources": [{ "base": "comments", "files": "*.xml" }]
    }],
    "copy": [{
        "index": "comments",
        "source": "member/summary",
        "target": "/document/comments"
    }]
}"#;

fn refcache_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_refcache"))
}

/// A project with two comment files and `refcache.json` in its root.
fn project() -> TempDir {
    let dir = tempdir().unwrap();
    let comments = dir.path().join("comments");
    fs::create_dir_all(&comments).unwrap();
    fs::write(
        comments.join("a.xml"),
        r#"<doc><members><member name="T:A"><summary>Alpha</summary></member></members></doc>"#,
    )
    .unwrap();
    fs::write(
        comments.join("b.xml"),
        r#"<doc><members><member name="T:B"><summary>Beta</summary></member></members></doc>"#,
    )
    .unwrap();
    fs::write(dir.path().join("refcache.json"), CONFIG).unwrap();
    dir
}

fn write_topic(dir: &Path) -> PathBuf {
    let path = dir.join("topic.xml");
    fs::write(&path, "<document><comments /></document>").unwrap();
    path
}

mod help_command {
    use super::*;

    #[test]
    fn shows_help_with_flag() {
        refcache_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:"));
    }

    #[test]
    fn shows_version_with_flag() {
        refcache_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

mod index_command {
    use super::*;

    #[test]
    fn reports_keys_per_index() {
        let dir = project();

        refcache_cmd()
            .current_dir(dir.path())
            .arg("index")
            .assert()
            .success()
            .stdout(predicate::str::contains("Index 'comments':"))
            .stdout(predicate::str::contains("2 keys from 2 files"));
    }

    #[test]
    fn json_output_includes_statistics() {
        let dir = project();

        let output = refcache_cmd()
            .current_dir(dir.path())
            .args(["index", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["indexes"][0]["name"], "comments");
        assert_eq!(json["indexes"][0]["statistics"]["keys"], 2);
        assert_eq!(json["indexes"][0]["statistics"]["cache"]["capacity"], 15);
        assert_eq!(json["diagnostics"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn malformed_file_is_reported_but_not_fatal() {
        let dir = project();
        fs::write(dir.path().join("comments/broken.xml"), "<doc><member></doc>").unwrap();

        refcache_cmd()
            .current_dir(dir.path())
            .arg("index")
            .assert()
            .success()
            .stdout(predicate::str::contains("warning: "))
            .stdout(predicate::str::contains("broken.xml"))
            .stdout(predicate::str::contains("2 keys"));
    }

    #[test]
    fn explicit_config_path() {
        let dir = project();
        let elsewhere = tempdir().unwrap();

        refcache_cmd()
            .current_dir(elsewhere.path())
            .arg("--config")
            .arg(dir.path().join("refcache.json"))
            .arg("index")
            .assert()
            .success()
            .stdout(predicate::str::contains("2 keys"));
    }

    #[test]
    fn missing_config_exits_with_two() {
        let dir = tempdir().unwrap();

        refcache_cmd()
            .current_dir(dir.path())
            .arg("index")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("No configuration found"));
    }

    #[test]
    fn schema_violation_exits_with_two() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("refcache.json"), r#"{ "indexes": [{}] }"#).unwrap();

        refcache_cmd()
            .current_dir(dir.path())
            .arg("index")
            .assert()
            .code(2);
    }
}

mod lookup_command {
    use super::*;

    #[test]
    fn prints_fragment() {
        let dir = project();

        refcache_cmd()
            .current_dir(dir.path())
            .args(["lookup", "comments", "T:B"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                r#"<member name="T:B"><summary>Beta</summary></member>"#,
            ));
    }

    #[test]
    fn json_output_names_source_file() {
        let dir = project();

        let output = refcache_cmd()
            .current_dir(dir.path())
            .args(["lookup", "comments", "T:A", "-f", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["key"], "T:A");
        assert!(json["file"].as_str().unwrap().ends_with("a.xml"));
    }

    #[test]
    fn absent_key_exits_with_one() {
        let dir = project();

        refcache_cmd()
            .current_dir(dir.path())
            .args(["lookup", "comments", "T:Missing"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("No entry for 'T:Missing'"));
    }

    #[test]
    fn unknown_index_exits_with_two() {
        let dir = project();

        refcache_cmd()
            .current_dir(dir.path())
            .args(["lookup", "nope", "T:A"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Unknown index 'nope'"));
    }
}

mod copy_command {
    use super::*;

    #[test]
    fn merges_fragment_into_document() {
        let dir = project();
        let topic = write_topic(dir.path());

        refcache_cmd()
            .current_dir(dir.path())
            .arg("copy")
            .arg("--document")
            .arg(&topic)
            .args(["--key", "T:A"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "<document><comments><summary>Alpha</summary></comments></document>",
            ));
    }

    #[test]
    fn writes_output_file() {
        let dir = project();
        let topic = write_topic(dir.path());
        let out = dir.path().join("out.xml");

        refcache_cmd()
            .current_dir(dir.path())
            .arg("copy")
            .arg("-d")
            .arg(&topic)
            .args(["-k", "T:B", "-o"])
            .arg(&out)
            .assert()
            .success();

        let written = fs::read_to_string(&out).unwrap();
        assert!(written.contains("<summary>Beta</summary>"));
    }

    #[test]
    fn json_output_reports_outcomes() {
        let dir = project();
        let topic = write_topic(dir.path());

        let output = refcache_cmd()
            .current_dir(dir.path())
            .arg("copy")
            .arg("-d")
            .arg(&topic)
            .args(["-k", "T:Missing", "--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["outcomes"][0]["outcome"], "missing-entry");
        assert_eq!(json["document"], "<document><comments /></document>");
    }

    #[test]
    fn missing_document_exits_with_two() {
        let dir = project();

        refcache_cmd()
            .current_dir(dir.path())
            .args(["copy", "-d", "nope.xml", "-k", "T:A"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Failed to read nope.xml"));
    }
}
