//! End-to-end runs of the `lineage` binary.

use serde_json::json;

use crate::common::{Fixture, stdout_of};

#[test]
fn version_reports_format() {
    let fixture = Fixture::new();
    let out = stdout_of(&fixture.lineage().arg("version").output().unwrap());
    assert!(out.starts_with("format version: 1\nbuilt from lineage "));
}

#[test]
fn commit_then_log_and_show() {
    let fixture = Fixture::new();

    let first = stdout_of(
        &fixture
            .lineage()
            .args(["commit", "people", r#"{"name":"ada"}"#, "-m", "add ada"])
            .output()
            .unwrap(),
    );
    let second = stdout_of(
        &fixture
            .lineage()
            .args(["commit", "people", r#"{"name":"bob"}"#, "-m", "rename"])
            .output()
            .unwrap(),
    );
    let (first, second) = (first.trim(), second.trim());
    assert_eq!(first.len(), 64);

    let log = stdout_of(&fixture.lineage().args(["log", "people"]).output().unwrap());
    assert_eq!(
        log,
        format!("* {} rename\n* {} add ada\n", &second[..8], &first[..8])
    );

    let show = stdout_of(
        &fixture
            .lineage()
            .args(["show", "people.value.name"])
            .output()
            .unwrap(),
    );
    assert_eq!(show, "\"bob\"\n");

    let by_hash = stdout_of(
        &fixture
            .lineage()
            .arg("show")
            .arg(format!("#{first}.value"))
            .output()
            .unwrap(),
    );
    assert_eq!(by_hash, "{\n  \"name\": \"ada\"\n}\n");
}

#[test]
fn log_limit_and_path() {
    let fixture = Fixture::new();
    for i in 0..5 {
        fixture.commit("counter", json!({ "n": i }), &format!("n={i}"));
    }

    let out = stdout_of(
        &fixture
            .lineage()
            .args(["log", "counter", "-n", "2", "--no-graph"])
            .output()
            .unwrap(),
    );
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with(" n=4"));

    let out = stdout_of(
        &fixture
            .lineage()
            .args(["log", "counter", "-v", "-n", "1", "--path", ".value.n"])
            .output()
            .unwrap(),
    );
    assert!(out.contains("Date:   2023-11-14 22:13:20 +0000"));
    assert!(out.contains("\n    4\n"));
}

#[test]
fn log_of_unknown_dataset_fails() {
    let fixture = Fixture::new();
    let output = fixture.lineage().args(["log", "nothing"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("dataset nothing has no commits"), "{stderr}");
}

#[test]
fn ds_lists_matching_datasets() {
    let fixture = Fixture::new();
    fixture.commit("cities", json!([]), "init");
    fixture.commit("countries", json!([]), "init");
    fixture.commit("rivers", json!([]), "init");

    let all = stdout_of(&fixture.lineage().arg("ds").output().unwrap());
    assert_eq!(all, "cities\ncountries\nrivers\n");

    let some = stdout_of(&fixture.lineage().args(["ds", "^c"]).output().unwrap());
    assert_eq!(some, "cities\ncountries\n");
}

#[test]
fn shell_session() {
    let fixture = Fixture::new();
    fixture.commit("notes", json!("hello"), "first note");

    let script = "\
version
ds
show notes.value
log notes
nonsense
show
exit
";
    let out = stdout_of(&fixture.shell(script));
    let body = out.replace("lineage> ", "");
    let lines: Vec<&str> = body.lines().collect();

    assert_eq!(lines[0], "format version: 1");
    assert!(lines[1].starts_with("built from lineage "));
    assert_eq!(lines[2], "notes");
    assert_eq!(lines[3], "\"hello\"");
    assert!(lines[4].starts_with("* ") && lines[4].ends_with(" first note"));
    assert_eq!(lines[5], "Unrecognized command: nonsense");
    assert!(lines[6].starts_with("error: usage: show"));
    assert_eq!(lines.len(), 7);
}

#[test]
fn shell_ends_cleanly_at_eof() {
    let fixture = Fixture::new();
    fixture.commit("live", json!(1), "one");

    let out = stdout_of(&fixture.shell("ds\nlog live\n"));
    let body = out.replace("lineage> ", "");
    assert!(body.starts_with("live\n* "));
    assert!(body.trim_end().ends_with(" one"));
}
