// End-to-end tests of the recast binary.
// Requires: assert_cmd, predicates and tempfile in [dev-dependencies]

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

const SERVICE: &str = "package com.acme;\n\nimport org.springframework.stereotype.Service;\n\n@Service\npublic class Greeter {\n    public String greet() {\n        return \"hi\";\n    }\n}\n";

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "src/main/java/com/acme/Greeter.java", SERVICE);
    write(dir.path(), "src/main/resources/application.properties", "server.port=8081\n");
    write(dir.path(), "target/classes/Stale.java", "@org.springframework.stereotype.Service class Stale {}\n");
    dir
}

fn write(root: &Path, relative: &str, text: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, text).expect("write");
}

fn recast() -> Command {
    let mut cmd = Command::cargo_bin("recast").expect("binary");
    cmd.env_remove("RUST_LOG").arg("--color").arg("never");
    cmd
}

#[test]
fn list_recipes_shows_the_migration() {
    recast()
        .arg("list-recipes")
        .assert()
        .success()
        .stdout(contains("recast.spring.SpringBootToQuarkus"))
        .stdout(contains("recast.properties.ChangePropertyKey").and(contains("(takes options)")));
}

#[test]
fn diff_prints_changes_without_touching_files() {
    let dir = project();
    recast()
        .arg("diff")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(contains("-@Service"))
        .stdout(contains("+@ApplicationScoped"))
        .stdout(contains("+quarkus.http.port=8081"))
        .stdout(contains("Stale").not())
        .stderr(contains("2 changed"));
    let on_disk = fs::read_to_string(dir.path().join("src/main/java/com/acme/Greeter.java")).expect("read");
    assert_eq!(on_disk, SERVICE);
}

#[test]
fn run_apply_writes_and_a_second_run_is_clean() {
    let dir = project();
    recast()
        .args(["run", "--apply"])
        .arg(dir.path())
        .assert()
        .success()
        .stderr(contains("wrote 2 file(s)"));
    let on_disk = fs::read_to_string(dir.path().join("src/main/java/com/acme/Greeter.java")).expect("read");
    assert!(on_disk.contains("@ApplicationScoped\npublic class Greeter {"));
    assert!(on_disk.contains("import jakarta.enterprise.context.ApplicationScoped;"));

    recast()
        .arg("diff")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(contains("0 changed"));
}

#[test]
fn json_output_is_machine_readable() {
    let dir = project();
    let output = recast()
        .args(["run", "--json", "-r", "recast.spring.StereotypeToApplicationScoped"])
        .arg(dir.path())
        .output()
        .expect("runs");
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    let files = value["files"].as_array().expect("files");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["recipes"][0], "recast.spring.StereotypeToApplicationScoped");
    assert!(files[0]["mutations"].as_array().is_some_and(|m| !m.is_empty()));
}

#[test]
fn configuration_file_selects_recipes() {
    let dir = project();
    write(
        dir.path(),
        "recast.yml",
        "recipes:\n  - recast.properties.ChangePropertyKey:\n      old_key: server.port\n      new_key: http.port\n",
    );
    recast()
        .arg("diff")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(contains("+http.port=8081"))
        .stdout(contains("@ApplicationScoped").not());
}

#[test]
fn unknown_recipes_fail_with_a_diagnostic() {
    let dir = project();
    recast()
        .args(["diff", "-r", "recast.spring.NoSuchRecipe"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(contains("unknown recipe"));
}

#[test]
fn zero_iterations_are_refused() {
    let dir = project();
    recast()
        .args(["diff", "--max-iterations", "0"])
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn unparsable_files_fail_the_run_but_not_the_others() {
    let dir = project();
    fs::write(dir.path().join("src/main/java/com/acme/Bad.java"), [b'c', 0xff, b'{']).expect("write");
    recast()
        .arg("diff")
        .arg(dir.path())
        .assert()
        .code(1)
        .stdout(contains("+@ApplicationScoped"))
        .stderr(contains("UTF-8"))
        .stderr(contains("1 failed to parse"));
}

#[test]
fn tree_dumps_a_properties_file() {
    let dir = project();
    recast()
        .arg("tree")
        .arg(dir.path().join("src/main/resources/application.properties"))
        .assert()
        .success()
        .stdout(contains("PropertiesFile@0..17"))
        .stdout(contains("PropKey@0..11 \"server.port\""));
}
