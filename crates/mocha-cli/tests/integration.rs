use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SCENARIO: &str = r#"
actor: "0x1111111111111111111111111111111111111111"
tree_price: 4
farms:
  - id: 1
    name: Ethiopian Highlands Farm
    location: Yirgacheffe, Ethiopia
    current_trees: 1500
    tree_capacity: 2000
  - id: 2
    name: Dormant Farm
    tree_capacity: 500
    active: false
accounts:
  - address: "0x1111111111111111111111111111111111111111"
    balance: 400
    allowance: 0
"#;

fn scenario_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("mocha-scenario.yaml"), SCENARIO).unwrap();
    dir
}

fn mocha(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("mocha").unwrap();
    cmd.current_dir(dir.path());
    cmd
}

#[test]
fn farms_lists_the_scenario() {
    let dir = scenario_dir();
    mocha(&dir)
        .arg("farms")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ethiopian Highlands Farm"))
        .stdout(predicate::str::contains("inactive"));
}

#[test]
fn farm_shows_available_capacity() {
    let dir = scenario_dir();
    mocha(&dir)
        .args(["farm", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("500"));
}

#[test]
fn quote_reports_cost() {
    let dir = scenario_dir();
    mocha(&dir)
        .args(["--json", "quote", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"trees\": 100"));
}

#[test]
fn invest_runs_to_success() {
    let dir = scenario_dir();
    mocha(&dir)
        .args(["invest", "--farm", "1", "--trees", "100"])
        .assert()
        .success()
        .stdout(predicate::str::contains("approval attempt"))
        .stdout(predicate::str::contains("purchase attempt"))
        .stdout(predicate::str::contains("session complete"));
}

#[test]
fn invest_in_inactive_farm_fails_with_reason() {
    let dir = scenario_dir();
    mocha(&dir)
        .args(["invest", "--farm", "2", "--trees", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not accepting investments"));
}

#[test]
fn invest_with_zero_trees_fails_before_any_read() {
    let dir = scenario_dir();
    mocha(&dir)
        .args(["invest", "--farm", "1", "--trees", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tree count 0 is invalid"));
}

#[test]
fn missing_scenario_is_a_clear_error() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("mocha").unwrap();
    cmd.current_dir(dir.path());
    cmd.arg("farms")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no scenario file"));
}
