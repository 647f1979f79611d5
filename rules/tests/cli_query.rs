//! CLI tests for `rules query`, `rules candidates` and `rules check`.
//!
//! Spawns the binary against on-disk models and checks exit codes and
//! printed JSON.

use std::path::Path;
use std::process::{Command, Output};

use rules::exit_codes;
use rules::test_support::write_fixture;

const PAGE_RULES: &str = "\
# page colors
*true* => color = 'yellow' ; fallback
pageName = 'Main' => color = 'green'
*true* => bannerColor = defaultColor
*true* => a = b
*true* => b = a
";

fn rules_cmd(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rules"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("run rules")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[test]
fn query_prints_inferred_value() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_fixture(temp.path(), "page.rules", PAGE_RULES);

    let output = rules_cmd(
        temp.path(),
        &["query", "color", "--model", "page.rules", "--set", "pageName=Main"],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout(&output), "\"green\"");

    let output = rules_cmd(temp.path(), &["query", "color", "-m", "page.rules", "--all"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout(&output), "[\"yellow\"]");
}

#[test]
fn query_without_match_exits_with_no_value_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_fixture(temp.path(), "page.rules", PAGE_RULES);

    let output = rules_cmd(temp.path(), &["query", "width", "--model", "page.rules"]);
    assert_eq!(output.status.code(), Some(exit_codes::NO_VALUE));
    assert!(stdout(&output).is_empty());
}

#[test]
fn query_cycle_exits_with_cycle_code() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_fixture(temp.path(), "page.rules", PAGE_RULES);

    let output = rules_cmd(temp.path(), &["query", "a", "--model", "page.rules"]);
    assert_eq!(output.status.code(), Some(exit_codes::CYCLE));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("a -> b -> a"));
}

#[test]
fn query_reads_config_models_and_stored_values() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_fixture(temp.path(), "page.rules", PAGE_RULES);
    write_fixture(
        temp.path(),
        "rules.toml",
        "models = [\"page.rules\"]\n\n[stored]\ndefaultColor = \"red\"\n",
    );

    let output = rules_cmd(temp.path(), &["query", "bannerColor", "--config", "rules.toml"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout(&output), "\"red\"");
}

#[test]
fn candidates_prints_ranked_rules() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_fixture(temp.path(), "page.rules", PAGE_RULES);

    let output = rules_cmd(temp.path(), &["candidates", "color", "--model", "page.rules"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        stdout(&output),
        "pageName = 'Main' => color = \"green\" ; 100\n*true* => color = \"yellow\" ; 0"
    );
}

#[test]
fn check_rejects_unparseable_rule_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    write_fixture(temp.path(), "page.rules", PAGE_RULES);
    write_fixture(temp.path(), "bad.rules", "color = 'x'\n");

    let output = rules_cmd(temp.path(), &["check", "page.rules"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(stdout(&output), "page.rules: 5 rules");

    let output = rules_cmd(temp.path(), &["check", "page.rules", "bad.rules"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}

#[test]
fn missing_model_file_is_invalid() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = rules_cmd(temp.path(), &["query", "color", "--model", "nope.rules"]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
}
