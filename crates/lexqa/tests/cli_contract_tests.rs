//! CLI command contract tests.
//!
//! Runs the `lexqa` binary against a temp workspace holding a small corpus.
//!
//! Contract guarantees tested:
//! - Answer page layout in plain mode, stable schema in `--format json`
//! - Deterministic exit codes
//! - Actionable error messages (with remediation) for failure paths
//! - The repl ignores blank lines and honours `:reload` / `:quit`

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const CORPUS: &str = r#"[
  {
    "title": "Data Act",
    "url": "https://eur-lex.europa.eu/eli/reg/2023/2854/oj",
    "articles": [
      {
        "article": 3,
        "paragraphs": [
          { "number": 1, "text": "Connected products shall be designed so that product data is accessible to the user." },
          { "number": 2, "text": "Before concluding a contract, the seller shall provide information on the data the product generates." }
        ]
      }
    ]
  },
  {
    "title": "AI Act",
    "url": "https://eur-lex.europa.eu/eli/reg/2024/1689/oj",
    "articles": [
      {
        "article": 5,
        "paragraphs": [
          { "number": 1, "text": "The placing on the market of AI systems that deploy subliminal techniques is prohibited." }
        ]
      }
    ]
  }
]"#;

// =============================================================================
// Test fixture helpers
// =============================================================================

/// Temp workspace with `laws.json`. Returns (guard, corpus path string).
fn setup_workspace() -> (TempDir, String) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("laws.json");
    std::fs::write(&path, CORPUS).expect("write corpus");
    let path = path.to_string_lossy().to_string();
    (dir, path)
}

/// Command isolated from any user config or environment filter.
fn lexqa_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lexqa").expect("lexqa binary should be built");
    cmd.current_dir(dir.path());
    cmd.env("XDG_CONFIG_HOME", dir.path().join("xdg"));
    cmd.env("HOME", dir.path());
    cmd.env_remove("RUST_LOG");
    cmd.env_remove("LEXQA_CONFIG");
    cmd.env_remove("LEXQA_CORPUS");
    cmd
}

fn assert_no_ansi(output: &str, context: &str) {
    assert!(
        !output.contains("\x1b["),
        "{context}: output should not contain ANSI escapes, got:\n{output}"
    );
}

// =============================================================================
// lexqa ask
// =============================================================================

#[test]
fn contract_ask_plain_layout() {
    let (dir, corpus) = setup_workspace();
    let output = lexqa_cmd(&dir)
        .args(["--corpus", &corpus, "ask", "Which AI systems deploy subliminal techniques?", "-k", "2"])
        .output()
        .expect("lexqa ask should execute");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_no_ansi(&stdout, "lexqa ask (plain)");
    assert!(stdout.starts_with("Answer"), "{stdout}");
    assert!(stdout.contains("**AI Act, Article 5, Paragraph 1**"), "{stdout}");
    assert!(stdout.contains("View full law: https://eur-lex.europa.eu/eli/reg/2024/1689/oj"));
    assert_eq!(stdout.matches("---").count(), 2);
}

#[test]
fn contract_ask_json_schema() {
    let (dir, corpus) = setup_workspace();
    let output = lexqa_cmd(&dir)
        .args(["--corpus", &corpus, "ask", "product data", "--format", "json", "-k", "10"])
        .output()
        .expect("lexqa ask --format json should execute");

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(value["status"], "results");
    let answers = value["answers"].as_array().expect("answers array");
    assert_eq!(answers.len(), 3, "k is clamped to the passage count");
    for answer in answers {
        for key in ["text", "reference", "url", "distance"] {
            assert!(answer.get(key).is_some(), "missing {key} in {answer}");
        }
    }
}

#[test]
fn contract_ask_blank_query() {
    let (dir, corpus) = setup_workspace();
    lexqa_cmd(&dir)
        .args(["--corpus", &corpus, "ask", "   "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Please enter a question."));
}

#[test]
fn contract_ask_empty_corpus() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.json");
    std::fs::write(&path, "[]").unwrap();
    lexqa_cmd(&dir)
        .args(["--corpus", path.to_str().unwrap(), "ask", "anything"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No relevant passages found."));
}

#[test]
fn contract_ask_malformed_corpus_fails_with_remediation() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"[{"title": "No url", "articles": []}]"#).unwrap();
    lexqa_cmd(&dir)
        .args(["--corpus", path.to_str().unwrap(), "ask", "anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed corpus at line 1"))
        .stderr(predicate::str::contains("To fix:"));
}

#[test]
fn contract_missing_corpus_fails() {
    let dir = TempDir::new().unwrap();
    lexqa_cmd(&dir)
        .args(["ask", "anything"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no corpus configured"))
        .stderr(predicate::str::contains("--corpus"));
}

#[test]
fn contract_corpus_from_config_file() {
    let (dir, corpus) = setup_workspace();
    std::fs::write(
        dir.path().join("lexqa.toml"),
        format!("corpus = {corpus:?}\n\n[retrieval]\ntop_k = 1\n"),
    )
    .unwrap();
    let output = lexqa_cmd(&dir)
        .args(["ask", "seller contract information", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["answers"].as_array().unwrap().len(), 1);
}

#[test]
fn contract_invalid_config_value_fails() {
    let (dir, corpus) = setup_workspace();
    std::fs::write(dir.path().join("lexqa.toml"), "[retrieval]\ntop_k = 0\n").unwrap();
    lexqa_cmd(&dir)
        .args(["--corpus", &corpus, "stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("retrieval.top_k"));
}

// =============================================================================
// lexqa passages / stats
// =============================================================================

#[test]
fn contract_passages_plain_lists_positions() {
    let (dir, corpus) = setup_workspace();
    lexqa_cmd(&dir)
        .args(["--corpus", &corpus, "passages"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[0] Data Act, Article 3, Paragraph 1"))
        .stdout(predicate::str::contains("[1] Data Act, Article 3, Paragraph 2"))
        .stdout(predicate::str::contains("[2] AI Act, Article 5, Paragraph 1"));
}

#[test]
fn contract_passages_json() {
    let (dir, corpus) = setup_workspace();
    let output = lexqa_cmd(&dir)
        .args(["--corpus", &corpus, "passages", "--format", "json"])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = value.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["index"], 2);
    assert_eq!(rows[2]["url"], "https://eur-lex.europa.eu/eli/reg/2024/1689/oj");
}

#[test]
fn contract_stats_json() {
    let (dir, corpus) = setup_workspace();
    let output = lexqa_cmd(&dir)
        .args(["--corpus", &corpus, "stats", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["laws"], 2);
    assert_eq!(value["articles"], 2);
    assert_eq!(value["passages"], 3);
    assert_eq!(value["dimension"], 384);
    assert_eq!(value["default_k"], 3);
}

// =============================================================================
// lexqa repl
// =============================================================================

#[test]
fn contract_repl_answers_each_line() {
    let (dir, corpus) = setup_workspace();
    lexqa_cmd(&dir)
        .args(["--corpus", &corpus, "repl", "-k", "1"])
        .write_stdin("\n   \nsubliminal techniques\n:quit\nnever asked\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("**AI Act, Article 5, Paragraph 1**"))
        .stdout(predicate::str::contains("Answer").count(1));
}

#[test]
fn contract_repl_reload_rebuilds() {
    let (dir, corpus) = setup_workspace();
    let output = lexqa_cmd(&dir)
        .args(["--corpus", &corpus, "repl", "-k", "1"])
        .write_stdin(":reload\nsubliminal techniques\n:q\n")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Reloaded: 3 passages"), "{stderr}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("**AI Act, Article 5, Paragraph 1**"), "{stdout}");
}

#[test]
fn contract_repl_ends_at_eof() {
    let (dir, corpus) = setup_workspace();
    lexqa_cmd(&dir)
        .args(["--corpus", &corpus, "repl"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn contract_repl_startup_failure_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "not json").unwrap();
    lexqa_cmd(&dir)
        .args(["--corpus", path.to_str().unwrap(), "repl"])
        .write_stdin("question\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed corpus"));
}

#[test]
fn contract_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    lexqa_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("repl"))
        .stdout(predicate::str::contains("passages"))
        .stdout(predicate::str::contains("stats"));
}
