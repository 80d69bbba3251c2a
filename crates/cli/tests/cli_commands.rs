use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[allow(deprecated)]
fn file_agent(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("file-agent").expect("binary");
    cmd.env_remove("FILE_AGENT_CONFIG")
        .env_remove("FILE_AGENT_MAX_ITERATIONS")
        .env("FILE_AGENT_EMBEDDING_MODE", "hashing")
        .env("FILE_AGENT_ROOT", root);
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn tools_prints_the_catalogue() {
    let temp = tempdir().unwrap();
    let catalogue = stdout_json(file_agent(temp.path()).arg("tools"));
    let names: Vec<&str> = catalogue
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "list_files",
            "read_file",
            "create_file",
            "update_file",
            "append_file",
            "delete_file",
            "search_files"
        ]
    );
    assert_eq!(catalogue[2]["parameters"]["type"], "object");
}

#[test]
fn ls_lists_workspace_files_without_internal_state() {
    let temp = tempdir().unwrap();
    fs::create_dir_all(temp.path().join("notes")).unwrap();
    fs::write(temp.path().join("notes/todo.txt"), "buy eggs").unwrap();
    fs::write(temp.path().join("a.txt"), "alpha").unwrap();

    file_agent(temp.path()).arg("index").assert().success();

    let files = stdout_json(file_agent(temp.path()).args(["ls", "--json"]));
    assert_eq!(files, serde_json::json!(["a.txt", "notes/todo.txt"]));
}

#[test]
fn index_skips_unchanged_files_on_the_second_run() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("ai.txt"), "One of the main dangers of AI is algorithmic bias.")
        .unwrap();

    let first = stdout_json(file_agent(temp.path()).args(["index", "--json"]));
    assert_eq!(first["indexed"], 1);

    let second = stdout_json(file_agent(temp.path()).args(["index", "--json"]));
    assert_eq!(second["indexed"], 0);
    assert_eq!(second["skipped"], 1);
}

#[test]
fn blank_ask_needs_no_completion_service() {
    let temp = tempdir().unwrap();
    file_agent(temp.path())
        .args(["ask", "   "])
        .assert()
        .success()
        .stdout(predicate::str::contains("which file operation"));
}

#[test]
fn invalid_config_is_reported() {
    let temp = tempdir().unwrap();
    let config = temp.path().join("agent.toml");
    fs::write(&config, "[orchestrator]\nmax_iterations = 0\n").unwrap();

    file_agent(temp.path())
        .arg("--config")
        .arg(&config)
        .arg("ls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}
