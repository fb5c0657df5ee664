use assert_cmd::Command;
use mockito::Matcher;
use predicates::prelude::*;
use serial_test::serial;
use std::fs::{read_to_string, write};
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

const TREE_JSON: &str = r#"{
  "sha": "rev-cli",
  "tree": [
    { "path": "init.lua", "mode": "100644", "type": "blob", "sha": "a" },
    { "path": "lua", "mode": "040000", "type": "tree", "sha": "b" },
    { "path": "lua/plugins.lua", "mode": "100644", "type": "blob", "sha": "c" },
    { "path": "ginit.vim", "mode": "100644", "type": "blob", "sha": "d" },
    { "path": "README.md", "mode": "100644", "type": "blob", "sha": "e" }
  ],
  "truncated": false
}"#;

fn write_config(api_base_url: &str, out_dir: &Path, plugins_file: &Path) -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    let yaml = format!(
        "config:\n  id: 5\n  owner: someone\n  repo: dotfiles\n  branch: main\ngithub:\n  api_base_url: \"{}\"\nsync:\n  fetch_timeout_secs: 5\nstore:\n  output_dir: \"{}\"\n  plugins_file: \"{}\"\n",
        api_base_url,
        out_dir.display(),
        plugins_file.display()
    );
    write(config.path(), yaml).expect("Writing temp config failed");
    config
}

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("nvim-sync").unwrap();
    cmd.env_remove("GITHUB_TOKEN");
    cmd
}

#[test]
fn test_cli_help_lists_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("locate"));
}

#[test]
fn test_cli_sync_fails_for_missing_config() {
    cmd()
        .args(["sync", "--config", "/definitely/not/here.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
#[serial]
fn test_cli_locate_prints_entry_files() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/repos/someone/dotfiles/git/trees/main")
        .match_query(Matcher::UrlEncoded("recursive".into(), "1".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TREE_JSON)
        .create();

    let dir = tempdir().unwrap();
    let config = write_config(
        &server.url(),
        &dir.path().join("out"),
        &dir.path().join("plugins.json"),
    );

    cmd()
        .args(["locate", "--config"])
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"path\": \"init.lua\""))
        .stdout(predicate::str::contains("ginit.vim").not());
}

#[test]
#[serial]
fn test_cli_sync_writes_snapshot() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/repos/someone/dotfiles/git/trees/main")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TREE_JSON)
        .create();
    server
        .mock("GET", "/repos/someone/dotfiles/contents/init.lua")
        .with_status(200)
        .with_body("vim.g.mapleader = ','\nrequire('lazy').setup('plugins')\n")
        .create();
    server
        .mock("GET", "/repos/someone/dotfiles/contents/lua/plugins.lua")
        .with_status(200)
        .with_body("return {\n  'folke/tokyonight.nvim',\n}")
        .create();
    server
        .mock("GET", "/repos/someone/dotfiles/contents/ginit.vim")
        .with_status(200)
        .with_body("set guifont=Hack")
        .create();

    let dir = tempdir().unwrap();
    let plugins_file = dir.path().join("plugins.json");
    write(
        &plugins_file,
        r#"[{"id": 9, "owner": "folke", "name": "tokyonight.nvim"}]"#,
    )
    .unwrap();
    let out_dir = dir.path().join("out");
    let config = write_config(&server.url(), &out_dir, &plugins_file);

    cmd()
        .args(["sync", "--config"])
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"revision\": \"rev-cli\""));

    let snapshot = read_to_string(out_dir.join("5.json")).expect("snapshot should be written");
    let record: serde_json::Value = serde_json::from_str(&snapshot).unwrap();
    assert_eq!(record["leader_key"], ",");
    assert_eq!(record["line_count"], 7);
    assert_eq!(record["plugins"][0]["plugin_id"], 9);
    assert_eq!(record["plugins"][0]["references"], "lua/plugins.lua#L2");
}

#[test]
#[serial]
fn test_cli_sync_rejects_repository_without_init_file() {
    let mut server = mockito::Server::new();
    server
        .mock("GET", "/repos/someone/dotfiles/git/trees/main")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sha": "x", "tree": [{"path": "README.md", "type": "blob"}]}"#)
        .create();

    let dir = tempdir().unwrap();
    let plugins_file = dir.path().join("plugins.json");
    write(&plugins_file, "[]").unwrap();
    let config = write_config(&server.url(), &dir.path().join("out"), &plugins_file);

    cmd()
        .args(["sync", "--config"])
        .arg(config.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to identify init file"));
}
