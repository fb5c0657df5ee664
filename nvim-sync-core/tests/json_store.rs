use std::fs::write;

use tempfile::tempdir;

use nvim_sync_core::contract::{ConfigStore, PluginAssociation, PluginCatalog};
use nvim_sync_core::store::{JsonFileStore, JsonPluginCatalog};

fn association(plugin_id: i64, references: &str) -> PluginAssociation {
    PluginAssociation {
        plugin_id,
        references: references.into(),
    }
}

#[tokio::test]
async fn test_saves_accumulate_into_one_record() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());

    store.save_leader_key(7, "rev-1", ",").await.unwrap();
    store.save_line_count(7, "rev-1", 120).await.unwrap();
    store
        .save_language_servers(7, "rev-1", &["lua_ls".to_string()])
        .await
        .unwrap();
    store
        .save_plugin_associations(7, "rev-1", &[association(1, "init.lua#L3")])
        .await
        .unwrap();

    let record = store.get_config_with_plugins(7).await.unwrap();
    assert_eq!(record.config_id, 7);
    assert_eq!(record.revision.as_deref(), Some("rev-1"));
    assert_eq!(record.leader_key, ",");
    assert_eq!(record.line_count, 120);
    assert_eq!(record.language_servers, vec!["lua_ls"]);
    assert_eq!(record.plugins, vec![association(1, "init.lua#L3")]);
    assert!(store.record_path(7).exists());
}

async fn store_full_snapshot(
    store: &JsonFileStore,
    revision: &str,
    leader_key: &str,
    line_count: u64,
    servers: &[&str],
    associations: &[PluginAssociation],
) {
    let servers: Vec<String> = servers.iter().map(|s| s.to_string()).collect();
    store.save_leader_key(7, revision, leader_key).await.unwrap();
    store.save_line_count(7, revision, line_count).await.unwrap();
    store
        .save_language_servers(7, revision, &servers)
        .await
        .unwrap();
    store
        .save_plugin_associations(7, revision, associations)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_partial_new_revision_keeps_previous_snapshot() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());
    store_full_snapshot(
        &store,
        "rev-1",
        ",",
        10,
        &["gopls"],
        &[association(1, "init.lua#L1")],
    )
    .await;

    store.save_leader_key(7, "rev-2", "Space").await.unwrap();

    let record = store.get_config_with_plugins(7).await.unwrap();
    assert_eq!(record.revision.as_deref(), Some("rev-1"));
    assert_eq!(record.leader_key, ",");
    assert_eq!(record.line_count, 10);
    assert_eq!(record.language_servers, vec!["gopls"]);
    assert_eq!(record.plugins, vec![association(1, "init.lua#L1")]);
    assert!(store.pending_path(7, "rev-2").exists());
}

#[tokio::test]
async fn test_completed_new_revision_replaces_snapshot() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());
    store_full_snapshot(
        &store,
        "rev-1",
        ",",
        10,
        &["gopls"],
        &[association(1, "init.lua#L1")],
    )
    .await;

    // Associations land before the leader key and line count.
    store
        .save_language_servers(7, "rev-2", &["lua_ls".to_string()])
        .await
        .unwrap();
    store
        .save_plugin_associations(7, "rev-2", &[association(2, "lua/plugins.lua#L4")])
        .await
        .unwrap();
    assert_eq!(
        store.get_config_with_plugins(7).await.unwrap().revision.as_deref(),
        Some("rev-1")
    );
    store.save_line_count(7, "rev-2", 3).await.unwrap();
    store.save_leader_key(7, "rev-2", "Space").await.unwrap();

    let record = store.get_config_with_plugins(7).await.unwrap();
    assert_eq!(record.revision.as_deref(), Some("rev-2"));
    assert_eq!(record.leader_key, "Space");
    assert_eq!(record.line_count, 3);
    assert_eq!(record.language_servers, vec!["lua_ls"]);
    assert_eq!(record.plugins, vec![association(2, "lua/plugins.lua#L4")]);
    assert!(!store.pending_path(7, "rev-2").exists());
}

#[tokio::test]
async fn test_incomplete_first_snapshot_is_not_visible() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path());

    store.save_leader_key(7, "rev-1", ",").await.unwrap();
    store.save_line_count(7, "rev-1", 12).await.unwrap();

    assert!(store.get_config_with_plugins(7).await.is_err());
    assert!(!store.record_path(7).exists());
}

#[tokio::test]
async fn test_missing_record_is_an_error() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("not-created-yet"));
    let err = store.get_config_with_plugins(99).await.unwrap_err();
    assert!(err.to_string().contains("99"));
}

#[tokio::test]
async fn test_catalog_reads_json_array() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("plugins.json");
    write(
        &path,
        r#"[{"id": 1, "owner": "folke", "name": "lazy.nvim"}, {"id": 2, "owner": "tpope", "name": "vim-fugitive"}]"#,
    )
    .unwrap();

    let plugins = JsonPluginCatalog::new(&path)
        .list_tracked_plugins()
        .await
        .unwrap();
    assert_eq!(plugins.len(), 2);
    assert_eq!(plugins[1].full_name(), "tpope/vim-fugitive");
}

#[tokio::test]
async fn test_catalog_missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = JsonPluginCatalog::new(dir.path().join("nope.json"))
        .list_tracked_plugins()
        .await
        .unwrap_err();
    assert!(err.to_string().contains("nope.json"));
}
