use mockito::Matcher;

use nvim_sync_core::contract::{ContentFetcher, NodeKind, TreeFetcher};
use nvim_sync_core::github::GithubClient;

const TREE_JSON: &str = r#"{
  "sha": "9fb037999f264ba9a7fc6274d15fa3ae2ab98312",
  "url": "https://api.github.com/repos/someone/dotfiles/git/trees/9fb0379",
  "tree": [
    { "path": "nvim", "mode": "040000", "type": "tree", "sha": "a1" },
    { "path": "nvim/init.lua", "mode": "100644", "type": "blob", "sha": "b2", "size": 120 },
    { "path": "vendor/plugin", "mode": "160000", "type": "commit", "sha": "c3" }
  ],
  "truncated": false
}"#;

#[tokio::test]
async fn test_fetch_tree_parses_recursive_listing() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/repos/someone/dotfiles/git/trees/main")
        .match_query(Matcher::UrlEncoded("recursive".into(), "1".into()))
        .match_header("authorization", "Bearer secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TREE_JSON)
        .create_async()
        .await;

    let client = GithubClient::with_base_url(server.url()).unwrap();
    let tree = client
        .fetch_tree("secret", "someone", "dotfiles", "main")
        .await
        .expect("tree should be fetched");

    mock.assert_async().await;
    assert_eq!(tree.sha, "9fb037999f264ba9a7fc6274d15fa3ae2ab98312");
    assert_eq!(tree.tree.len(), 3);
    assert_eq!(tree.tree[1].path, "nvim/init.lua");
    assert_eq!(tree.tree[1].kind, NodeKind::Blob);
    assert_eq!(tree.tree[1].size, Some(120));
    assert_eq!(tree.tree[2].kind, NodeKind::Commit);
    assert!(!tree.truncated);
}

#[tokio::test]
async fn test_fetch_content_requests_raw_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/repos/someone/dotfiles/contents/nvim/lua/my%20plugins.lua")
        .match_header("accept", "application/vnd.github.raw")
        .with_status(200)
        .with_body("return { 'folke/lazy.nvim' }\n")
        .create_async()
        .await;

    let client = GithubClient::with_base_url(server.url()).unwrap();
    let content = client
        .fetch_content("", "someone", "dotfiles", "nvim/lua/my plugins.lua")
        .await
        .expect("content should be fetched");

    mock.assert_async().await;
    assert_eq!(content, "return { 'folke/lazy.nvim' }\n");
}

#[tokio::test]
async fn test_missing_file_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/repos/someone/dotfiles/contents/init.lua")
        .with_status(404)
        .with_body(r#"{"message": "Not Found"}"#)
        .create_async()
        .await;

    let client = GithubClient::with_base_url(server.url()).unwrap();
    let err = client
        .fetch_content("", "someone", "dotfiles", "init.lua")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"), "got: {err}");
}

#[tokio::test]
async fn test_rate_limit_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/repos/someone/dotfiles/git/trees/main")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_header("x-ratelimit-remaining", "0")
        .with_body(r#"{"message": "API rate limit exceeded"}"#)
        .create_async()
        .await;

    let client = GithubClient::with_base_url(server.url()).unwrap();
    let err = client
        .fetch_tree("", "someone", "dotfiles", "main")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("rate limited"), "got: {err}");
}

#[tokio::test]
async fn test_forbidden_without_exhausted_quota_is_a_status_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/repos/someone/private-dotfiles/git/trees/main")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_header("x-ratelimit-remaining", "4999")
        .with_body(r#"{"message": "Resource not accessible by integration"}"#)
        .create_async()
        .await;

    let client = GithubClient::with_base_url(server.url()).unwrap();
    let err = client
        .fetch_tree("secret", "someone", "private-dotfiles", "main")
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(!msg.contains("rate limited"), "got: {msg}");
    assert!(msg.contains("403"), "got: {msg}");
    assert!(msg.contains("Resource not accessible"), "got: {msg}");
}

#[test]
fn test_invalid_base_url_is_rejected() {
    assert!(GithubClient::with_base_url("not a url").is_err());
}
