#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use dimse::tags;
use pacs_archive::acl::services;
use pacs_archive::archive::{Archive, DataSetGenerator, FindGenerator};
use pacs_archive::backend::{DocumentStore, Filter, RedbStore};
use pacs_archive::config::DatabaseConfig;
use pacs_archive::storage::FilesystemBlobStore;
use serde_json::json;
use tempfile::TempDir;

fn document(value: serde_json::Value) -> pacs_archive::backend::Document {
    match value {
        serde_json::Value::Object(document) => document,
        _ => panic!("not an object"),
    }
}

#[tokio::test]
async fn test_documents_persist_across_handles() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("archive.redb");

    let store = RedbStore::open(&path).unwrap();
    store
        .insert("pacs.peers", document(json!({"name": "a", "port": 1})))
        .await
        .unwrap();
    store
        .insert("pacs.peers", document(json!({"name": "b", "port": 2})))
        .await
        .unwrap();
    drop(store);

    let reopened = RedbStore::open(&path).unwrap();
    let all = reopened.find("pacs.peers", &Filter::All, None).await.unwrap();
    let names: Vec<_> = all.iter().map(|d| d["name"].clone()).collect();
    assert_eq!(names, [json!("a"), json!("b")]);

    assert_eq!(
        reopened
            .update_fields("pacs.peers", &Filter::eq("name", "b"), document(json!({"port": 3})))
            .await
            .unwrap(),
        1
    );
    let b = reopened
        .find_one("pacs.peers", &Filter::eq("name", "b"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(b["port"], json!(3));

    assert_eq!(reopened.remove("pacs.peers", &Filter::eq("name", "a")).await.unwrap(), 1);
    assert_eq!(reopened.count("pacs.peers", &Filter::All).await.unwrap(), 1);
}

#[tokio::test]
async fn test_missing_namespace_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = RedbStore::open(&dir.path().join("empty.redb")).unwrap();
    assert!(store.find("pacs.none", &Filter::All, None).await.unwrap().is_empty());
    assert_eq!(store.remove("pacs.none", &Filter::All).await.unwrap(), 0);
    store.ping().await.unwrap();
}

#[tokio::test]
async fn test_archive_over_redb_and_filesystem() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RedbStore::open(&dir.path().join("archive.redb")).unwrap());
    let blobs = Arc::new(FilesystemBlobStore::new(dir.path().join("blobs")).unwrap());
    let database = DatabaseConfig {
        gridfs_limit: 64,
        ..Default::default()
    };
    let archive = Archive::new(store, blobs, &database, common::AE_TITLE);
    archive.acl().set_entries(&common::acl_entries()).await.unwrap();

    for instance in common::sample_instances() {
        archive.storage().store(&instance).await.unwrap();
    }
    assert_eq!(
        archive.storage().retrieve("2.2.1.1").await.unwrap(),
        common::instance(2, 2, 1, 1)
    );

    let mut generator = FindGenerator::new(archive.clone(), "query");
    generator
        .initialize(&dimse::Request::find(
            1,
            dimse::uids::STUDY_ROOT_QUERY_RETRIEVE_FIND,
            common::query("STUDY", vec![]),
        ))
        .await
        .unwrap();
    assert_eq!(generator.count(), 3);
    assert_eq!(
        generator.get().await.unwrap().as_string(tags::STUDY_INSTANCE_UID, 0),
        Some("1.1")
    );
    assert!(archive.acl().is_allowed("all", services::STORE).await.unwrap());
}
