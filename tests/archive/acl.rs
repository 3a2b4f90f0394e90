#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use pacs_archive::acl::{services, AccessControlEntry, AccessControlList};
use pacs_archive::backend::{Filter, MemoryStore};
use serde_json::json;

async fn sample_acl() -> AccessControlList {
    let acl = AccessControlList::new(Arc::new(MemoryStore::new()), "pacs");
    acl.set_entries(&common::acl_entries()).await.unwrap();
    acl
}

#[tokio::test]
async fn test_is_allowed_truth_table() {
    let acl = sample_acl().await;

    let cases = [
        ("echo", services::ECHO, true),
        ("echo", services::QUERY, false),
        ("store", services::STORE, true),
        ("store", services::RETRIEVE, false),
        ("query", services::QUERY, true),
        ("retrieve", services::RETRIEVE, true),
        ("all", services::ECHO, true),
        ("all", services::STORE, true),
        ("restricted_query", services::QUERY, true),
        ("restricted_query", services::RETRIEVE, false),
        ("nobody", services::ECHO, false),
        ("", services::ECHO, false),
    ];
    for (principal, service, expected) in cases {
        assert_eq!(
            acl.is_allowed(principal, service).await.unwrap(),
            expected,
            "{} / {}",
            principal,
            service
        );
    }
}

#[tokio::test]
async fn test_anonymous_needs_an_anonymous_entry() {
    let acl = sample_acl().await;
    acl.add_entry(&AccessControlEntry::unrestricted("*", services::ECHO))
        .await
        .unwrap();
    assert!(acl.is_allowed("someone", services::ECHO).await.unwrap());
    assert!(!acl.is_allowed("", services::ECHO).await.unwrap());

    acl.add_entry(&AccessControlEntry::unrestricted("", services::ECHO))
        .await
        .unwrap();
    assert!(acl.is_allowed("", services::ECHO).await.unwrap());
}

#[tokio::test]
async fn test_constraints() {
    let acl = sample_acl().await;

    assert_eq!(acl.get_constraints("query", services::QUERY).await.unwrap(), None);
    assert_eq!(
        acl.get_constraints("restricted_query", services::QUERY)
            .await
            .unwrap(),
        Some(Filter::Or(vec![Filter::And(vec![Filter::eq(
            "00100010.Value.Alphabetic",
            "Patient 1"
        )])]))
    );
    assert_eq!(
        acl.get_constraints("nobody", services::QUERY).await.unwrap(),
        Some(Filter::Or(vec![]))
    );
}

#[tokio::test]
async fn test_one_alternative_per_restricted_entry() {
    let acl = AccessControlList::new(Arc::new(MemoryStore::new()), "pacs");
    acl.set_entries(&[
        AccessControlEntry::new("alice", services::QUERY, json!({"00100020": "1"})),
        AccessControlEntry::new("*", services::QUERY, json!({"00100020": "2"})),
        AccessControlEntry::new("alice", services::ANY, json!({"00080060": "CT"})),
    ])
    .await
    .unwrap();

    match acl.get_constraints("alice", services::QUERY).await.unwrap() {
        Some(Filter::Or(alternatives)) => assert_eq!(alternatives.len(), 3),
        other => panic!("unexpected constraint {:?}", other),
    }
}

#[tokio::test]
async fn test_set_entries_replaces_table() {
    let acl = sample_acl().await;
    assert_eq!(acl.get_entries().await.unwrap(), common::acl_entries());

    let replacement = vec![AccessControlEntry::unrestricted("bob", services::ECHO)];
    acl.set_entries(&replacement).await.unwrap();
    assert_eq!(acl.get_entries().await.unwrap(), replacement);
    assert!(!acl.is_allowed("echo", services::ECHO).await.unwrap());

    assert_eq!(acl.remove_entries("bob", services::ECHO).await.unwrap(), 1);
    assert!(acl.get_entries().await.unwrap().is_empty());
}
