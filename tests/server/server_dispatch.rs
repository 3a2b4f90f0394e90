#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use dicom_core::VR;
use dimse::{status, tags, uids, DataSet, DimseError, Element};
use pacs_archive::acl::{services, AccessControlEntry};
use pacs_archive::authentication::AuthenticatorNone;
use pacs_archive::peers::ApplicationEntity;

use common::{connect, start_server, user, RunningServer};

const QUERY_RETRIEVE: [&str; 4] = [
    uids::VERIFICATION,
    uids::PATIENT_ROOT_QUERY_RETRIEVE_FIND,
    uids::PATIENT_ROOT_QUERY_RETRIEVE_GET,
    uids::PATIENT_ROOT_QUERY_RETRIEVE_MOVE,
];

async fn sample_server() -> (common::Fixture, RunningServer) {
    let fixture = common::sample_archive().await;
    let running = start_server(
        fixture.archive.clone(),
        Arc::new(AuthenticatorNone),
        common::AE_TITLE,
    )
    .await;
    (fixture, running)
}

async fn stop(running: RunningServer) {
    running.server.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(5), running.task)
        .await
        .expect("server stops")
        .expect("server task");
    assert!(result.is_ok());
}

fn study_query(patient_id: Option<&str>) -> DataSet {
    let mut elements = vec![(tags::STUDY_INSTANCE_UID, Element::empty(VR::UI))];
    if let Some(id) = patient_id {
        elements.push((tags::PATIENT_ID, Element::strings(VR::LO, [id])));
    }
    common::query("STUDY", elements)
}

#[tokio::test]
async fn test_echo_over_association() {
    let (_fixture, running) = sample_server().await;

    let mut scu = connect(running.port, user("echo"), &[uids::VERIFICATION])
        .await
        .unwrap();
    assert_eq!(scu.echo().await.unwrap(), status::SUCCESS);
    scu.release().await.unwrap();

    let mut refused = connect(running.port, user("store"), &[uids::VERIFICATION])
        .await
        .unwrap();
    assert_eq!(refused.echo().await.unwrap(), status::PROCESSING_FAILURE);
    refused.release().await.unwrap();

    stop(running).await;
}

#[tokio::test]
async fn test_transfer_syntax_negotiation() {
    let (_fixture, running) = sample_server().await;

    let scu = connect(running.port, user("all"), &QUERY_RETRIEVE)
        .await
        .unwrap();
    let negotiated = scu.association().parameters();
    assert_eq!(negotiated.presentation_contexts.len(), QUERY_RETRIEVE.len());
    for context in &negotiated.presentation_contexts {
        assert!(context.is_accepted());
        assert_eq!(
            context.transfer_syntaxes,
            vec![uids::DEFAULT_TRANSFER_SYNTAXES[0].to_string()]
        );
    }
    scu.release().await.unwrap();

    stop(running).await;
}

#[tokio::test]
async fn test_find_over_association() {
    let (_fixture, running) = sample_server().await;
    let mut scu = connect(running.port, user("query"), &QUERY_RETRIEVE)
        .await
        .unwrap();

    let responses = scu
        .find(uids::PATIENT_ROOT_QUERY_RETRIEVE_FIND, study_query(Some("2")))
        .await
        .unwrap();
    let (last, pending) = responses.split_last().unwrap();
    assert_eq!(last.status, status::SUCCESS);
    let studies: Vec<_> = pending
        .iter()
        .map(|response| {
            assert_eq!(response.status, status::PENDING);
            response
                .data_set
                .as_ref()
                .and_then(|d| d.as_string(tags::STUDY_INSTANCE_UID, 0))
                .unwrap()
                .to_string()
        })
        .collect();
    assert_eq!(studies, vec!["2.1", "2.2"]);

    // Association stays usable after a refused request
    let responses = scu
        .find(uids::PATIENT_ROOT_QUERY_RETRIEVE_FIND, common::query("BOGUS", vec![]))
        .await
        .unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].status, status::CANNOT_UNDERSTAND);
    assert!(responses[0].error_comment.is_some());

    scu.release().await.unwrap();
    stop(running).await;
}

#[tokio::test]
async fn test_find_refused() {
    let (_fixture, running) = sample_server().await;
    let mut scu = connect(running.port, user("store"), &QUERY_RETRIEVE)
        .await
        .unwrap();

    let responses = scu
        .find(uids::PATIENT_ROOT_QUERY_RETRIEVE_FIND, study_query(None))
        .await
        .unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].status, status::REFUSED_NOT_AUTHORIZED);
    assert_eq!(
        responses[0].error_comment.as_deref(),
        Some("User \"store\" is not allowed to Query")
    );

    scu.release().await.unwrap();
    stop(running).await;
}

#[tokio::test]
async fn test_get_over_association() {
    let (_fixture, running) = sample_server().await;
    let mut scu = connect(
        running.port,
        user("retrieve"),
        &[
            uids::PATIENT_ROOT_QUERY_RETRIEVE_GET,
            uids::MR_IMAGE_STORAGE,
            uids::CT_IMAGE_STORAGE,
        ],
    )
    .await
    .unwrap();

    let query = common::query(
        "STUDY",
        vec![(tags::STUDY_INSTANCE_UID, Element::strings(VR::UI, ["2.2"]))],
    );
    let outcome = scu
        .get(uids::PATIENT_ROOT_QUERY_RETRIEVE_GET, query)
        .await
        .unwrap();

    let mut received: Vec<_> = outcome
        .received
        .iter()
        .map(|d| d.as_string(tags::SOP_INSTANCE_UID, 0).unwrap().to_string())
        .collect();
    received.sort();
    assert_eq!(received, vec!["2.2.1.1", "2.2.2.1", "2.2.2.2"]);
    assert!(outcome
        .received
        .iter()
        .all(|d| d.has(tags::PIXEL_DATA) && d.has(common::PRIVATE_TAG)));

    let last = outcome.responses.last().unwrap();
    assert_eq!(last.status, status::SUCCESS);
    let counts = last.sub_operations.unwrap();
    assert_eq!((counts.completed, counts.failed, counts.remaining), (3, 0, 0));
    assert_eq!(outcome.responses.len(), 3);

    scu.release().await.unwrap();
    stop(running).await;
}

#[tokio::test]
async fn test_store_over_association() {
    let fixture = common::empty_archive(Default::default());
    fixture
        .archive
        .acl()
        .set_entries(&common::acl_entries())
        .await
        .unwrap();
    let running = start_server(
        fixture.archive.clone(),
        Arc::new(AuthenticatorNone),
        common::AE_TITLE,
    )
    .await;

    let mut scu = connect(running.port, user("store"), &[uids::MR_IMAGE_STORAGE])
        .await
        .unwrap();
    let instance = common::instance(1, 1, 1, 1);
    assert_eq!(scu.store(instance.clone()).await.unwrap().status, status::SUCCESS);
    // Already stored
    assert_eq!(scu.store(instance.clone()).await.unwrap().status, status::SUCCESS);
    scu.release().await.unwrap();

    let stored = fixture.archive.storage().retrieve("1.1.1.1").await.unwrap();
    assert_eq!(stored, instance);

    let mut refused = connect(running.port, user("query"), &[uids::MR_IMAGE_STORAGE])
        .await
        .unwrap();
    let response = refused.store(common::instance(2, 1, 1, 1)).await.unwrap();
    assert_eq!(response.status, status::REFUSED_NOT_AUTHORIZED);
    refused.release().await.unwrap();
    assert!(!fixture.archive.storage().exists("2.1.1.1").await.unwrap());

    stop(running).await;
}

#[tokio::test]
async fn test_move_to_peer() {
    let (fixture, running) = sample_server().await;

    let viewer = common::empty_archive(Default::default());
    viewer
        .archive
        .acl()
        .set_entries(&[AccessControlEntry::unrestricted("", services::STORE)])
        .await
        .unwrap();
    let viewer_running =
        start_server(viewer.archive.clone(), Arc::new(AuthenticatorNone), "VIEWER").await;

    fixture
        .archive
        .peers()
        .add(&ApplicationEntity::new(
            "VIEWER",
            "127.0.0.1",
            viewer_running.port,
        ))
        .await
        .unwrap();

    let mut scu = connect(running.port, user("retrieve"), &QUERY_RETRIEVE)
        .await
        .unwrap();
    let query = common::query(
        "PATIENT",
        vec![(tags::PATIENT_ID, Element::strings(VR::LO, ["2"]))],
    );
    let responses = scu
        .move_to(uids::PATIENT_ROOT_QUERY_RETRIEVE_MOVE, "VIEWER", query)
        .await
        .unwrap();
    let last = responses.last().unwrap();
    assert_eq!(last.status, status::SUCCESS);
    assert_eq!(last.sub_operations.unwrap().completed, 4);

    let unknown = scu
        .move_to(
            uids::PATIENT_ROOT_QUERY_RETRIEVE_MOVE,
            "NOWHERE",
            common::query("PATIENT", vec![]),
        )
        .await
        .unwrap();
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].status, status::MOVE_DESTINATION_UNKNOWN);
    scu.release().await.unwrap();

    for uid in ["2.1.1.1", "2.2.1.1", "2.2.2.1", "2.2.2.2"] {
        let moved = viewer.archive.storage().retrieve(uid).await.unwrap();
        assert_eq!(moved.as_string(tags::SOP_INSTANCE_UID, 0), Some(uid));
    }
    assert!(!viewer.archive.storage().exists("1.1.1.1").await.unwrap());

    stop(viewer_running).await;
    stop(running).await;
}

#[tokio::test]
async fn test_remote_shutdown() {
    let (_fixture, running) = sample_server().await;

    let scu = connect(running.port, user("all"), &[uids::ARCHIVE_SHUTDOWN])
        .await
        .unwrap();
    let accepted = scu
        .association()
        .parameters()
        .accepted_context(uids::ARCHIVE_SHUTDOWN)
        .is_some();
    assert!(accepted);

    let result = tokio::time::timeout(Duration::from_secs(5), running.task)
        .await
        .expect("server stops")
        .expect("server task");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_remote_shutdown_disabled() {
    let fixture = common::sample_archive().await;
    let config = dimse::DimseConfig {
        local_aet: common::AE_TITLE.into(),
        bind_addr: "127.0.0.1".parse().unwrap(),
        port: 0,
        allow_remote_shutdown: false,
        ..Default::default()
    };
    let server = Arc::new(
        pacs_archive::server::Server::bind(config, fixture.archive.clone(), Arc::new(AuthenticatorNone))
            .await
            .unwrap(),
    );
    let port = server.local_addr().unwrap().port();
    let task = tokio::spawn({
        let server = server.clone();
        async move { server.run().await }
    });

    let scu = connect(
        port,
        user("all"),
        &[uids::ARCHIVE_SHUTDOWN, uids::VERIFICATION],
    )
    .await
    .unwrap();
    let parameters = scu.association().parameters();
    assert!(parameters.accepted_context(uids::ARCHIVE_SHUTDOWN).is_none());
    assert!(parameters.accepted_context(uids::VERIFICATION).is_some());
    scu.release().await.unwrap();

    // Still serving
    let mut scu = connect(port, user("echo"), &[uids::VERIFICATION])
        .await
        .unwrap();
    assert_eq!(scu.echo().await.unwrap(), status::SUCCESS);
    scu.release().await.unwrap();

    server.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("server stops")
        .expect("server task");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_shutdown_interrupts_idle_association() {
    let (_fixture, running) = sample_server().await;

    let mut scu = connect(running.port, user("echo"), &[uids::VERIFICATION])
        .await
        .unwrap();
    assert_eq!(scu.echo().await.unwrap(), status::SUCCESS);

    running.server.shutdown();
    let result = tokio::time::timeout(Duration::from_secs(5), running.task)
        .await
        .expect("server stops")
        .expect("server task");
    assert!(result.is_ok());

    // The server aborted our association
    let error = scu.echo().await.unwrap_err();
    assert!(matches!(
        error,
        DimseError::AssociationAborted | DimseError::Network(_)
    ));
}
