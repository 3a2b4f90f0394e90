//! Sample archive shared by the integration tests
//!
//! Two patients, three studies, five instances:
//!
//! ```text
//! 1 ── 1.1 ── 1.1.1 (MR) ── 1.1.1.1
//! 2 ── 2.1 ── 2.1.1 (MR) ── 2.1.1.1
//!   └─ 2.2 ── 2.2.1 (MR) ── 2.2.1.1
//!         └── 2.2.2 (CT) ── 2.2.2.1, 2.2.2.2
//! ```
#![allow(dead_code)]

use std::sync::Arc;

use dicom_core::{Tag, VR};
use dimse::{
    tags, uids, AssociationParameters, DataSet, DimseConfig, DimseScu, Element, RemoteNode,
    UserIdentity,
};
use pacs_archive::acl::{services, AccessControlEntry};
use pacs_archive::archive::Archive;
use pacs_archive::authentication::Authenticator;
use pacs_archive::backend::{DocumentStore, MemoryStore};
use pacs_archive::config::DatabaseConfig;
use pacs_archive::server::Server;
use pacs_archive::storage::{BlobStore, MemoryBlobStore};
use serde_json::json;
use tokio::task::JoinHandle;

pub const AE_TITLE: &str = "ARCHIVE";

/// (patient, study, series, instance) of every sample instance
pub const INSTANCES: [(u8, u8, u8, u8); 5] = [
    (1, 1, 1, 1),
    (2, 1, 1, 1),
    (2, 2, 1, 1),
    (2, 2, 2, 1),
    (2, 2, 2, 2),
];

pub const PRIVATE_TAG: Tag = Tag(0x0009, 0x1001);

pub fn instance(patient: u8, study: u8, series: u8, number: u8) -> DataSet {
    let study_uid = format!("{}.{}", patient, study);
    let series_uid = format!("{}.{}", study_uid, series);
    let sop_instance_uid = format!("{}.{}", series_uid, number);
    let (modality, sop_class) = if series == 1 {
        ("MR", uids::MR_IMAGE_STORAGE)
    } else {
        ("CT", uids::CT_IMAGE_STORAGE)
    };

    DataSet::new()
        .with_strings(tags::PATIENT_ID, VR::LO, [patient.to_string()])
        .with_strings(tags::PATIENT_NAME, VR::PN, [format!("Patient {}", patient)])
        .with_strings(tags::STUDY_INSTANCE_UID, VR::UI, [study_uid])
        .with_strings(tags::STUDY_DATE, VR::DA, [format!("20160{}01", study)])
        .with_strings(tags::SERIES_INSTANCE_UID, VR::UI, [series_uid])
        .with_strings(tags::MODALITY, VR::CS, [modality])
        .with_strings(tags::SOP_CLASS_UID, VR::UI, [sop_class])
        .with_strings(tags::SOP_INSTANCE_UID, VR::UI, [sop_instance_uid])
        .with(tags::INSTANCE_NUMBER, Element::integers(VR::IS, [number as i64]))
        .with_strings(PRIVATE_TAG, VR::LO, ["private"])
        .with(
            tags::PIXEL_DATA,
            Element::binary(VR::OB, [vec![patient, study, series, number]]),
        )
}

pub fn sample_instances() -> Vec<DataSet> {
    INSTANCES
        .iter()
        .map(|&(p, st, se, i)| instance(p, st, se, i))
        .collect()
}

pub fn acl_entries() -> Vec<AccessControlEntry> {
    vec![
        AccessControlEntry::unrestricted("echo", services::ECHO),
        AccessControlEntry::unrestricted("store", services::STORE),
        AccessControlEntry::unrestricted("query", services::QUERY),
        AccessControlEntry::unrestricted("retrieve", services::RETRIEVE),
        AccessControlEntry::unrestricted("all", services::ANY),
        AccessControlEntry::new(
            "restricted_query",
            services::QUERY,
            json!({"00100010.Alphabetic": "Patient 1"}),
        ),
    ]
}

pub struct Fixture {
    pub archive: Archive,
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
}

/// Empty archive over in-memory backends
pub fn empty_archive(database: DatabaseConfig) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let archive = Archive::new(
        store.clone() as Arc<dyn DocumentStore>,
        blobs.clone() as Arc<dyn BlobStore>,
        &database,
        AE_TITLE,
    );
    Fixture {
        archive,
        store,
        blobs,
    }
}

/// Archive holding the sample instances and access control list
pub async fn sample_archive() -> Fixture {
    let fixture = empty_archive(DatabaseConfig::default());
    fixture
        .archive
        .acl()
        .set_entries(&acl_entries())
        .await
        .expect("acl");
    for data_set in sample_instances() {
        fixture
            .archive
            .storage()
            .store(&data_set)
            .await
            .expect("store sample");
    }
    fixture
}

/// Query data set at `level` with the given elements
pub fn query(level: &str, elements: Vec<(Tag, Element)>) -> DataSet {
    elements
        .into_iter()
        .fold(
            DataSet::new().with_strings(tags::QUERY_RETRIEVE_LEVEL, VR::CS, [level]),
            |query, (tag, element)| query.with(tag, element),
        )
}

pub struct RunningServer {
    pub server: Arc<Server>,
    pub task: JoinHandle<pacs_archive::error::Result<()>>,
    pub port: u16,
}

/// Serve `archive` on an ephemeral local port
pub async fn start_server(
    archive: Archive,
    authenticator: Arc<dyn Authenticator>,
    ae_title: &str,
) -> RunningServer {
    let config = DimseConfig {
        local_aet: ae_title.to_string(),
        bind_addr: "127.0.0.1".parse().unwrap(),
        port: 0,
        ..Default::default()
    };
    let server = Arc::new(
        Server::bind(config, archive, authenticator)
            .await
            .expect("bind server"),
    );
    let port = server.local_addr().unwrap().port();
    let task = tokio::spawn({
        let server = server.clone();
        async move { server.run().await }
    });
    RunningServer { server, task, port }
}

/// Association proposal for the given abstract syntaxes
pub fn proposal(identity: UserIdentity, abstract_syntaxes: &[&str]) -> AssociationParameters {
    abstract_syntaxes.iter().fold(
        AssociationParameters::new("TEST_SCU", AE_TITLE).with_user_identity(identity),
        |parameters, syntax| {
            parameters.with_presentation_context(*syntax, uids::DEFAULT_TRANSFER_SYNTAXES)
        },
    )
}

pub fn user(name: &str) -> UserIdentity {
    UserIdentity::Username {
        username: name.to_string(),
    }
}

pub async fn connect(
    port: u16,
    identity: UserIdentity,
    abstract_syntaxes: &[&str],
) -> dimse::Result<DimseScu> {
    let node = RemoteNode::new(AE_TITLE, "127.0.0.1", port).with_timeout(5_000);
    DimseScu::connect(&node, proposal(identity, abstract_syntaxes)).await
}
