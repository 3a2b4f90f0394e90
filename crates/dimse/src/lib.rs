//! DIMSE (DICOM Message Service Element) building blocks for the archive
//!
//! This crate provides the data set model and the association transport
//! that the archive server and its clients speak.
//!
//! # Features
//! - `DataSet` with DICOM JSON (PS3.18) conversion
//! - Request/response primitives for C-ECHO, C-FIND, C-GET, C-MOVE, C-STORE
//! - Association negotiation over length-delimited JSON frames
//! - Inbound listener (SCP) and outbound client (SCU)

pub mod association;
pub mod config;
pub mod dataset;
pub mod error;
pub mod message;
pub mod scp;
pub mod scu;
pub mod tags;
pub mod types;
pub mod uids;

// Re-export commonly used types
pub use association::{
    Association, AssociationParameters, PresentationContext, PresentationContextResult,
    UserIdentity,
};
pub use config::{DimseConfig, RemoteNode};
pub use dataset::{DataSet, Element, Value};
pub use error::{DimseError, Result};
pub use message::{Message, Request, Response, SubOperations};
pub use scp::AssociationListener;
pub use scu::DimseScu;
pub use types::{status, DimseCommand, Priority, QueryLevel};

/// DIMSE protocol version
pub const DIMSE_VERSION: &str = "0.1.0";

/// Default DICOM port (non-TLS)
pub const DEFAULT_DIMSE_PORT: u16 = 11112;
