//! DIMSE request and response messages

use serde::{Deserialize, Serialize};

use crate::dataset::DataSet;
use crate::types::{status, DimseCommand, Priority};
use crate::uids;

/// A DIMSE request primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub command: DimseCommand,
    pub message_id: u16,
    pub affected_sop_class_uid: String,
    #[serde(default)]
    pub affected_sop_instance_uid: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    /// Move Destination (0000,0600), C-MOVE only
    #[serde(default)]
    pub move_destination: Option<String>,
    /// Identifier (C-FIND, C-GET, C-MOVE) or stored instance (C-STORE)
    #[serde(default)]
    pub data_set: Option<DataSet>,
}

impl Request {
    fn new(command: DimseCommand, message_id: u16, sop_class: impl Into<String>) -> Self {
        Self {
            command,
            message_id,
            affected_sop_class_uid: sop_class.into(),
            affected_sop_instance_uid: None,
            priority: Priority::default(),
            move_destination: None,
            data_set: None,
        }
    }

    /// Create a C-ECHO request
    pub fn echo(message_id: u16) -> Self {
        Self::new(DimseCommand::Echo, message_id, uids::VERIFICATION)
    }

    /// Create a C-FIND request
    pub fn find(message_id: u16, sop_class: impl Into<String>, query: DataSet) -> Self {
        let mut request = Self::new(DimseCommand::Find, message_id, sop_class);
        request.data_set = Some(query);
        request
    }

    /// Create a C-GET request
    pub fn get(message_id: u16, sop_class: impl Into<String>, query: DataSet) -> Self {
        let mut request = Self::new(DimseCommand::Get, message_id, sop_class);
        request.data_set = Some(query);
        request
    }

    /// Create a C-MOVE request
    pub fn move_to(
        message_id: u16,
        sop_class: impl Into<String>,
        destination: impl Into<String>,
        query: DataSet,
    ) -> Self {
        let mut request = Self::new(DimseCommand::Move, message_id, sop_class);
        request.move_destination = Some(destination.into());
        request.data_set = Some(query);
        request
    }

    /// Create a C-STORE request
    pub fn store(
        message_id: u16,
        sop_class: impl Into<String>,
        sop_instance: impl Into<String>,
        data_set: DataSet,
    ) -> Self {
        let mut request = Self::new(DimseCommand::Store, message_id, sop_class);
        request.affected_sop_instance_uid = Some(sop_instance.into());
        request.data_set = Some(data_set);
        request
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Sub-operation counters of C-GET and C-MOVE responses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubOperations {
    pub remaining: u32,
    pub completed: u32,
    pub failed: u32,
    pub warning: u32,
}

/// A DIMSE response primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub command: DimseCommand,
    pub message_id_being_responded_to: u16,
    pub affected_sop_class_uid: String,
    #[serde(default)]
    pub affected_sop_instance_uid: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub error_comment: Option<String>,
    #[serde(default)]
    pub sub_operations: Option<SubOperations>,
    #[serde(default)]
    pub data_set: Option<DataSet>,
}

impl Response {
    /// A response to `request` with the given status
    pub fn to(request: &Request, status: u16) -> Self {
        Self {
            command: request.command,
            message_id_being_responded_to: request.message_id,
            affected_sop_class_uid: request.affected_sop_class_uid.clone(),
            affected_sop_instance_uid: request.affected_sop_instance_uid.clone(),
            status,
            error_comment: None,
            sub_operations: None,
            data_set: None,
        }
    }

    pub fn with_data_set(mut self, data_set: DataSet) -> Self {
        self.data_set = Some(data_set);
        self
    }

    pub fn with_error_comment(mut self, comment: impl Into<String>) -> Self {
        self.error_comment = Some(comment.into());
        self
    }

    pub fn with_sub_operations(mut self, sub_operations: SubOperations) -> Self {
        self.sub_operations = Some(sub_operations);
        self
    }

    pub fn is_pending(&self) -> bool {
        status::is_pending(self.status)
    }
}

/// Any message exchanged on an established association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body")]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Message::Request(request)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Message::Response(response)
    }
}
