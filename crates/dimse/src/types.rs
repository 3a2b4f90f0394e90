//! Common types for DIMSE operations

use serde::{Deserialize, Serialize};

/// DIMSE command types served by the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DimseCommand {
    /// C-ECHO
    Echo,
    /// C-FIND
    Find,
    /// C-GET
    Get,
    /// C-MOVE
    Move,
    /// C-STORE
    Store,
}

impl DimseCommand {
    /// Every command, in command-field order
    pub const ALL: [DimseCommand; 5] = [
        DimseCommand::Store,
        DimseCommand::Get,
        DimseCommand::Find,
        DimseCommand::Move,
        DimseCommand::Echo,
    ];

    /// Command Field (0000,0100) value of the request primitive
    pub fn request_code(self) -> u16 {
        match self {
            DimseCommand::Store => 0x0001,
            DimseCommand::Get => 0x0010,
            DimseCommand::Find => 0x0020,
            DimseCommand::Move => 0x0021,
            DimseCommand::Echo => 0x0030,
        }
    }

    /// Command Field value of the response primitive
    pub fn response_code(self) -> u16 {
        self.request_code() | 0x8000
    }

    /// Look a command up by its request Command Field
    pub fn from_request_code(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.request_code() == code)
    }
}

impl std::fmt::Display for DimseCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DimseCommand::Echo => write!(f, "C-ECHO"),
            DimseCommand::Find => write!(f, "C-FIND"),
            DimseCommand::Get => write!(f, "C-GET"),
            DimseCommand::Move => write!(f, "C-MOVE"),
            DimseCommand::Store => write!(f, "C-STORE"),
        }
    }
}

/// DICOM query/retrieve levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryLevel {
    /// Patient level
    Patient,
    /// Study level
    Study,
    /// Series level
    Series,
    /// Image level
    Image,
}

/// Priority of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Status codes carried by DIMSE responses
pub mod status {
    pub const SUCCESS: u16 = 0x0000;
    pub const PENDING: u16 = 0xFF00;
    pub const CANCEL: u16 = 0xFE00;

    pub const PROCESSING_FAILURE: u16 = 0x0110;
    pub const INVALID_OBJECT_INSTANCE: u16 = 0x0117;
    pub const MISSING_ATTRIBUTE: u16 = 0x0120;
    pub const REFUSED_NOT_AUTHORIZED: u16 = 0x0124;

    pub const OUT_OF_RESOURCES: u16 = 0xA700;
    pub const MOVE_DESTINATION_UNKNOWN: u16 = 0xA801;
    pub const SUB_OPERATIONS_COMPLETE_WITH_FAILURES: u16 = 0xB000;
    pub const CANNOT_UNDERSTAND: u16 = 0xC000;
    pub const UNABLE_TO_PROCESS: u16 = 0xC001;

    /// Pending statuses announce more responses to come
    pub fn is_pending(status: u16) -> bool {
        status == PENDING || status == 0xFF01
    }

    pub fn is_success(status: u16) -> bool {
        status == SUCCESS
    }

    pub fn is_warning(status: u16) -> bool {
        status == 0x0001 || (0xB000..=0xBFFF).contains(&status)
    }
}

impl std::fmt::Display for QueryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryLevel::Patient => write!(f, "PATIENT"),
            QueryLevel::Study => write!(f, "STUDY"),
            QueryLevel::Series => write!(f, "SERIES"),
            QueryLevel::Image => write!(f, "IMAGE"),
        }
    }
}

impl std::str::FromStr for QueryLevel {
    type Err = crate::error::DimseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PATIENT" => Ok(QueryLevel::Patient),
            "STUDY" => Ok(QueryLevel::Study),
            "SERIES" => Ok(QueryLevel::Series),
            "IMAGE" => Ok(QueryLevel::Image),
            _ => Err(crate::error::DimseError::data_set(format!(
                "Invalid query level: {}",
                s
            ))),
        }
    }
}
