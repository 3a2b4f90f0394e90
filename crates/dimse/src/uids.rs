//! Well-known UIDs

pub const VERIFICATION: &str = "1.2.840.10008.1.1";

pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";

pub const PATIENT_ROOT_QUERY_RETRIEVE_FIND: &str = "1.2.840.10008.5.1.4.1.2.1.1";
pub const PATIENT_ROOT_QUERY_RETRIEVE_MOVE: &str = "1.2.840.10008.5.1.4.1.2.1.2";
pub const PATIENT_ROOT_QUERY_RETRIEVE_GET: &str = "1.2.840.10008.5.1.4.1.2.1.3";
pub const STUDY_ROOT_QUERY_RETRIEVE_FIND: &str = "1.2.840.10008.5.1.4.1.2.2.1";
pub const STUDY_ROOT_QUERY_RETRIEVE_MOVE: &str = "1.2.840.10008.5.1.4.1.2.2.2";
pub const STUDY_ROOT_QUERY_RETRIEVE_GET: &str = "1.2.840.10008.5.1.4.1.2.2.3";

pub const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";
pub const MR_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.4";
pub const SECONDARY_CAPTURE_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.7";

/// Private abstract syntax asking the archive to stop accepting associations
pub const ARCHIVE_SHUTDOWN: &str = "1.3.6.1.4.1.59843.1.1.1";

/// Transfer syntaxes offered on outgoing sub-associations, in order of preference
pub const DEFAULT_TRANSFER_SYNTAXES: [&str; 2] =
    [EXPLICIT_VR_LITTLE_ENDIAN, IMPLICIT_VR_LITTLE_ENDIAN];
