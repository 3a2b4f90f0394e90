//! Conversion between `dicom-object` in-memory objects, Part 10 files and
//! archive [`DataSet`]s, going through DICOM JSON.

use std::path::Path;

use dicom_object::mem::InMemDicomObject;
use dimse::DataSet;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("DICOM JSON conversion error: {0}")]
    Json(String),

    #[error("Data set error: {0}")]
    DataSet(#[from] dimse::DimseError),

    #[error("Part 10 file error: {0}")]
    File(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

pub fn object_to_json_value(obj: &InMemDicomObject) -> Result<Value> {
    dicom_json::to_value(obj).map_err(|e| ConvertError::Json(format!("{}", e)))
}

pub fn json_value_to_object(v: &Value) -> Result<InMemDicomObject> {
    dicom_json::from_value(v.clone()).map_err(|e| ConvertError::Json(format!("{}", e)))
}

/// Convert a `dicom-object` data set into an archive data set
pub fn object_to_dataset(obj: &InMemDicomObject) -> Result<DataSet> {
    let json = object_to_json_value(obj)?;
    Ok(DataSet::from_json(&json)?)
}

/// Convert an archive data set into a `dicom-object` data set
pub fn dataset_to_object(data_set: &DataSet) -> Result<InMemDicomObject> {
    json_value_to_object(&data_set.to_json())
}

/// Read a Part 10 file; the file meta group is not part of the result
pub fn read_part10(path: &Path) -> Result<DataSet> {
    let file_obj = dicom_object::open_file(path)
        .map_err(|e| ConvertError::File(format!("{}: {}", path.display(), e)))?;
    let obj: InMemDicomObject = file_obj.into_inner();
    object_to_dataset(&obj)
}

/// Write a data set as a Part 10 file with Explicit VR Little Endian
pub fn write_part10(path: &Path, data_set: &DataSet) -> Result<()> {
    use dicom_dictionary_std::uids;
    use dicom_object::meta::FileMetaTableBuilder;

    let obj = dataset_to_object(data_set)?;

    let ms_sop_class = data_set
        .as_string(dimse::tags::SOP_CLASS_UID, 0)
        .map(|s| s.to_string())
        .unwrap_or_else(|| uids::SECONDARY_CAPTURE_IMAGE_STORAGE.into());
    let ms_sop_instance = data_set
        .as_string(dimse::tags::SOP_INSTANCE_UID, 0)
        .unwrap_or("")
        .to_string();

    let file_obj = obj
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(ms_sop_class.as_str())
                .media_storage_sop_instance_uid(ms_sop_instance.as_str()),
        )
        .map_err(|e| ConvertError::File(e.to_string()))?;

    file_obj
        .write_to_file(path)
        .map_err(|e| ConvertError::File(e.to_string()))
}
