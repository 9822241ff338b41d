use std::str::FromStr as _;

use fractic_server_error::ServerError;

use crate::{data::models::timestamp_model::TimestampModel, entities::CacheSyncMetadata};

/// Wire format of the metadata object stored next to the cache database.
#[derive(Debug, serde_derive::Serialize, serde_derive::Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CacheSyncMetadataModel {
    pub version: u64,
    pub last_sync: String,
    pub last_modified: String,
    pub file_size: u64,
}

impl From<&CacheSyncMetadata> for CacheSyncMetadataModel {
    fn from(metadata: &CacheSyncMetadata) -> Self {
        Self {
            version: metadata.version,
            last_sync: metadata.last_sync.to_rfc3339(),
            last_modified: metadata.last_modified.to_rfc3339(),
            file_size: metadata.file_size,
        }
    }
}

impl TryFrom<CacheSyncMetadataModel> for CacheSyncMetadata {
    type Error = ServerError;
    fn try_from(model: CacheSyncMetadataModel) -> Result<Self, Self::Error> {
        Ok(CacheSyncMetadata {
            version: model.version,
            last_sync: TimestampModel::from_str(&model.last_sync)?.into(),
            last_modified: TimestampModel::from_str(&model.last_modified)?.into(),
            file_size: model.file_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_uses_camel_case_keys() {
        let json = r#"{"version":3,"lastSync":"2025-03-14T10:00:00+00:00","lastModified":"2025-03-14T09:59:00Z","fileSize":8192}"#;
        let model: CacheSyncMetadataModel = serde_json::from_str(json).unwrap();
        let metadata = CacheSyncMetadata::try_from(model).unwrap();
        assert_eq!(metadata.version, 3);
        assert_eq!(metadata.file_size, 8192);

        let written =
            serde_json::to_value(CacheSyncMetadataModel::from(&metadata)).unwrap();
        for key in ["version", "lastSync", "lastModified", "fileSize"] {
            assert!(written.get(key).is_some(), "missing key {}", key);
        }
    }

    #[test]
    fn invalid_timestamp_is_rejected() {
        let model = CacheSyncMetadataModel {
            version: 1,
            last_sync: "yesterday".into(),
            last_modified: "2025-03-14T09:59:00Z".into(),
            file_size: 0,
        };
        assert!(CacheSyncMetadata::try_from(model).is_err());
    }
}
