//! Persisted record models.
//!
//! These models represent the structure of the JSON blobs written to local
//! storage and handed to export generators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One captured photo, as persisted in a location's photo blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: String,
    /// `data:<mime>;base64,<payload>`
    pub data: String,
    pub filename: String,
    /// ISO-8601 capture time
    pub timestamp: String,
    /// Original file size in bytes
    pub size: u64,
}

/// Field store summary for the save indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatus {
    pub has_data: bool,
    pub last_saved: Option<DateTime<Utc>>,
    /// Length of the serialized field blob
    pub data_size: usize,
}

/// Photo requirement check for one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementStatus {
    pub met: bool,
    pub count: usize,
    pub required: usize,
    pub remaining: usize,
}

/// Everything the export generators consume for one form instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub project_id: String,
    pub variant: String,
    pub fields: Map<String, Value>,
    pub photos: BTreeMap<String, Vec<PhotoRecord>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_record_json_shape() {
        let record = PhotoRecord {
            id: "photo_1_abc".to_string(),
            data: "data:image/png;base64,AA==".to_string(),
            filename: "nose.png".to_string(),
            timestamp: "2026-01-29T00:00:00.000Z".to_string(),
            size: 1,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["filename"], "nose.png");
        assert_eq!(json["size"], 1);
    }

    #[test]
    fn test_save_status_camel_case() {
        let status = SaveStatus {
            has_data: true,
            last_saved: None,
            data_size: 2,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["hasData"], true);
        assert_eq!(json["dataSize"], 2);
    }
}
