use serde::Deserialize;

/// One entry of the bucket listing served at the backend root.
#[derive(Debug, Clone, Deserialize)]
pub struct BucketSummary {
    pub bucket_name: String,
    pub size: u64,
    pub status: BucketStatus,
}

/// Processing state the analyzer left a bucket in.
///
/// Unrecognized wire values fold into `Other` so a new backend state
/// never breaks decoding of the whole list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum BucketStatus {
    Done,
    Manual,
    Other,
}

impl From<String> for BucketStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "done" => BucketStatus::Done,
            "manual" => BucketStatus::Manual,
            _ => BucketStatus::Other,
        }
    }
}

impl BucketStatus {
    /// Only buckets in these states appear in the navigation list.
    pub fn is_surfaced(self) -> bool {
        matches!(self, BucketStatus::Done | BucketStatus::Manual)
    }
}

/// One folder inside a bucket's breakdown. Empty `children` means leaf.
///
/// `id` is assigned by the backend and unique among siblings; `size` is
/// the aggregate of the whole subtree, already computed server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct Folder {
    pub id: u64,
    pub name: String,
    pub size: u64,
    #[serde(default)]
    pub children: Vec<Folder>,
}

/// Full snapshot for one bucket: total size, capture time, provenance
/// and the folder forest at depth 0.
#[derive(Debug, Clone, Deserialize)]
pub struct BucketDetail {
    pub size: u64,
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub folders: Vec<Folder>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_summary_list() {
        let json = r#"[
            {"bucket_name": "logs", "size": 100, "status": "done"},
            {"bucket_name": "backups", "size": 50, "status": "manual"},
            {"bucket_name": "tmp", "size": 10, "status": "pending"}
        ]"#;
        let list: Vec<BucketSummary> = serde_json::from_str(json).unwrap();

        assert_eq!(list.len(), 3);
        assert_eq!(list[0].bucket_name, "logs");
        assert_eq!(list[0].status, BucketStatus::Done);
        assert_eq!(list[1].status, BucketStatus::Manual);
        assert_eq!(list[2].status, BucketStatus::Other);
    }

    #[test]
    fn test_unknown_statuses_fold_to_other() {
        for raw in ["excluded", "failed", "running", ""] {
            let status = BucketStatus::from(raw.to_string());
            assert_eq!(status, BucketStatus::Other);
            assert!(!status.is_surfaced());
        }
        assert!(BucketStatus::Done.is_surfaced());
        assert!(BucketStatus::Manual.is_surfaced());
    }

    #[test]
    fn test_decode_detail_with_nested_folders() {
        let json = r#"{
            "size": 300,
            "datetime": "2024-05-01 03:12:09",
            "manual": false,
            "folders": [
                {"id": 7, "name": "media", "size": 200, "children": [
                    {"id": 3, "name": "raw", "size": 150, "children": []}
                ]},
                {"id": 9, "name": "docs", "size": 100, "children": []}
            ]
        }"#;
        let detail: BucketDetail = serde_json::from_str(json).unwrap();

        assert_eq!(detail.size, 300);
        assert_eq!(detail.datetime, "2024-05-01 03:12:09");
        assert!(!detail.manual);
        assert_eq!(detail.folders.len(), 2);
        assert_eq!(detail.folders[0].children[0].name, "raw");
        assert!(detail.folders[1].children.is_empty());
    }

    #[test]
    fn test_decode_detail_missing_optional_fields() {
        // Leaf folders may omit children entirely; older snapshots lack
        // datetime and manual.
        let json = r#"{"size": 5, "folders": [{"id": 1, "name": "a", "size": 5}]}"#;
        let detail: BucketDetail = serde_json::from_str(json).unwrap();

        assert_eq!(detail.datetime, "");
        assert!(!detail.manual);
        assert!(detail.folders[0].children.is_empty());
    }
}
