use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::item::Item;

/// The kind of mutation a change record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Created,
    Updated,
    Deleted,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Created => "created",
            OperationType::Updated => "updated",
            OperationType::Deleted => "deleted",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(OperationType::Created),
            "updated" => Ok(OperationType::Updated),
            "deleted" => Ok(OperationType::Deleted),
            _ => Err(format!(
                "Invalid operation type '{}'. Valid options: created, updated, deleted",
                s
            )),
        }
    }
}

/// An immutable entry of the change log.
///
/// `item_snapshot` is a value copy of the item: the state after the change for
/// `created`/`updated`, the last known state for `deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChange {
    pub id: i64,
    pub user_id: String,
    pub date: String,
    pub operation_type: OperationType,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_snapshot: Option<Item>,
    #[serde(default)]
    pub metadata: Vec<String>,
}

/// A change record that has not been appended yet.
#[derive(Debug, Clone, Copy)]
pub struct NewItemChange<'a> {
    pub user_id: &'a str,
    pub date: &'a str,
    pub operation_type: OperationType,
    pub item_snapshot: Option<&'a Item>,
    pub metadata: &'a [String],
}

impl fmt::Display for ItemChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} at {}",
            self.id,
            self.operation_type,
            self.date,
            self.timestamp.to_rfc3339()
        )?;
        if let Some(snapshot) = &self.item_snapshot {
            if !snapshot.title.is_empty() {
                write!(f, " \"{}\"", snapshot.title)?;
            }
        }
        if !self.metadata.is_empty() {
            write!(f, " [{}]", self.metadata.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_change() -> ItemChange {
        ItemChange {
            id: 123,
            user_id: "test-user".to_string(),
            date: "2024-01-15".to_string(),
            operation_type: OperationType::Created,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap(),
            item_snapshot: Some(
                Item::new("2024-01-15", "Test Entry")
                    .with_body("This is a test diary entry")
                    .with_tags(vec!["personal".into(), "test".into()]),
            ),
            metadata: vec!["mobile-app".into(), "v1.0.0".into()],
        }
    }

    #[test]
    fn test_operation_type_strings() {
        assert_eq!(OperationType::Created.to_string(), "created");
        assert_eq!(OperationType::Updated.to_string(), "updated");
        assert_eq!(OperationType::Deleted.to_string(), "deleted");
        assert_eq!(
            "deleted".parse::<OperationType>().unwrap(),
            OperationType::Deleted
        );
        assert!("removed".parse::<OperationType>().is_err());
    }

    #[test]
    fn test_change_json_shape() {
        let json = serde_json::to_value(sample_change()).unwrap();
        assert_eq!(json["id"], 123);
        assert_eq!(json["userId"], "test-user");
        assert_eq!(json["operationType"], "created");
        assert_eq!(json["itemSnapshot"]["title"], "Test Entry");
        assert_eq!(json["metadata"][0], "mobile-app");
    }

    #[test]
    fn test_change_without_snapshot_omits_field() {
        let mut change = sample_change();
        change.item_snapshot = None;
        change.metadata.clear();
        let json = serde_json::to_value(change).unwrap();
        assert!(json.get("itemSnapshot").is_none());
        assert_eq!(json["metadata"], serde_json::json!([]));
    }
}
