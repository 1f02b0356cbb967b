//! Graph resource types, deserialized straight from API responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SharePoint identifiers attached to a drive or item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePointIds {
    pub site_id: Option<String>,
    pub list_id: Option<String>,
    pub web_id: Option<String>,
    pub site_url: Option<String>,
    pub list_item_id: Option<String>,
    pub list_item_unique_id: Option<String>,
}

/// A document library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Drive {
    pub id: Option<String>,
    pub name: Option<String>,
    pub drive_type: Option<String>,
    pub web_url: Option<String>,
    #[serde(rename = "sharePointIds")]
    pub share_point_ids: Option<SharePointIds>,
}

impl Drive {
    /// SharePoint site id, if the drive carries one.
    pub fn site_id(&self) -> Option<&str> {
        self.share_point_ids
            .as_ref()
            .and_then(|ids| ids.site_id.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// SharePoint list id, if the drive carries one.
    pub fn list_id(&self) -> Option<&str> {
        self.share_point_ids
            .as_ref()
            .and_then(|ids| ids.list_id.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// A SharePoint site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: Option<String>,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub web_url: Option<String>,
}

/// A list item with its column values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub id: Option<String>,
    pub web_url: Option<String>,
    pub created_date_time: Option<DateTime<Utc>>,
    pub last_modified_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ListItem {
    /// String value of a column, if present.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }
}

/// A directory user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<String>,
    pub user_principal_name: Option<String>,
    pub display_name: Option<String>,
    pub mail: Option<String>,
}

/// An online meeting as seen by its organizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineMeeting {
    pub id: Option<String>,
    pub subject: Option<String>,
    pub start_date_time: Option<DateTime<Utc>>,
    pub end_date_time: Option<DateTime<Utc>>,
    pub join_web_url: Option<String>,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_drive_ids() {
        let drive: Drive = serde_json::from_value(serde_json::json!({
            "id": "b!abc",
            "sharePointIds": {"siteId": "site-1", "listId": "list-1"}
        }))
        .unwrap();

        assert_eq!(drive.site_id(), Some("site-1"));
        assert_eq!(drive.list_id(), Some("list-1"));
    }

    #[test]
    fn test_drive_empty_ids_are_missing() {
        let drive: Drive = serde_json::from_value(serde_json::json!({
            "id": "b!abc",
            "sharePointIds": {"siteId": "", "listId": null}
        }))
        .unwrap();

        assert_eq!(drive.site_id(), None);
        assert_eq!(drive.list_id(), None);

        let bare = Drive::default();
        assert_eq!(bare.site_id(), None);
    }

    #[test]
    fn test_list_item_fields() {
        let item: ListItem = serde_json::from_value(serde_json::json!({
            "id": "12",
            "webUrl": "https://contoso.sharepoint.com/sites/team/Shared%20Documents/a.docx",
            "lastModifiedDateTime": "2024-02-01T10:00:00Z",
            "fields": {"FileLeafRef": "a.docx", "FileSizeDisplay": 1024}
        }))
        .unwrap();

        assert_eq!(item.field_str("FileLeafRef"), Some("a.docx"));
        assert_eq!(item.field_str("FileSizeDisplay"), None);
        assert!(item.last_modified_date_time.is_some());
    }

    #[test]
    fn test_meeting_with_fractional_seconds() {
        let meeting: OnlineMeeting = serde_json::from_value(serde_json::json!({
            "id": "MSo1",
            "subject": "Weekly sync",
            "startDateTime": "2024-02-01T10:00:00.0000000Z",
            "endDateTime": "2024-02-01T10:30:00.0000000Z"
        }))
        .unwrap();

        assert_eq!(meeting.subject.as_deref(), Some("Weekly sync"));
        assert!(meeting.start_date_time.unwrap() < meeting.end_date_time.unwrap());
    }
}
