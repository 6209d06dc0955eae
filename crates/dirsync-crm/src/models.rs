//! Insightly v2.1 record types.
//!
//! Field names follow the API's upper-snake JSON. Every record keeps the
//! fields it does not model in `extra`, so a read-modify-write `PUT` sends
//! back what it received.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Custom field id carrying the contact's hidden flag.
pub const HIDDEN_CONTACT_FIELD: &str = "CONTACT_FIELD_1";

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Project lifecycle status as the CRM names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Deferred")]
    Deferred,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Abandoned")]
    Abandoned,
    #[serde(rename = "Cancelled")]
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::NotStarted => "Not Started",
            ProjectStatus::InProgress => "In Progress",
            ProjectStatus::Deferred => "Deferred",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Abandoned => "Abandoned",
            ProjectStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A custom field value on a project or contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct CustomField {
    pub custom_field_id: String,
    #[serde(default)]
    pub field_value: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CustomField {
    /// Value rendered as text; booleans become `True`/`False`.
    pub fn value_text(&self) -> Option<String> {
        match &self.field_value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(true) => Some("True".to_string()),
            Value::Bool(false) => Some("False".to_string()),
            other => Some(other.to_string()),
        }
    }
}

/// A project link: either a contact with a role or another project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second_project_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Link {
    pub fn contact(contact_id: i64) -> Self {
        Self {
            contact_id: Some(contact_id),
            ..Self::default()
        }
    }

    pub fn project(second_project_id: i64) -> Self {
        Self {
            second_project_id: Some(second_project_id),
            ..Self::default()
        }
    }
}

/// A CRM project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Project {
    pub project_id: i64,
    #[serde(default)]
    pub project_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub customfields: Vec<CustomField>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Project {
    /// Whether the project's status equals `status`.
    pub fn has_status(&self, status: ProjectStatus) -> bool {
        self.status.as_deref() == Some(status.as_str())
    }

    /// Ids of projects linked from this one.
    pub fn linked_project_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.links.iter().filter_map(|l| l.second_project_id)
    }
}

/// Payload for creating a project.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct NewProject {
    pub project_name: String,
    pub status: String,
    pub category_id: i64,
    pub customfields: Vec<CustomField>,
    pub links: Vec<Link>,
}

/// Email, phone or other contact detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct ContactInfo {
    #[serde(rename = "TYPE")]
    pub kind: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A CRM contact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Contact {
    pub contact_id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contactinfos: Vec<ContactInfo>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub customfields: Vec<CustomField>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Contact {
    fn details(&self, kind: &str) -> Vec<String> {
        self.contactinfos
            .iter()
            .filter(|i| i.kind.eq_ignore_ascii_case(kind))
            .filter_map(|i| i.detail.clone())
            .filter(|d| !d.trim().is_empty())
            .collect()
    }

    pub fn emails(&self) -> Vec<String> {
        self.details("EMAIL")
    }

    pub fn phones(&self) -> Vec<String> {
        self.details("PHONE")
    }

    /// Text value of a custom field.
    pub fn custom_field(&self, id: &str) -> Option<String> {
        self.customfields
            .iter()
            .find(|f| f.custom_field_id == id)
            .and_then(CustomField::value_text)
    }

    /// Whether the contact is flagged hidden.
    pub fn is_hidden(&self) -> bool {
        self.custom_field(HIDDEN_CONTACT_FIELD).as_deref() == Some("True")
    }

    pub fn new(contact_id: i64, first_name: &str, last_name: &str) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            contact_id,
            first_name: non_empty(first_name),
            last_name: non_empty(last_name),
            ..Self::default()
        }
    }

    pub fn with_info(mut self, kind: &str, detail: &str) -> Self {
        self.contactinfos.push(ContactInfo {
            kind: kind.to_string(),
            detail: Some(detail.to_string()),
            extra: Map::new(),
        });
        self
    }

    pub fn with_email(self, email: &str) -> Self {
        self.with_info("EMAIL", email)
    }

    pub fn hidden(mut self) -> Self {
        self.customfields.push(CustomField {
            custom_field_id: HIDDEN_CONTACT_FIELD.to_string(),
            field_value: Value::Bool(true),
            extra: Map::new(),
        });
        self
    }
}

/// A project category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Category {
    pub category_id: i64,
    pub category_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Category {
    pub fn new(category_id: i64, category_name: &str) -> Self {
        Self {
            category_id,
            category_name: category_name.to_string(),
            extra: Map::new(),
        }
    }
}

/// A pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Pipeline {
    pub pipeline_id: i64,
    pub pipeline_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Pipeline {
    pub fn new(pipeline_id: i64, pipeline_name: &str) -> Self {
        Self {
            pipeline_id,
            pipeline_name: pipeline_name.to_string(),
            extra: Map::new(),
        }
    }
}

/// One ordered stage of a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PipelineStage {
    pub stage_id: i64,
    pub pipeline_id: i64,
    #[serde(default)]
    pub stage_name: Option<String>,
    pub stage_order: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PipelineStage {
    pub fn new(stage_id: i64, pipeline_id: i64, stage_order: i64) -> Self {
        Self {
            stage_id,
            pipeline_id,
            stage_name: None,
            stage_order,
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_round_trip_keeps_unknown_fields() {
        let raw = json!({
            "PROJECT_ID": 17,
            "PROJECT_NAME": "Acme Cloud",
            "STATUS": "In Progress",
            "CATEGORY_ID": 3,
            "PIPELINE_ID": 1,
            "STAGE_ID": 14,
            "RESPONSIBLE_USER_ID": 99,
            "CUSTOMFIELDS": [{"CUSTOM_FIELD_ID": "PROJECT_FIELD_2", "FIELD_VALUE": "x"}],
            "LINKS": [
                {"LINK_ID": 5, "CONTACT_ID": 42, "ROLE": "Technical contact"},
                {"LINK_ID": 6, "SECOND_PROJECT_ID": 18}
            ]
        });
        let project: Project = serde_json::from_value(raw).unwrap();
        assert!(project.has_status(ProjectStatus::InProgress));
        assert_eq!(project.linked_project_ids().collect::<Vec<_>>(), vec![18]);
        assert_eq!(project.links[0].role.as_deref(), Some("Technical contact"));

        let back = serde_json::to_value(&project).unwrap();
        assert_eq!(back["RESPONSIBLE_USER_ID"], 99);
        assert_eq!(back["LINKS"][1]["SECOND_PROJECT_ID"], 18);
        assert!(back["LINKS"][1].get("CONTACT_ID").is_none());
    }

    #[test]
    fn test_project_null_collections() {
        let project: Project = serde_json::from_value(json!({
            "PROJECT_ID": 1,
            "PROJECT_NAME": "p",
            "LINKS": null,
            "CUSTOMFIELDS": null
        }))
        .unwrap();
        assert!(project.links.is_empty());
        assert!(project.customfields.is_empty());
    }

    #[test]
    fn test_contact_details_and_hidden_flag() {
        let contact: Contact = serde_json::from_value(json!({
            "CONTACT_ID": 42,
            "FIRST_NAME": "Jean",
            "LAST_NAME": "Dupont",
            "CONTACTINFOS": [
                {"TYPE": "EMAIL", "DETAIL": "jean@example.org"},
                {"TYPE": "PHONE", "DETAIL": "+358 40 123"},
                {"TYPE": "WEBSITE", "DETAIL": "https://example.org"}
            ],
            "CUSTOMFIELDS": [{"CUSTOM_FIELD_ID": "CONTACT_FIELD_1", "FIELD_VALUE": true}]
        }))
        .unwrap();

        assert_eq!(contact.emails(), vec!["jean@example.org"]);
        assert_eq!(contact.phones(), vec!["+358 40 123"]);
        assert!(contact.is_hidden());
    }

    #[test]
    fn test_new_project_serialization() {
        let payload = NewProject {
            project_name: "acme".into(),
            status: ProjectStatus::Deferred.to_string(),
            category_id: 4,
            customfields: vec![],
            links: vec![Link::contact(42)],
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["STATUS"], "Deferred");
        assert_eq!(value["LINKS"], json!([{"CONTACT_ID": 42}]));
    }
}
