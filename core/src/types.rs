//! Resource and operation vocabulary, plus the remote API's list shape.
//!
//! # Design
//! Resources and operations arrive from the host as strings. They are parsed
//! into closed enums once, so the rest of the crate matches exhaustively
//! instead of comparing strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AdapterError;

/// Remote entity types addressable by row operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Person,
    Organization,
    Task,
    Tag,
    Segment,
}

impl Resource {
    pub const ALL: [Resource; 5] = [
        Resource::Person,
        Resource::Organization,
        Resource::Task,
        Resource::Tag,
        Resource::Segment,
    ];

    /// URL path segment of the resource's collection.
    pub fn endpoint(self) -> &'static str {
        match self {
            Resource::Person => "people",
            Resource::Organization => "organizations",
            Resource::Task => "tasks",
            Resource::Tag => "tags",
            Resource::Segment => "segments",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Person => "person",
            Resource::Organization => "organization",
            Resource::Task => "task",
            Resource::Tag => "tag",
            Resource::Segment => "segment",
        }
    }

    /// Whether single-item operations (get, create, update, delete) exist
    /// for this resource. Tags and segments are list-only.
    pub fn supports(self, operation: Operation) -> bool {
        match self {
            Resource::Person | Resource::Organization | Resource::Task => true,
            Resource::Tag | Resource::Segment => operation == Operation::GetMany,
        }
    }

    /// Resources offered in the host's resource selector.
    pub fn selectable() -> Vec<OptionItem> {
        [Resource::Person, Resource::Organization, Resource::Task]
            .into_iter()
            .map(|r| OptionItem::new(capitalize(r.as_str()), r.as_str()))
            .collect()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resource::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| AdapterError::UnknownResource(s.to_string()))
    }
}

/// Operations a row can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Get,
    GetMany,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Get,
        Operation::GetMany,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Get => "get",
            Operation::GetMany => "getMany",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Operations listed for `resource` in the host's operation selector.
    pub fn catalog(resource: Resource) -> Vec<OperationOption> {
        Operation::ALL
            .into_iter()
            .filter(|op| resource.supports(*op))
            .map(|op| {
                let (name, target) = match op {
                    Operation::GetMany => ("Get many".to_string(), format!("{resource}s")),
                    other => (capitalize(other.as_str()), resource.to_string()),
                };
                let label = format!("{name} {target}");
                OperationOption {
                    name,
                    value: op,
                    description: label.clone(),
                    action: label,
                }
            })
            .collect()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| AdapterError::UnknownOperation(s.to_string()))
    }
}

/// One entry of the host's operation selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationOption {
    pub name: String,
    pub value: Operation,
    pub description: String,
    pub action: String,
}

/// A selectable choice: display label plus the value sent back to the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    pub name: String,
    pub value: String,
}

impl OptionItem {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// `@id`, `first`, `last`, ... are kept as-is for the caller.
    #[serde(flatten)]
    pub other: serde_json::Map<String, Value>,
}

/// A JSON-LD collection page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub member: Vec<Value>,
    #[serde(default)]
    pub view: Option<PageView>,
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resources_map_to_endpoints() {
        assert_eq!(Resource::Person.endpoint(), "people");
        assert_eq!(Resource::Organization.endpoint(), "organizations");
        assert_eq!(Resource::Task.endpoint(), "tasks");
        assert_eq!(Resource::Tag.endpoint(), "tags");
        assert_eq!(Resource::Segment.endpoint(), "segments");
    }

    #[test]
    fn unknown_resource_is_named_in_error() {
        let err = "invoice".parse::<Resource>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown resource: invoice");
    }

    #[test]
    fn operations_parse_host_values() {
        assert_eq!("getMany".parse::<Operation>().unwrap(), Operation::GetMany);
        assert_eq!("delete".parse::<Operation>().unwrap(), Operation::Delete);
        assert!("getmany".parse::<Operation>().is_err());
    }

    #[test]
    fn catalog_pluralizes_get_many() {
        let ops = Operation::catalog(Resource::Task);
        assert_eq!(ops.len(), 5);
        let many = ops.iter().find(|o| o.value == Operation::GetMany).unwrap();
        assert_eq!(many.name, "Get many");
        assert_eq!(many.action, "Get many tasks");
        let create = ops.iter().find(|o| o.value == Operation::Create).unwrap();
        assert_eq!(create.description, "Create task");
    }

    #[test]
    fn catalog_of_list_only_resource() {
        let ops = Operation::catalog(Resource::Segment);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].action, "Get many segments");
    }

    #[test]
    fn tags_and_segments_are_list_only() {
        assert!(Resource::Tag.supports(Operation::GetMany));
        assert!(!Resource::Tag.supports(Operation::Create));
        assert!(!Resource::Segment.supports(Operation::Delete));
        assert!(Resource::Person.supports(Operation::Update));
    }

    #[test]
    fn selectable_resources() {
        let names: Vec<_> = Resource::selectable().into_iter().map(|o| o.name).collect();
        assert_eq!(names, ["Person", "Organization", "Task"]);
    }

    #[test]
    fn collection_defaults_to_empty_member() {
        let page: Collection = serde_json::from_str(r#"{"totalItems":0}"#).unwrap();
        assert!(page.member.is_empty());
        assert!(page.view.is_none());
    }

    #[test]
    fn page_view_keeps_extra_fields() {
        let view: PageView =
            serde_json::from_str(r#"{"@id":"/tasks?page=2","next":"/tasks?page=3"}"#).unwrap();
        assert_eq!(view.next.as_deref(), Some("/tasks?page=3"));
        assert_eq!(view.other["@id"], "/tasks?page=2");
    }
}
