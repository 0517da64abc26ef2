//! Work-item wire types and field-name constants

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Well-known field reference names.
pub mod fields {
    pub const TITLE: &str = "System.Title";
    pub const DESCRIPTION: &str = "System.Description";
    pub const WORK_ITEM_TYPE: &str = "System.WorkItemType";
    pub const STATE: &str = "System.State";
    pub const EFFORT: &str = "Microsoft.VSTS.Scheduling.Effort";
    pub const PRIORITY: &str = "Microsoft.VSTS.Common.Priority";
}

/// Relation reference names. Parent cardinality is at most one by
/// convention; the backend does not enforce it.
pub mod relations {
    pub const CHILD: &str = "System.LinkTypes.Hierarchy-Forward";
    pub const PARENT: &str = "System.LinkTypes.Hierarchy-Reverse";
    pub const RELATED: &str = "System.LinkTypes.Related";
}

/// A work item as returned by the backend. Fields are an open map keyed by
/// reference name; the typed accessors cover the ones the workflow reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<i64>,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<Relation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl WorkItem {
    fn text_field(&self, name: &str) -> &str {
        self.fields.get(name).and_then(Value::as_str).unwrap_or("")
    }

    pub fn title(&self) -> &str {
        self.text_field(fields::TITLE)
    }

    pub fn description(&self) -> &str {
        self.text_field(fields::DESCRIPTION)
    }

    pub fn item_type(&self) -> &str {
        self.text_field(fields::WORK_ITEM_TYPE)
    }

    pub fn state(&self) -> &str {
        self.text_field(fields::STATE)
    }
}

/// A relation entry on an expanded work item. The target id is embedded as
/// the trailing segment of `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub rel: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Value>,
}

/// Envelope for list endpoints (`{count, value}`).
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub count: Option<usize>,
    pub value: Vec<T>,
}

/// Structured-query result: ids only, hydrated through the batch endpoint.
#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default, rename = "workItems")]
    pub work_items: Vec<WorkItemRef>,
}

#[derive(Debug, Deserialize)]
pub struct WorkItemRef {
    pub id: i64,
}
