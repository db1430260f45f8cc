//! Recent-activity and audit-log records.
//!
//! Both are append-only. Audit logs carry a typed [`AuditDetails`] payload
//! describing the mutation, so they stay queryable by entity kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    Authorizer, Category, Department, Document, EmailTemplate, Role, SettingsSection, Signature,
    Subscription, Template, Workflow, WorkflowTemplate,
};

/// The user a log entry is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn system() -> Self {
        Self::new("system", "System")
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::system()
    }
}

/// Kind of record a log entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Document,
    Workflow,
    WorkflowTemplate,
    Signature,
    Template,
    Department,
    Role,
    Authorizer,
    EmailTemplate,
    Category,
    Settings,
    Subscription,
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemType::Document => "document",
            ItemType::Workflow => "workflow",
            ItemType::WorkflowTemplate => "workflow_template",
            ItemType::Signature => "signature",
            ItemType::Template => "template",
            ItemType::Department => "department",
            ItemType::Role => "role",
            ItemType::Authorizer => "authorizer",
            ItemType::EmailTemplate => "email_template",
            ItemType::Category => "category",
            ItemType::Settings => "settings",
            ItemType::Subscription => "subscription",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Created,
    Updated,
    Deleted,
    /// Document bound to a workflow template.
    Bound,
    /// Document moved to its next workflow step.
    Advanced,
    /// Signature resolved to Signed.
    Signed,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Created => write!(f, "created"),
            Action::Updated => write!(f, "updated"),
            Action::Deleted => write!(f, "deleted"),
            Action::Bound => write!(f, "bound"),
            Action::Advanced => write!(f, "advanced"),
            Action::Signed => write!(f, "signed"),
        }
    }
}

/// Payload of one mutation: the record after the change, or the removed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditDetails {
    Document { document: Document },
    Workflow { workflow: Workflow },
    WorkflowTemplate { template: WorkflowTemplate },
    Signature { signature: Signature },
    /// A signature resolved to Signed, with the document it flipped, if any.
    SignatureResolved {
        signature: Signature,
        document: Option<Document>,
    },
    Template { template: Template },
    Department { department: Department },
    Role { role: Role },
    Authorizer { authorizer: Authorizer },
    EmailTemplate { template: EmailTemplate },
    Category { category: Category },
    Settings {
        section: SettingsSection,
        value: serde_json::Value,
    },
    Subscription { subscription: Subscription },
    Advance {
        document: Document,
        workflow: Workflow,
        from_step: usize,
        to_step: usize,
    },
}

impl AuditDetails {
    /// Records changed as a side effect of the logged mutation.
    pub fn affected_ids(&self) -> Vec<Uuid> {
        match self {
            AuditDetails::SignatureResolved {
                document: Some(document),
                ..
            } => vec![document.base.id],
            _ => Vec::new(),
        }
    }
}

/// Lightweight entry shown in activity feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub action: Action,
    pub item_id: String,
    pub item_name: String,
    pub user_id: String,
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Detail-rich, unbounded record of a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub action: Action,
    pub item_id: String,
    pub item_name: String,
    pub user_id: String,
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
    pub details: AuditDetails,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_details_are_tagged_by_kind() {
        let doc = Document::new("A.pdf".to_string());
        let details = AuditDetails::Document {
            document: doc.clone(),
        };
        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["kind"], "document");
        assert_eq!(value["document"]["name"], "A.pdf");

        let parsed: AuditDetails = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, AuditDetails::Document { document: doc });
    }

    #[test]
    fn test_resolution_reports_flipped_document() {
        let doc = Document::new("A.pdf".to_string());
        let signature = Signature::new(doc.base.id, doc.name.clone(), "Marta".to_string());
        let details = AuditDetails::SignatureResolved {
            signature: signature.clone(),
            document: Some(doc.clone()),
        };
        assert_eq!(details.affected_ids(), vec![doc.base.id]);
        assert_eq!(serde_json::to_value(&details).unwrap()["kind"], "signature_resolved");

        let untouched = AuditDetails::SignatureResolved {
            signature,
            document: None,
        };
        assert!(untouched.affected_ids().is_empty());
        assert!(AuditDetails::Document { document: doc }.affected_ids().is_empty());
    }

    #[test]
    fn test_activity_type_field_name() {
        let activity = RecentActivity {
            id: Uuid::new_v4(),
            item_type: ItemType::WorkflowTemplate,
            action: Action::Created,
            item_id: "x".to_string(),
            item_name: "Standard".to_string(),
            user_id: "system".to_string(),
            user_name: "System".to_string(),
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["type"], "workflow_template");
        assert_eq!(value["action"], "created");
    }
}
