//! Update payloads.
//!
//! Every payload is a shallow merge: `None` leaves a field untouched.
//! Fields that are themselves optional use `Option<Option<T>>`, where
//! `Some(None)` clears the value and `Some(Some(v))` sets it. `apply`
//! consumes the payload and returns a new record; the stored record is
//! replaced wholesale, never patched in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::entity::{
    Authorizer, Department, Document, DocumentStatus, EmailTemplate, Role, Signature,
    SignatureStatus, Template, TemplateStatus, TemplateStep, Workflow, WorkflowTemplate,
};

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Update payload for a document. Workflow position is owned by the engine
/// and cannot be patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DocumentStatus>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub account_number: Option<Option<String>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub branch: Option<Option<String>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<Option<String>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub document_type: Option<Option<String>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub amount: Option<Option<f64>>,
}

impl DocumentUpdate {
    pub fn status(status: DocumentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn apply(self, current: &Document) -> Document {
        let mut next = current.clone();
        merge(&mut next.name, self.name);
        merge(&mut next.status, self.status);
        merge(&mut next.account_number, self.account_number);
        merge(&mut next.branch, self.branch);
        merge(&mut next.customer_name, self.customer_name);
        merge(&mut next.document_type, self.document_type);
        merge(&mut next.amount, self.amount);
        next.base.touch();
        next
    }
}

/// Update payload for a workflow instance. Status and step progress move
/// only through the engine, so only the name can be patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl WorkflowUpdate {
    pub fn apply(self, current: &Workflow) -> Workflow {
        let mut next = current.clone();
        merge(&mut next.name, self.name);
        next.base.touch();
        next
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowTemplateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TemplateStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<TemplateStep>>,
}

impl WorkflowTemplateUpdate {
    pub fn apply(self, current: &WorkflowTemplate) -> WorkflowTemplate {
        let mut next = current.clone();
        merge(&mut next.name, self.name);
        merge(&mut next.description, self.description);
        merge(&mut next.category, self.category);
        merge(&mut next.status, self.status);
        merge(&mut next.steps, self.steps);
        next.base.touch();
        next
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SignatureStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

impl SignatureUpdate {
    pub fn signed() -> Self {
        Self {
            status: Some(SignatureStatus::Signed),
            ..Default::default()
        }
    }

    /// `signed_at` is set by the first resolution and kept afterwards.
    pub fn apply(self, current: &Signature) -> Signature {
        let mut next = current.clone();
        merge(&mut next.status, self.status);
        merge(&mut next.assignee, self.assignee);
        merge(&mut next.due_date, self.due_date);
        if next.is_signed() && next.signed_at.is_none() {
            next.signed_at = Some(Utc::now());
        }
        next.base.touch();
        next
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub content: Option<Option<String>>,
}

impl TemplateUpdate {
    pub fn apply(self, current: &Template) -> Template {
        let mut next = current.clone();
        merge(&mut next.name, self.name);
        merge(&mut next.description, self.description);
        merge(&mut next.category, self.category);
        merge(&mut next.content, self.content);
        next.base.touch();
        next
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailTemplateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl EmailTemplateUpdate {
    pub fn apply(self, current: &EmailTemplate) -> EmailTemplate {
        let mut next = current.clone();
        merge(&mut next.name, self.name);
        merge(&mut next.event, self.event);
        merge(&mut next.subject, self.subject);
        merge(&mut next.body, self.body);
        merge(&mut next.enabled, self.enabled);
        next.base.touch();
        next
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DepartmentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub head: Option<Option<String>>,
}

impl DepartmentUpdate {
    pub fn apply(self, current: &Department) -> Department {
        let mut next = current.clone();
        merge(&mut next.name, self.name);
        merge(&mut next.description, self.description);
        merge(&mut next.head, self.head);
        next.base.touch();
        next
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
}

impl RoleUpdate {
    pub fn apply(self, current: &Role) -> Role {
        let mut next = current.clone();
        merge(&mut next.name, self.name);
        merge(&mut next.description, self.description);
        merge(&mut next.permissions, self.permissions);
        next.base.touch();
        next
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub department_id: Option<Option<Uuid>>,
    #[serde(deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub signing_limit: Option<Option<f64>>,
}

impl AuthorizerUpdate {
    pub fn apply(self, current: &Authorizer) -> Authorizer {
        let mut next = current.clone();
        merge(&mut next.name, self.name);
        merge(&mut next.email, self.email);
        merge(&mut next.department_id, self.department_id);
        merge(&mut next.signing_limit, self.signing_limit);
        next.base.touch();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_update_leaves_unspecified_fields() {
        let mut doc = Document::new("Loan.pdf".to_string());
        doc.branch = Some("North".to_string());
        doc.amount = Some(1200.0);

        let next = DocumentUpdate {
            name: Some("Loan-v2.pdf".to_string()),
            ..Default::default()
        }
        .apply(&doc);

        assert_eq!(next.name, "Loan-v2.pdf");
        assert_eq!(next.branch.as_deref(), Some("North"));
        assert_eq!(next.amount, Some(1200.0));
        assert_eq!(next.base.id, doc.base.id);
        assert_eq!(doc.name, "Loan.pdf");
    }

    #[test]
    fn test_explicit_null_clears_optional_field() {
        let mut doc = Document::new("Loan.pdf".to_string());
        doc.branch = Some("North".to_string());
        doc.customer_name = Some("Dana".to_string());

        let update: DocumentUpdate =
            serde_json::from_value(serde_json::json!({ "branch": null })).unwrap();
        let next = update.apply(&doc);

        assert!(next.branch.is_none());
        assert_eq!(next.customer_name.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_cleared_field_serializes_as_null() {
        let update = DocumentUpdate {
            branch: Some(None),
            ..Default::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert!(value["branch"].is_null());
        assert!(value.get("name").is_none());
    }

    #[test]
    fn test_workflow_patch_cannot_move_status() {
        let mut workflow = Workflow::new(
            "Standard - A.pdf".to_string(),
            vec![
                TemplateStep::new("Draft", "Maker").instantiate(),
                TemplateStep::new("Sign", "Signer").instantiate(),
            ],
        );
        workflow.steps[0].status = crate::entity::StepStatus::Current;

        let update: WorkflowUpdate = serde_json::from_value(serde_json::json!({
            "name": "Renamed",
            "status": "Completed"
        }))
        .unwrap();
        let next = update.apply(&workflow);

        assert_eq!(next.name, "Renamed");
        assert_eq!(next.status, crate::entity::WorkflowStatus::Active);
        assert!(next.steps_consistent());
    }

    #[test]
    fn test_signed_at_is_kept_on_second_resolution() {
        let sig = Signature::new(Uuid::new_v4(), "A.pdf".to_string(), "Alice".to_string());
        let first = SignatureUpdate::signed().apply(&sig);
        let signed_at = first.signed_at;
        assert!(signed_at.is_some());

        let second = SignatureUpdate::signed().apply(&first);
        assert_eq!(second.signed_at, signed_at);
        assert!(second.is_signed());
    }
}
