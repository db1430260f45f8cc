use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityBase;

/// Lifecycle status of a document.
///
/// Draft → In Workflow → Pending for Sign → Signed, with Declined and
/// Recalled as terminal side branches set by explicit updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DocumentStatus {
    #[default]
    Draft,
    #[serde(rename = "In Workflow")]
    InWorkflow,
    #[serde(rename = "Pending for Sign")]
    PendingForSign,
    Signed,
    Declined,
    Recalled,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Draft => write!(f, "Draft"),
            DocumentStatus::InWorkflow => write!(f, "In Workflow"),
            DocumentStatus::PendingForSign => write!(f, "Pending for Sign"),
            DocumentStatus::Signed => write!(f, "Signed"),
            DocumentStatus::Declined => write!(f, "Declined"),
            DocumentStatus::Recalled => write!(f, "Recalled"),
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], " ").as_str() {
            "draft" => Ok(DocumentStatus::Draft),
            "in workflow" => Ok(DocumentStatus::InWorkflow),
            "pending for sign" | "pending" => Ok(DocumentStatus::PendingForSign),
            "signed" => Ok(DocumentStatus::Signed),
            "declined" => Ok(DocumentStatus::Declined),
            "recalled" => Ok(DocumentStatus::Recalled),
            _ => Err(format!("Invalid document status: {}", s)),
        }
    }
}

impl DocumentStatus {
    /// Declined and recalled documents are closed: neither the engine nor a
    /// signature moves them out again. Signed is not closed, a later Sign
    /// step reopens it for another signature.
    pub fn is_closed(&self) -> bool {
        matches!(self, DocumentStatus::Declined | DocumentStatus::Recalled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub status: DocumentStatus,
    /// Workflow instance this document is bound to, if any.
    pub workflow_id: Option<Uuid>,
    /// Index into the bound workflow's steps.
    pub current_step: usize,
    pub account_number: Option<String>,
    pub branch: Option<String>,
    pub customer_name: Option<String>,
    pub document_type: Option<String>,
    pub amount: Option<f64>,
}

impl Document {
    pub fn new(name: String) -> Self {
        Self {
            base: EntityBase::new(),
            name,
            status: DocumentStatus::default(),
            workflow_id: None,
            current_step: 0,
            account_number: None,
            branch: None,
            customer_name: None,
            document_type: None,
            amount: None,
        }
    }
}

/// Fields accepted when uploading a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewDocument {
    pub name: String,
    pub status: Option<DocumentStatus>,
    pub account_number: Option<String>,
    pub branch: Option<String>,
    pub customer_name: Option<String>,
    pub document_type: Option<String>,
    pub amount: Option<f64>,
}

impl NewDocument {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn into_document(self) -> Document {
        let mut document = Document::new(self.name);
        document.status = self.status.unwrap_or_default();
        document.account_number = self.account_number;
        document.branch = self.branch;
        document.customer_name = self.customer_name;
        document.document_type = self.document_type;
        document.amount = self.amount;
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_with_display_names() {
        let json = serde_json::to_string(&DocumentStatus::PendingForSign).unwrap();
        assert_eq!(json, "\"Pending for Sign\"");

        let parsed: DocumentStatus = serde_json::from_str("\"In Workflow\"").unwrap();
        assert_eq!(parsed, DocumentStatus::InWorkflow);
    }

    #[test]
    fn test_status_from_str_is_lenient() {
        assert_eq!(
            "pending-for-sign".parse::<DocumentStatus>().unwrap(),
            DocumentStatus::PendingForSign
        );
        assert_eq!(
            "IN_WORKFLOW".parse::<DocumentStatus>().unwrap(),
            DocumentStatus::InWorkflow
        );
        assert!("archived".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn test_only_declined_and_recalled_are_closed() {
        assert!(DocumentStatus::Declined.is_closed());
        assert!(DocumentStatus::Recalled.is_closed());
        assert!(!DocumentStatus::Signed.is_closed());
        assert!(!DocumentStatus::PendingForSign.is_closed());
    }

    #[test]
    fn test_new_document_defaults_to_draft() {
        let doc = NewDocument::named("A.pdf").into_document();
        assert_eq!(doc.name, "A.pdf");
        assert_eq!(doc.status, DocumentStatus::Draft);
        assert_eq!(doc.current_step, 0);
        assert!(doc.workflow_id.is_none());
    }

    #[test]
    fn test_document_json_is_flat() {
        let doc = Document::new("Loan.pdf".to_string());
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value["id"].is_string());
        assert!(value["created_at"].is_string());
        assert_eq!(value["status"], "Draft");
    }
}
