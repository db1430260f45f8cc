use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityBase;

/// Days between a signature request and its due date.
pub const SIGNATURE_DUE_DAYS: i64 = 7;

/// Assignee used when a Sign step has nobody assigned.
pub const UNASSIGNED: &str = "Unassigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SignatureStatus {
    #[default]
    Pending,
    Signed,
}

impl std::fmt::Display for SignatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureStatus::Pending => write!(f, "Pending"),
            SignatureStatus::Signed => write!(f, "Signed"),
        }
    }
}

impl std::str::FromStr for SignatureStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SignatureStatus::Pending),
            "signed" => Ok(SignatureStatus::Signed),
            _ => Err(format!("Invalid signature status: {}", s)),
        }
    }
}

/// A request for one person to sign one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(flatten)]
    pub base: EntityBase,
    pub document_id: Uuid,
    pub document_name: String,
    pub assignee: String,
    pub status: SignatureStatus,
    pub due_date: DateTime<Utc>,
    pub signed_at: Option<DateTime<Utc>>,
}

impl Signature {
    pub fn new(document_id: Uuid, document_name: String, assignee: String) -> Self {
        let base = EntityBase::new();
        let due_date = base.created_at + Duration::days(SIGNATURE_DUE_DAYS);
        Self {
            base,
            document_id,
            document_name,
            assignee,
            status: SignatureStatus::Pending,
            due_date,
            signed_at: None,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.status == SignatureStatus::Signed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSignature {
    pub document_id: Uuid,
    pub assignee: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_date_is_seven_days_after_creation() {
        let sig = Signature::new(Uuid::new_v4(), "A.pdf".to_string(), "Alice".to_string());
        assert_eq!(sig.due_date - sig.base.created_at, Duration::days(7));
        assert_eq!(sig.status, SignatureStatus::Pending);
        assert!(sig.signed_at.is_none());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("SIGNED".parse::<SignatureStatus>().unwrap(), SignatureStatus::Signed);
        assert!("void".parse::<SignatureStatus>().is_err());
    }
}
