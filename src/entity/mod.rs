mod activity;
mod document;
mod organization;
mod settings;
mod signature;
mod template;
mod workflow;

pub use activity::{Action, Actor, AuditDetails, AuditLog, ItemType, RecentActivity};
pub use document::{Document, DocumentStatus, NewDocument};
pub use organization::{
    Authorizer, Department, NewAuthorizer, NewDepartment, NewRole, Role,
};
pub use settings::{
    Category, EmailTemplate, NewCategory, NewEmailTemplate, SettingsSection, Subscription,
    SubscriptionPlan,
};
pub use signature::{NewSignature, Signature, SignatureStatus, SIGNATURE_DUE_DAYS, UNASSIGNED};
pub use template::{NewTemplate, Template};
pub use workflow::{
    NewWorkflow, NewWorkflowTemplate, StepStatus, TemplateStatus, TemplateStep, Workflow,
    WorkflowStatus, WorkflowStep, WorkflowTemplate, APPROVE_STEP, SIGN_STEP,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base fields shared by all stored records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBase {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntityBase {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for EntityBase {
    fn default() -> Self {
        Self::new()
    }
}
