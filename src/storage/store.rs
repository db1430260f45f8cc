use std::collections::HashMap;

use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::{
    Action, Actor, AuditDetails, AuditLog, Authorizer, Category, Department, Document,
    DocumentStatus, EmailTemplate, ItemType, NewAuthorizer, NewCategory, NewDepartment,
    NewDocument, NewEmailTemplate, NewRole, NewSignature, NewTemplate, NewWorkflow,
    NewWorkflowTemplate, RecentActivity, Role, SettingsSection, Signature, SignatureStatus,
    Subscription, SubscriptionPlan, Template, Workflow, WorkflowTemplate,
};
use crate::error::{Result, SigndeskError};

use super::recorder::{AuditRecorder, Mutation, StoreEvent};
use super::updates::{
    AuthorizerUpdate, DepartmentUpdate, DocumentUpdate, EmailTemplateUpdate, RoleUpdate,
    SignatureUpdate, TemplateUpdate, WorkflowTemplateUpdate, WorkflowUpdate,
};

/// Identity and display name of a stored record.
pub trait Stored: Clone {
    fn id(&self) -> Uuid;
    fn label(&self) -> &str;
}

macro_rules! stored {
    ($($ty:ty => $label:ident),* $(,)?) => {
        $(
            impl Stored for $ty {
                fn id(&self) -> Uuid {
                    self.base.id
                }

                fn label(&self) -> &str {
                    &self.$label
                }
            }
        )*
    };
}

stored! {
    Document => name,
    Workflow => name,
    WorkflowTemplate => name,
    Signature => document_name,
    Template => name,
    Department => name,
    Role => name,
    Authorizer => name,
    EmailTemplate => name,
    Category => name,
}

pub(super) fn position<T: Stored>(items: &[T], id: &Uuid) -> Option<usize> {
    items.iter().position(|item| item.id() == *id)
}

fn find<T: Stored>(items: &[T], id: &Uuid) -> Option<T> {
    items.iter().find(|item| item.id() == *id).cloned()
}

/// Authoritative in-memory collections.
///
/// Every mutation looks up its target, replaces it with a freshly merged
/// record, records exactly one activity and one audit log, and returns the
/// new record. A mutation whose target is missing changes nothing and
/// records nothing.
pub struct EntityStore {
    pub(super) documents: Vec<Document>,
    pub(super) workflows: Vec<Workflow>,
    pub(super) workflow_templates: Vec<WorkflowTemplate>,
    pub(super) signatures: Vec<Signature>,
    pub(super) templates: Vec<Template>,
    pub(super) departments: Vec<Department>,
    pub(super) roles: Vec<Role>,
    pub(super) authorizers: Vec<Authorizer>,
    pub(super) email_templates: Vec<EmailTemplate>,
    pub(super) categories: Vec<Category>,
    pub(super) subscription_plans: Vec<SubscriptionPlan>,
    pub(super) subscription: Option<Subscription>,
    pub(super) settings: HashMap<SettingsSection, serde_json::Value>,
    pub(super) recorder: AuditRecorder,
    actor: Actor,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
            workflows: Vec::new(),
            workflow_templates: Vec::new(),
            signatures: Vec::new(),
            templates: Vec::new(),
            departments: Vec::new(),
            roles: Vec::new(),
            authorizers: Vec::new(),
            email_templates: Vec::new(),
            categories: Vec::new(),
            subscription_plans: Vec::new(),
            subscription: None,
            settings: HashMap::new(),
            recorder: AuditRecorder::new(),
            actor: Actor::system(),
        }
    }

    /// Clear every collection and log. Subscribers stay connected.
    pub fn reset(&mut self) {
        let recorder = std::mem::take(&mut self.recorder);
        *self = Self {
            recorder,
            ..Self::new()
        };
        self.recorder.clear();
        info!("Entity store reset");
    }

    /// Attribute subsequent log entries to `actor`.
    pub fn set_actor(&mut self, actor: Actor) {
        self.actor = actor;
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.recorder.subscribe()
    }

    pub(super) fn record(
        &mut self,
        item_type: ItemType,
        action: Action,
        item_id: impl ToString,
        item_name: &str,
        details: AuditDetails,
    ) {
        let mutation = Mutation {
            item_type,
            action,
            item_id: item_id.to_string(),
            item_name: item_name.to_string(),
            details,
        };
        self.recorder.record(&self.actor, mutation);
    }

    // ========================================================================
    // Documents
    // ========================================================================

    pub fn list_documents(&self) -> Vec<Document> {
        self.documents.clone()
    }

    pub fn get_document(&self, id: &Uuid) -> Option<Document> {
        find(&self.documents, id)
    }

    pub fn create_document(&mut self, new: NewDocument) -> Document {
        let document = new.into_document();
        self.documents.push(document.clone());
        info!(id = %document.base.id, name = %document.name, "Document created");
        self.record(
            ItemType::Document,
            Action::Created,
            document.base.id,
            &document.name,
            AuditDetails::Document {
                document: document.clone(),
            },
        );
        document
    }

    pub fn update_document(&mut self, id: &Uuid, update: DocumentUpdate) -> Option<Document> {
        let Some(idx) = position(&self.documents, id) else {
            debug!(%id, "Document not found; update skipped");
            return None;
        };
        let next = update.apply(&self.documents[idx]);
        self.documents[idx] = next.clone();
        info!(%id, status = %next.status, "Document updated");
        self.record(
            ItemType::Document,
            Action::Updated,
            id,
            &next.name,
            AuditDetails::Document {
                document: next.clone(),
            },
        );
        Some(next)
    }

    pub fn delete_document(&mut self, id: &Uuid) -> bool {
        let Some(idx) = position(&self.documents, id) else {
            debug!(%id, "Document not found; delete skipped");
            return false;
        };
        let removed = self.documents.remove(idx);
        info!(%id, "Document deleted");
        self.record(
            ItemType::Document,
            Action::Deleted,
            id,
            &removed.name,
            AuditDetails::Document { document: removed.clone() },
        );
        true
    }

    // ========================================================================
    // Workflows (instances)
    // ========================================================================

    pub fn list_workflows(&self) -> Vec<Workflow> {
        self.workflows.clone()
    }

    pub fn get_workflow(&self, id: &Uuid) -> Option<Workflow> {
        find(&self.workflows, id)
    }

    pub fn create_workflow(&mut self, new: NewWorkflow) -> Workflow {
        let workflow = new.into_workflow();
        self.insert_workflow(workflow.clone());
        workflow
    }

    pub(super) fn insert_workflow(&mut self, workflow: Workflow) {
        self.workflows.push(workflow.clone());
        info!(id = %workflow.base.id, steps = workflow.steps.len(), "Workflow created");
        self.record(
            ItemType::Workflow,
            Action::Created,
            workflow.base.id,
            &workflow.name,
            AuditDetails::Workflow {
                workflow: workflow.clone(),
            },
        );
    }

    pub fn update_workflow(&mut self, id: &Uuid, update: WorkflowUpdate) -> Option<Workflow> {
        let Some(idx) = position(&self.workflows, id) else {
            debug!(%id, "Workflow not found; update skipped");
            return None;
        };
        let next = update.apply(&self.workflows[idx]);
        self.workflows[idx] = next.clone();
        info!(%id, status = %next.status, "Workflow updated");
        self.record(
            ItemType::Workflow,
            Action::Updated,
            id,
            &next.name,
            AuditDetails::Workflow {
                workflow: next.clone(),
            },
        );
        Some(next)
    }

    pub fn delete_workflow(&mut self, id: &Uuid) -> bool {
        let Some(idx) = position(&self.workflows, id) else {
            debug!(%id, "Workflow not found; delete skipped");
            return false;
        };
        let removed = self.workflows.remove(idx);
        info!(%id, "Workflow deleted");
        self.record(
            ItemType::Workflow,
            Action::Deleted,
            id,
            &removed.name,
            AuditDetails::Workflow { workflow: removed.clone() },
        );
        true
    }

    // ========================================================================
    // Workflow templates
    // ========================================================================

    pub fn list_workflow_templates(&self) -> Vec<WorkflowTemplate> {
        self.workflow_templates.clone()
    }

    pub fn get_workflow_template(&self, id: &Uuid) -> Option<WorkflowTemplate> {
        find(&self.workflow_templates, id)
    }

    pub fn create_workflow_template(&mut self, new: NewWorkflowTemplate) -> WorkflowTemplate {
        let template = new.into_template();
        self.workflow_templates.push(template.clone());
        info!(id = %template.base.id, name = %template.name, "Workflow template created");
        self.record(
            ItemType::WorkflowTemplate,
            Action::Created,
            template.base.id,
            &template.name,
            AuditDetails::WorkflowTemplate {
                template: template.clone(),
            },
        );
        template
    }

    pub fn update_workflow_template(
        &mut self,
        id: &Uuid,
        update: WorkflowTemplateUpdate,
    ) -> Option<WorkflowTemplate> {
        let Some(idx) = position(&self.workflow_templates, id) else {
            debug!(%id, "Workflow template not found; update skipped");
            return None;
        };
        let next = update.apply(&self.workflow_templates[idx]);
        self.workflow_templates[idx] = next.clone();
        info!(%id, status = %next.status, "Workflow template updated");
        self.record(
            ItemType::WorkflowTemplate,
            Action::Updated,
            id,
            &next.name,
            AuditDetails::WorkflowTemplate {
                template: next.clone(),
            },
        );
        Some(next)
    }

    pub fn delete_workflow_template(&mut self, id: &Uuid) -> bool {
        let Some(idx) = position(&self.workflow_templates, id) else {
            debug!(%id, "Workflow template not found; delete skipped");
            return false;
        };
        let removed = self.workflow_templates.remove(idx);
        info!(%id, "Workflow template deleted");
        self.record(
            ItemType::WorkflowTemplate,
            Action::Deleted,
            id,
            &removed.name,
            AuditDetails::WorkflowTemplate { template: removed.clone() },
        );
        true
    }

    // ========================================================================
    // Signatures
    // ========================================================================

    pub fn list_signatures(&self) -> Vec<Signature> {
        self.signatures.clone()
    }

    pub fn get_signature(&self, id: &Uuid) -> Option<Signature> {
        find(&self.signatures, id)
    }

    pub fn signatures_for_document(&self, document_id: &Uuid) -> Vec<Signature> {
        self.signatures
            .iter()
            .filter(|s| s.document_id == *document_id)
            .cloned()
            .collect()
    }

    /// Request a signature on an existing document. `None` when the
    /// document does not exist.
    pub fn create_signature(&mut self, new: NewSignature) -> Option<Signature> {
        let Some(document) = self.get_document(&new.document_id) else {
            debug!(document_id = %new.document_id, "Document not found; signature not created");
            return None;
        };
        let mut signature = Signature::new(document.base.id, document.name, new.assignee);
        if let Some(due_date) = new.due_date {
            signature.due_date = due_date;
        }
        self.insert_signature(signature.clone());
        Some(signature)
    }

    pub(super) fn insert_signature(&mut self, signature: Signature) {
        self.signatures.push(signature.clone());
        info!(
            id = %signature.base.id,
            document_id = %signature.document_id,
            assignee = %signature.assignee,
            "Signature requested"
        );
        self.record(
            ItemType::Signature,
            Action::Created,
            signature.base.id,
            &signature.document_name,
            AuditDetails::Signature {
                signature: signature.clone(),
            },
        );
    }

    /// Update a signature. Resolving it to `Signed` also marks the referenced
    /// document `Signed` unless it is declined or recalled; resolving again
    /// succeeds with the same end state.
    pub fn update_signature(&mut self, id: &Uuid, update: SignatureUpdate) -> Option<Signature> {
        let Some(idx) = position(&self.signatures, id) else {
            debug!(%id, "Signature not found; update skipped");
            return None;
        };
        let next = update.apply(&self.signatures[idx]);
        self.signatures[idx] = next.clone();

        if next.status != SignatureStatus::Signed {
            info!(%id, "Signature updated");
            self.record(
                ItemType::Signature,
                Action::Updated,
                id,
                &next.document_name,
                AuditDetails::Signature {
                    signature: next.clone(),
                },
            );
            return Some(next);
        }

        let document = match position(&self.documents, &next.document_id) {
            Some(doc_idx) if self.documents[doc_idx].status.is_closed() => {
                debug!(
                    document_id = %next.document_id,
                    status = %self.documents[doc_idx].status,
                    "Document closed; left unchanged"
                );
                None
            }
            Some(doc_idx) => {
                let signed = DocumentUpdate::status(DocumentStatus::Signed)
                    .apply(&self.documents[doc_idx]);
                self.documents[doc_idx] = signed.clone();
                Some(signed)
            }
            None => None,
        };
        info!(%id, document_id = %next.document_id, "Signature resolved");
        self.record(
            ItemType::Signature,
            Action::Signed,
            id,
            &next.document_name,
            AuditDetails::SignatureResolved {
                signature: next.clone(),
                document,
            },
        );
        Some(next)
    }

    pub fn delete_signature(&mut self, id: &Uuid) -> bool {
        let Some(idx) = position(&self.signatures, id) else {
            debug!(%id, "Signature not found; delete skipped");
            return false;
        };
        let removed = self.signatures.remove(idx);
        info!(%id, "Signature deleted");
        self.record(
            ItemType::Signature,
            Action::Deleted,
            id,
            &removed.document_name,
            AuditDetails::Signature { signature: removed.clone() },
        );
        true
    }

    // ========================================================================
    // Document templates
    // ========================================================================

    pub fn list_templates(&self) -> Vec<Template> {
        self.templates.clone()
    }

    pub fn get_template(&self, id: &Uuid) -> Option<Template> {
        find(&self.templates, id)
    }

    pub fn create_template(&mut self, new: NewTemplate) -> Template {
        let template = new.into_template();
        self.templates.push(template.clone());
        info!(id = %template.base.id, name = %template.name, "Template created");
        self.record(
            ItemType::Template,
            Action::Created,
            template.base.id,
            &template.name,
            AuditDetails::Template {
                template: template.clone(),
            },
        );
        template
    }

    pub fn update_template(&mut self, id: &Uuid, update: TemplateUpdate) -> Option<Template> {
        let Some(idx) = position(&self.templates, id) else {
            debug!(%id, "Template not found; update skipped");
            return None;
        };
        let next = update.apply(&self.templates[idx]);
        self.templates[idx] = next.clone();
        info!(%id, "Template updated");
        self.record(
            ItemType::Template,
            Action::Updated,
            id,
            &next.name,
            AuditDetails::Template {
                template: next.clone(),
            },
        );
        Some(next)
    }

    pub fn delete_template(&mut self, id: &Uuid) -> bool {
        let Some(idx) = position(&self.templates, id) else {
            debug!(%id, "Template not found; delete skipped");
            return false;
        };
        let removed = self.templates.remove(idx);
        info!(%id, "Template deleted");
        self.record(
            ItemType::Template,
            Action::Deleted,
            id,
            &removed.name,
            AuditDetails::Template { template: removed.clone() },
        );
        true
    }

    // ========================================================================
    // Departments, roles, authorizers
    //
    // Unlike the collections above, update and delete on these fail with
    // `NotFound` when the id does not resolve.
    // ========================================================================

    pub fn list_departments(&self) -> Vec<Department> {
        self.departments.clone()
    }

    pub fn get_department(&self, id: &Uuid) -> Option<Department> {
        find(&self.departments, id)
    }

    pub fn create_department(&mut self, new: NewDepartment) -> Department {
        let department = new.into_department();
        self.departments.push(department.clone());
        info!(id = %department.base.id, name = %department.name, "Department created");
        self.record(
            ItemType::Department,
            Action::Created,
            department.base.id,
            &department.name,
            AuditDetails::Department {
                department: department.clone(),
            },
        );
        department
    }

    pub fn update_department(&mut self, id: &Uuid, update: DepartmentUpdate) -> Result<Department> {
        let idx = position(&self.departments, id)
            .ok_or_else(|| SigndeskError::not_found("Department", id))?;
        let next = update.apply(&self.departments[idx]);
        self.departments[idx] = next.clone();
        info!(%id, "Department updated");
        self.record(
            ItemType::Department,
            Action::Updated,
            id,
            &next.name,
            AuditDetails::Department {
                department: next.clone(),
            },
        );
        Ok(next)
    }

    pub fn delete_department(&mut self, id: &Uuid) -> Result<()> {
        let idx = position(&self.departments, id)
            .ok_or_else(|| SigndeskError::not_found("Department", id))?;
        let removed = self.departments.remove(idx);
        info!(%id, "Department deleted");
        self.record(
            ItemType::Department,
            Action::Deleted,
            id,
            &removed.name,
            AuditDetails::Department { department: removed.clone() },
        );
        Ok(())
    }

    pub fn list_roles(&self) -> Vec<Role> {
        self.roles.clone()
    }

    pub fn get_role(&self, id: &Uuid) -> Option<Role> {
        find(&self.roles, id)
    }

    pub fn create_role(&mut self, new: NewRole) -> Role {
        let role = new.into_role();
        self.roles.push(role.clone());
        info!(id = %role.base.id, name = %role.name, "Role created");
        self.record(
            ItemType::Role,
            Action::Created,
            role.base.id,
            &role.name,
            AuditDetails::Role { role: role.clone() },
        );
        role
    }

    pub fn update_role(&mut self, id: &Uuid, update: RoleUpdate) -> Result<Role> {
        let idx = position(&self.roles, id).ok_or_else(|| SigndeskError::not_found("Role", id))?;
        let next = update.apply(&self.roles[idx]);
        self.roles[idx] = next.clone();
        info!(%id, "Role updated");
        self.record(
            ItemType::Role,
            Action::Updated,
            id,
            &next.name,
            AuditDetails::Role { role: next.clone() },
        );
        Ok(next)
    }

    pub fn delete_role(&mut self, id: &Uuid) -> Result<()> {
        let idx = position(&self.roles, id).ok_or_else(|| SigndeskError::not_found("Role", id))?;
        let removed = self.roles.remove(idx);
        info!(%id, "Role deleted");
        self.record(
            ItemType::Role,
            Action::Deleted,
            id,
            &removed.name,
            AuditDetails::Role { role: removed.clone() },
        );
        Ok(())
    }

    pub fn list_authorizers(&self) -> Vec<Authorizer> {
        self.authorizers.clone()
    }

    pub fn get_authorizer(&self, id: &Uuid) -> Option<Authorizer> {
        find(&self.authorizers, id)
    }

    pub fn create_authorizer(&mut self, new: NewAuthorizer) -> Authorizer {
        let authorizer = new.into_authorizer();
        self.authorizers.push(authorizer.clone());
        info!(id = %authorizer.base.id, name = %authorizer.name, "Authorizer created");
        self.record(
            ItemType::Authorizer,
            Action::Created,
            authorizer.base.id,
            &authorizer.name,
            AuditDetails::Authorizer {
                authorizer: authorizer.clone(),
            },
        );
        authorizer
    }

    pub fn update_authorizer(&mut self, id: &Uuid, update: AuthorizerUpdate) -> Result<Authorizer> {
        let idx = position(&self.authorizers, id)
            .ok_or_else(|| SigndeskError::not_found("Authorizer", id))?;
        let next = update.apply(&self.authorizers[idx]);
        self.authorizers[idx] = next.clone();
        info!(%id, "Authorizer updated");
        self.record(
            ItemType::Authorizer,
            Action::Updated,
            id,
            &next.name,
            AuditDetails::Authorizer {
                authorizer: next.clone(),
            },
        );
        Ok(next)
    }

    pub fn delete_authorizer(&mut self, id: &Uuid) -> Result<()> {
        let idx = position(&self.authorizers, id)
            .ok_or_else(|| SigndeskError::not_found("Authorizer", id))?;
        let removed = self.authorizers.remove(idx);
        info!(%id, "Authorizer deleted");
        self.record(
            ItemType::Authorizer,
            Action::Deleted,
            id,
            &removed.name,
            AuditDetails::Authorizer { authorizer: removed.clone() },
        );
        Ok(())
    }

    // ========================================================================
    // Settings, email templates, categories, subscription
    // ========================================================================

    /// Current value of a settings section; an empty object if never set.
    pub fn get_settings(&self, section: SettingsSection) -> serde_json::Value {
        self.settings
            .get(&section)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}))
    }

    /// Replace a settings section wholesale.
    pub fn put_settings(
        &mut self,
        section: SettingsSection,
        value: serde_json::Value,
    ) -> serde_json::Value {
        self.settings.insert(section, value.clone());
        info!(%section, "Settings replaced");
        self.record(
            ItemType::Settings,
            Action::Updated,
            section,
            &format!("{} settings", section),
            AuditDetails::Settings {
                section,
                value: value.clone(),
            },
        );
        value
    }

    pub fn list_email_templates(&self) -> Vec<EmailTemplate> {
        self.email_templates.clone()
    }

    pub fn get_email_template(&self, id: &Uuid) -> Option<EmailTemplate> {
        find(&self.email_templates, id)
    }

    pub fn create_email_template(&mut self, new: NewEmailTemplate) -> EmailTemplate {
        let template = new.into_email_template();
        self.email_templates.push(template.clone());
        info!(id = %template.base.id, event = %template.event, "Email template created");
        self.record(
            ItemType::EmailTemplate,
            Action::Created,
            template.base.id,
            &template.name,
            AuditDetails::EmailTemplate {
                template: template.clone(),
            },
        );
        template
    }

    pub fn update_email_template(
        &mut self,
        id: &Uuid,
        update: EmailTemplateUpdate,
    ) -> Option<EmailTemplate> {
        let Some(idx) = position(&self.email_templates, id) else {
            debug!(%id, "Email template not found; update skipped");
            return None;
        };
        let next = update.apply(&self.email_templates[idx]);
        self.email_templates[idx] = next.clone();
        info!(%id, "Email template updated");
        self.record(
            ItemType::EmailTemplate,
            Action::Updated,
            id,
            &next.name,
            AuditDetails::EmailTemplate {
                template: next.clone(),
            },
        );
        Some(next)
    }

    pub fn delete_email_template(&mut self, id: &Uuid) -> bool {
        let Some(idx) = position(&self.email_templates, id) else {
            debug!(%id, "Email template not found; delete skipped");
            return false;
        };
        let removed = self.email_templates.remove(idx);
        info!(%id, "Email template deleted");
        self.record(
            ItemType::EmailTemplate,
            Action::Deleted,
            id,
            &removed.name,
            AuditDetails::EmailTemplate { template: removed.clone() },
        );
        true
    }

    pub fn list_categories(&self) -> Vec<Category> {
        self.categories.clone()
    }

    pub fn create_category(&mut self, new: NewCategory) -> Category {
        let category = new.into_category();
        self.categories.push(category.clone());
        info!(id = %category.base.id, name = %category.name, "Category created");
        self.record(
            ItemType::Category,
            Action::Created,
            category.base.id,
            &category.name,
            AuditDetails::Category {
                category: category.clone(),
            },
        );
        category
    }

    pub fn list_subscription_plans(&self) -> Vec<SubscriptionPlan> {
        self.subscription_plans.clone()
    }

    pub fn get_subscription(&self) -> Option<Subscription> {
        self.subscription.clone()
    }

    pub fn put_subscription(&mut self, subscription: Subscription) -> Subscription {
        self.subscription = Some(subscription.clone());
        info!(plan_id = %subscription.plan_id, status = %subscription.status, "Subscription replaced");
        self.record(
            ItemType::Subscription,
            Action::Updated,
            subscription.plan_id,
            &subscription.status,
            AuditDetails::Subscription {
                subscription: subscription.clone(),
            },
        );
        subscription
    }

    // ========================================================================
    // Logs
    // ========================================================================

    pub fn recent_activities(&self, limit: Option<usize>) -> Vec<RecentActivity> {
        self.recorder.recent_activities(limit)
    }

    pub fn audit_logs(&self) -> Vec<AuditLog> {
        self.recorder.audit_logs()
    }

    pub fn audit_logs_for(&self, item_id: &Uuid) -> Vec<AuditLog> {
        self.recorder.audit_logs_for(&item_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{NewDocument, SettingsSection, TemplateStep};

    fn counts(store: &EntityStore) -> (usize, usize) {
        (store.recorder.activity_count(), store.recorder.audit_count())
    }

    fn assert_logged_once(store: &EntityStore, before: (usize, usize), id: Uuid, action: Action) {
        assert_eq!(counts(store), (before.0 + 1, before.1 + 1));
        let id = id.to_string();
        let log = &store.audit_logs()[0];
        assert_eq!(log.item_id, id);
        assert_eq!(log.action, action);
        assert_eq!(store.recent_activities(Some(1))[0].item_id, id);
    }

    fn request_signature(store: &mut EntityStore, document_id: Uuid) -> Signature {
        store
            .create_signature(NewSignature {
                document_id,
                assignee: "Alice".to_string(),
                due_date: None,
            })
            .unwrap()
    }

    #[test]
    fn test_create_document_logs_once() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));

        assert_eq!(store.list_documents().len(), 1);
        assert_eq!(counts(&store), (1, 1));
        let log = &store.audit_logs()[0];
        assert_eq!(log.item_id, doc.base.id.to_string());
        assert_eq!(log.action, Action::Created);
        assert_eq!(log.item_type, ItemType::Document);
    }

    #[test]
    fn test_update_missing_document_is_silent_noop() {
        let mut store = EntityStore::new();
        let result = store.update_document(&Uuid::new_v4(), DocumentUpdate::default());
        assert!(result.is_none());
        assert_eq!(counts(&store), (0, 0));
    }

    #[test]
    fn test_update_document_merges_and_logs() {
        let mut store = EntityStore::new();
        let mut new = NewDocument::named("A.pdf");
        new.branch = Some("North".to_string());
        let doc = store.create_document(new);

        let updated = store
            .update_document(&doc.base.id, DocumentUpdate::status(DocumentStatus::Declined))
            .unwrap();
        assert_eq!(updated.status, DocumentStatus::Declined);
        assert_eq!(updated.branch.as_deref(), Some("North"));
        assert_eq!(store.get_document(&doc.base.id).unwrap(), updated);
        assert_eq!(counts(&store), (2, 2));
        assert_eq!(store.audit_logs_for(&doc.base.id).len(), 2);
    }

    #[test]
    fn test_delete_document_returns_bool() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));

        assert!(store.delete_document(&doc.base.id));
        assert!(!store.delete_document(&doc.base.id));
        assert!(store.get_document(&doc.base.id).is_none());
        assert_eq!(counts(&store), (2, 2));
    }

    #[test]
    fn test_delete_missing_workflow_returns_false() {
        let mut store = EntityStore::new();
        assert!(!store.delete_workflow(&Uuid::new_v4()));
        assert!(store.update_workflow(&Uuid::new_v4(), WorkflowUpdate::default()).is_none());
        assert_eq!(counts(&store), (0, 0));
    }

    #[test]
    fn test_missing_department_role_authorizer_fail_with_not_found() {
        let mut store = EntityStore::new();
        let id = Uuid::new_v4();

        assert!(matches!(
            store.delete_department(&id),
            Err(SigndeskError::NotFound { kind: "Department", .. })
        ));
        assert!(matches!(
            store.update_role(&id, RoleUpdate::default()),
            Err(SigndeskError::NotFound { kind: "Role", .. })
        ));
        assert!(matches!(
            store.delete_authorizer(&id),
            Err(SigndeskError::NotFound { kind: "Authorizer", .. })
        ));
        assert_eq!(counts(&store), (0, 0));
    }

    #[test]
    fn test_department_update_and_delete() {
        let mut store = EntityStore::new();
        let dept = store.create_department(NewDepartment {
            name: "Retail".to_string(),
            ..Default::default()
        });

        let updated = store
            .update_department(
                &dept.base.id,
                DepartmentUpdate {
                    head: Some(Some("Rui".to_string())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.head.as_deref(), Some("Rui"));
        assert_eq!(updated.name, "Retail");

        store.delete_department(&dept.base.id).unwrap();
        assert!(store.list_departments().is_empty());
        assert_eq!(counts(&store), (3, 3));
    }

    #[test]
    fn test_resolving_signature_marks_document_signed_idempotently() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let sig = store
            .create_signature(NewSignature {
                document_id: doc.base.id,
                assignee: "Alice".to_string(),
                due_date: None,
            })
            .unwrap();

        let first = store.update_signature(&sig.base.id, SignatureUpdate::signed()).unwrap();
        assert!(first.is_signed());
        assert_eq!(
            store.get_document(&doc.base.id).unwrap().status,
            DocumentStatus::Signed
        );

        let second = store.update_signature(&sig.base.id, SignatureUpdate::signed()).unwrap();
        assert_eq!(second.signed_at, first.signed_at);
        assert_eq!(
            store.get_document(&doc.base.id).unwrap().status,
            DocumentStatus::Signed
        );
        assert_eq!(store.audit_logs()[0].action, Action::Signed);
    }

    #[test]
    fn test_workflow_mutations_log_once_each() {
        let mut store = EntityStore::new();

        let workflow = store.create_workflow(NewWorkflow {
            name: "Ad hoc".to_string(),
            steps: vec![TemplateStep::new("Review", "Checker")],
            document_id: None,
        });
        assert_logged_once(&store, (0, 0), workflow.base.id, Action::Created);

        let before = counts(&store);
        store
            .update_workflow(
                &workflow.base.id,
                WorkflowUpdate {
                    name: Some("Ad hoc review".to_string()),
                },
            )
            .unwrap();
        assert_logged_once(&store, before, workflow.base.id, Action::Updated);

        let before = counts(&store);
        assert!(store.delete_workflow(&workflow.base.id));
        assert_logged_once(&store, before, workflow.base.id, Action::Deleted);
    }

    #[test]
    fn test_template_mutations_log_once_each() {
        let mut store = EntityStore::new();
        let template = store.create_template(NewTemplate {
            name: "Loan agreement".to_string(),
            category: "Loans".to_string(),
            ..Default::default()
        });
        assert_logged_once(&store, (0, 0), template.base.id, Action::Created);

        let before = counts(&store);
        let updated = store
            .update_template(
                &template.base.id,
                TemplateUpdate {
                    content: Some(Some("Terms".to_string())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Loan agreement");
        assert_logged_once(&store, before, template.base.id, Action::Updated);

        let before = counts(&store);
        assert!(store.delete_template(&template.base.id));
        assert_logged_once(&store, before, template.base.id, Action::Deleted);
    }

    #[test]
    fn test_signature_mutations_log_once_each() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));

        let before = counts(&store);
        let sig = request_signature(&mut store, doc.base.id);
        assert_logged_once(&store, before, sig.base.id, Action::Created);

        let before = counts(&store);
        store
            .update_signature(
                &sig.base.id,
                SignatureUpdate {
                    assignee: Some("Bruno".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_logged_once(&store, before, sig.base.id, Action::Updated);

        // The document flip is part of the same entry.
        let before = counts(&store);
        store.update_signature(&sig.base.id, SignatureUpdate::signed()).unwrap();
        assert_logged_once(&store, before, sig.base.id, Action::Signed);

        let before = counts(&store);
        assert!(store.delete_signature(&sig.base.id));
        assert_logged_once(&store, before, sig.base.id, Action::Deleted);
    }

    #[test]
    fn test_resolving_signature_leaves_recalled_document() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let sig = request_signature(&mut store, doc.base.id);
        store
            .update_document(&doc.base.id, DocumentUpdate::status(DocumentStatus::Recalled))
            .unwrap();

        let signed = store.update_signature(&sig.base.id, SignatureUpdate::signed()).unwrap();
        assert!(signed.is_signed());
        assert_eq!(
            store.get_document(&doc.base.id).unwrap().status,
            DocumentStatus::Recalled
        );
        assert!(matches!(
            &store.audit_logs()[0].details,
            AuditDetails::SignatureResolved { document: None, .. }
        ));
    }

    #[test]
    fn test_document_history_includes_signature_resolution() {
        let mut store = EntityStore::new();
        let doc = store.create_document(NewDocument::named("A.pdf"));
        let sig = request_signature(&mut store, doc.base.id);
        store.update_signature(&sig.base.id, SignatureUpdate::signed()).unwrap();

        let history = store.audit_logs_for(&doc.base.id);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].item_type, ItemType::Signature);
        assert_eq!(history[0].action, Action::Signed);
        match &history[0].details {
            AuditDetails::SignatureResolved {
                document: Some(document),
                ..
            } => assert_eq!(document.status, DocumentStatus::Signed),
            other => panic!("unexpected details: {:?}", other),
        }
        assert_eq!(history[1].action, Action::Created);
    }

    #[test]
    fn test_signature_for_missing_document_is_not_created() {
        let mut store = EntityStore::new();
        let result = store.create_signature(NewSignature {
            document_id: Uuid::new_v4(),
            assignee: "Alice".to_string(),
            due_date: None,
        });
        assert!(result.is_none());
        assert!(store.list_signatures().is_empty());
        assert_eq!(counts(&store), (0, 0));
    }

    #[test]
    fn test_settings_default_to_empty_object_and_replace() {
        let mut store = EntityStore::new();
        assert_eq!(store.get_settings(SettingsSection::Pdf), serde_json::json!({}));

        store.put_settings(SettingsSection::Pdf, serde_json::json!({"page_size": "A4"}));
        store.put_settings(SettingsSection::Pdf, serde_json::json!({"watermark": true}));

        assert_eq!(
            store.get_settings(SettingsSection::Pdf),
            serde_json::json!({"watermark": true})
        );
        assert_eq!(counts(&store), (2, 2));
    }

    #[test]
    fn test_reset_clears_everything_and_keeps_subscribers() {
        let mut store = EntityStore::new();
        let mut rx = store.subscribe();
        store.set_actor(Actor::new("u1", "Ana"));
        store.create_document(NewDocument::named("A.pdf"));
        store.reset();

        assert!(store.list_documents().is_empty());
        assert!(store.audit_logs().is_empty());
        assert_eq!(store.actor(), &Actor::system());

        store.create_document(NewDocument::named("B.pdf"));
        let first = rx.try_recv().unwrap();
        assert_eq!(first.item_name, "A.pdf");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.item_name, "B.pdf");
    }

    #[test]
    fn test_log_entries_use_current_actor() {
        let mut store = EntityStore::new();
        store.set_actor(Actor::new("u7", "Mina"));
        store.create_template(NewTemplate {
            name: "Loan agreement".to_string(),
            category: "Loans".to_string(),
            ..Default::default()
        });
        let activity = &store.recent_activities(None)[0];
        assert_eq!(activity.user_id, "u7");
        assert_eq!(activity.user_name, "Mina");
    }
}
