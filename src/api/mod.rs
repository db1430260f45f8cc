//! API facade.
//!
//! The single entry point for callers. Every method either waits the
//! configured artificial delay and delegates to the in-process
//! [`EntityStore`], or issues one REST call to a remote backend. The mode is
//! chosen once, by [`Config::use_remote`].

pub mod poll;
mod remote;

pub use remote::{RemoteClient, ACTOR_ID_HEADER, ACTOR_NAME_HEADER};

use std::time::Duration;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::entity::{
    Actor, AuditLog, Authorizer, Category, Department, Document, EmailTemplate, NewAuthorizer,
    NewCategory, NewDepartment, NewDocument, NewEmailTemplate, NewRole, NewSignature,
    NewTemplate, NewWorkflow, NewWorkflowTemplate, RecentActivity, Role, SettingsSection,
    Signature, Subscription, SubscriptionPlan, Template, Workflow, WorkflowTemplate,
};
use crate::error::Result;
use crate::storage::{
    Advance, AuthorizerUpdate, DepartmentUpdate, DocumentUpdate, EmailTemplateUpdate,
    EntityStore, RoleUpdate, SignatureUpdate, StoreEvent, StoreHandle, TemplateUpdate,
    WorkflowBinding, WorkflowTemplateUpdate, WorkflowUpdate,
};

/// Body of `POST /documents/{id}/workflow`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BindRequest {
    pub template_id: Uuid,
}

#[derive(Clone)]
enum Backend {
    Local(StoreHandle),
    Remote(RemoteClient),
}

#[derive(Clone)]
pub struct Api {
    backend: Backend,
    latency: Duration,
}

impl Api {
    /// Facade over an in-process store with an artificial per-call delay.
    pub fn local(store: StoreHandle, latency: Duration) -> Self {
        Self {
            backend: Backend::Local(store),
            latency,
        }
    }

    pub fn remote(client: RemoteClient) -> Self {
        Self {
            backend: Backend::Remote(client),
            latency: Duration::ZERO,
        }
    }

    /// Pick the backend from `config`; `store` is used in local mode only.
    /// Mutations are attributed to `actor` when given.
    pub async fn from_config(
        config: &Config,
        store: StoreHandle,
        actor: Option<Actor>,
    ) -> Result<Self> {
        if config.use_remote {
            let mut client = RemoteClient::new(config.api_base_url.clone())?;
            if let Some(actor) = actor {
                client = client.with_actor(actor);
            }
            Ok(Self::remote(client))
        } else {
            if let Some(actor) = actor {
                store.lock().await.set_actor(actor);
            }
            Ok(Self::local(store, config.latency()))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.backend, Backend::Remote(_))
    }

    /// Change feed of the local store. Remote mode has none; callers fall
    /// back to polling.
    pub async fn subscribe(&self) -> Option<broadcast::Receiver<StoreEvent>> {
        match &self.backend {
            Backend::Local(store) => Some(store.lock().await.subscribe()),
            Backend::Remote(_) => None,
        }
    }

    async fn with_store<R>(
        &self,
        store: &StoreHandle,
        op: impl FnOnce(&mut EntityStore) -> R,
    ) -> R {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let mut guard = store.lock().await;
        op(&mut guard)
    }

    // ========================================================================
    // Documents and workflow engine
    // ========================================================================

    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.list_documents()).await),
            Backend::Remote(client) => client.get("/documents").await,
        }
    }

    pub async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.get_document(&id)).await),
            Backend::Remote(client) => client.get_optional(&format!("/documents/{}", id)).await,
        }
    }

    pub async fn create_document(&self, new: NewDocument) -> Result<Document> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.create_document(new)).await),
            Backend::Remote(client) => client.post("/documents", &new).await,
        }
    }

    pub async fn update_document(
        &self,
        id: Uuid,
        update: DocumentUpdate,
    ) -> Result<Option<Document>> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.update_document(&id, update)).await)
            }
            Backend::Remote(client) => {
                client
                    .patch_optional(&format!("/documents/{}", id), &update)
                    .await
            }
        }
    }

    pub async fn delete_document(&self, id: Uuid) -> Result<bool> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.delete_document(&id)).await),
            Backend::Remote(client) => client.delete(&format!("/documents/{}", id)).await,
        }
    }

    /// Add a draft document to a workflow built from `template_id`.
    pub async fn bind_workflow(
        &self,
        document_id: Uuid,
        template_id: Uuid,
    ) -> Result<Option<WorkflowBinding>> {
        match &self.backend {
            Backend::Local(store) => Ok(self
                .with_store(store, |s| s.bind_workflow(&document_id, &template_id))
                .await),
            Backend::Remote(client) => {
                client
                    .post(
                        &format!("/documents/{}/workflow", document_id),
                        &BindRequest { template_id },
                    )
                    .await
            }
        }
    }

    pub async fn advance_document(&self, document_id: Uuid) -> Result<Option<Advance>> {
        match &self.backend {
            Backend::Local(store) => Ok(self
                .with_store(store, |s| s.advance_document(&document_id))
                .await),
            Backend::Remote(client) => {
                client
                    .post(
                        &format!("/documents/{}/advance", document_id),
                        &serde_json::json!({}),
                    )
                    .await
            }
        }
    }

    // ========================================================================
    // Workflows
    // ========================================================================

    pub async fn list_workflows(&self) -> Result<Vec<Workflow>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.list_workflows()).await),
            Backend::Remote(client) => client.get("/workflows").await,
        }
    }

    pub async fn get_workflow(&self, id: Uuid) -> Result<Option<Workflow>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.get_workflow(&id)).await),
            Backend::Remote(client) => client.get_optional(&format!("/workflows/{}", id)).await,
        }
    }

    pub async fn create_workflow(&self, new: NewWorkflow) -> Result<Workflow> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.create_workflow(new)).await),
            Backend::Remote(client) => client.post("/workflows", &new).await,
        }
    }

    pub async fn update_workflow(
        &self,
        id: Uuid,
        update: WorkflowUpdate,
    ) -> Result<Option<Workflow>> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.update_workflow(&id, update)).await)
            }
            Backend::Remote(client) => {
                client
                    .patch_optional(&format!("/workflows/{}", id), &update)
                    .await
            }
        }
    }

    pub async fn delete_workflow(&self, id: Uuid) -> Result<bool> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.delete_workflow(&id)).await),
            Backend::Remote(client) => client.delete(&format!("/workflows/{}", id)).await,
        }
    }

    // ========================================================================
    // Workflow templates
    // ========================================================================

    pub async fn list_workflow_templates(&self) -> Result<Vec<WorkflowTemplate>> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.list_workflow_templates()).await)
            }
            Backend::Remote(client) => client.get("/workflow-templates").await,
        }
    }

    pub async fn get_workflow_template(&self, id: Uuid) -> Result<Option<WorkflowTemplate>> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.get_workflow_template(&id)).await)
            }
            Backend::Remote(client) => {
                client
                    .get_optional(&format!("/workflow-templates/{}", id))
                    .await
            }
        }
    }

    pub async fn create_workflow_template(
        &self,
        new: NewWorkflowTemplate,
    ) -> Result<WorkflowTemplate> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.create_workflow_template(new)).await)
            }
            Backend::Remote(client) => client.post("/workflow-templates", &new).await,
        }
    }

    pub async fn update_workflow_template(
        &self,
        id: Uuid,
        update: WorkflowTemplateUpdate,
    ) -> Result<Option<WorkflowTemplate>> {
        match &self.backend {
            Backend::Local(store) => Ok(self
                .with_store(store, |s| s.update_workflow_template(&id, update))
                .await),
            Backend::Remote(client) => {
                client
                    .patch_optional(&format!("/workflow-templates/{}", id), &update)
                    .await
            }
        }
    }

    pub async fn delete_workflow_template(&self, id: Uuid) -> Result<bool> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.delete_workflow_template(&id)).await)
            }
            Backend::Remote(client) => {
                client.delete(&format!("/workflow-templates/{}", id)).await
            }
        }
    }

    // ========================================================================
    // Signatures
    // ========================================================================

    pub async fn list_signatures(&self) -> Result<Vec<Signature>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.list_signatures()).await),
            Backend::Remote(client) => client.get("/signatures").await,
        }
    }

    pub async fn get_signature(&self, id: Uuid) -> Result<Option<Signature>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.get_signature(&id)).await),
            Backend::Remote(client) => client.get_optional(&format!("/signatures/{}", id)).await,
        }
    }

    /// `None` when the referenced document does not exist.
    pub async fn create_signature(&self, new: NewSignature) -> Result<Option<Signature>> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.create_signature(new)).await)
            }
            Backend::Remote(client) => client.post_optional("/signatures", &new).await,
        }
    }

    pub async fn update_signature(
        &self,
        id: Uuid,
        update: SignatureUpdate,
    ) -> Result<Option<Signature>> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.update_signature(&id, update)).await)
            }
            Backend::Remote(client) => {
                client
                    .patch_optional(&format!("/signatures/{}", id), &update)
                    .await
            }
        }
    }

    /// Resolve a signature to `Signed`.
    pub async fn sign(&self, id: Uuid) -> Result<Option<Signature>> {
        self.update_signature(id, SignatureUpdate::signed()).await
    }

    pub async fn delete_signature(&self, id: Uuid) -> Result<bool> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.delete_signature(&id)).await),
            Backend::Remote(client) => client.delete(&format!("/signatures/{}", id)).await,
        }
    }

    // ========================================================================
    // Document templates
    // ========================================================================

    pub async fn list_templates(&self) -> Result<Vec<Template>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.list_templates()).await),
            Backend::Remote(client) => client.get("/templates").await,
        }
    }

    pub async fn get_template(&self, id: Uuid) -> Result<Option<Template>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.get_template(&id)).await),
            Backend::Remote(client) => client.get_optional(&format!("/templates/{}", id)).await,
        }
    }

    pub async fn create_template(&self, new: NewTemplate) -> Result<Template> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.create_template(new)).await),
            Backend::Remote(client) => client.post("/templates", &new).await,
        }
    }

    pub async fn update_template(
        &self,
        id: Uuid,
        update: TemplateUpdate,
    ) -> Result<Option<Template>> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.update_template(&id, update)).await)
            }
            Backend::Remote(client) => {
                client
                    .patch_optional(&format!("/templates/{}", id), &update)
                    .await
            }
        }
    }

    pub async fn delete_template(&self, id: Uuid) -> Result<bool> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.delete_template(&id)).await),
            Backend::Remote(client) => client.delete(&format!("/templates/{}", id)).await,
        }
    }

    // ========================================================================
    // Departments, roles, authorizers: update/delete fail with NotFound
    // ========================================================================

    pub async fn list_departments(&self) -> Result<Vec<Department>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.list_departments()).await),
            Backend::Remote(client) => client.get("/departments").await,
        }
    }

    pub async fn get_department(&self, id: Uuid) -> Result<Option<Department>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.get_department(&id)).await),
            Backend::Remote(client) => client.get_optional(&format!("/departments/{}", id)).await,
        }
    }

    pub async fn create_department(&self, new: NewDepartment) -> Result<Department> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.create_department(new)).await)
            }
            Backend::Remote(client) => client.post("/departments", &new).await,
        }
    }

    pub async fn update_department(
        &self,
        id: Uuid,
        update: DepartmentUpdate,
    ) -> Result<Department> {
        match &self.backend {
            Backend::Local(store) => {
                self.with_store(store, |s| s.update_department(&id, update))
                    .await
            }
            Backend::Remote(client) => {
                client
                    .put_existing("Department", id, &format!("/departments/{}", id), &update)
                    .await
            }
        }
    }

    pub async fn delete_department(&self, id: Uuid) -> Result<()> {
        match &self.backend {
            Backend::Local(store) => self.with_store(store, |s| s.delete_department(&id)).await,
            Backend::Remote(client) => {
                client
                    .delete_existing("Department", id, &format!("/departments/{}", id))
                    .await
            }
        }
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.list_roles()).await),
            Backend::Remote(client) => client.get("/roles").await,
        }
    }

    pub async fn get_role(&self, id: Uuid) -> Result<Option<Role>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.get_role(&id)).await),
            Backend::Remote(client) => client.get_optional(&format!("/roles/{}", id)).await,
        }
    }

    pub async fn create_role(&self, new: NewRole) -> Result<Role> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.create_role(new)).await),
            Backend::Remote(client) => client.post("/roles", &new).await,
        }
    }

    pub async fn update_role(&self, id: Uuid, update: RoleUpdate) -> Result<Role> {
        match &self.backend {
            Backend::Local(store) => self.with_store(store, |s| s.update_role(&id, update)).await,
            Backend::Remote(client) => {
                client
                    .put_existing("Role", id, &format!("/roles/{}", id), &update)
                    .await
            }
        }
    }

    pub async fn delete_role(&self, id: Uuid) -> Result<()> {
        match &self.backend {
            Backend::Local(store) => self.with_store(store, |s| s.delete_role(&id)).await,
            Backend::Remote(client) => {
                client
                    .delete_existing("Role", id, &format!("/roles/{}", id))
                    .await
            }
        }
    }

    pub async fn list_authorizers(&self) -> Result<Vec<Authorizer>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.list_authorizers()).await),
            Backend::Remote(client) => client.get("/authorizers").await,
        }
    }

    pub async fn get_authorizer(&self, id: Uuid) -> Result<Option<Authorizer>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.get_authorizer(&id)).await),
            Backend::Remote(client) => client.get_optional(&format!("/authorizers/{}", id)).await,
        }
    }

    pub async fn create_authorizer(&self, new: NewAuthorizer) -> Result<Authorizer> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.create_authorizer(new)).await)
            }
            Backend::Remote(client) => client.post("/authorizers", &new).await,
        }
    }

    pub async fn update_authorizer(
        &self,
        id: Uuid,
        update: AuthorizerUpdate,
    ) -> Result<Authorizer> {
        match &self.backend {
            Backend::Local(store) => {
                self.with_store(store, |s| s.update_authorizer(&id, update))
                    .await
            }
            Backend::Remote(client) => {
                client
                    .put_existing("Authorizer", id, &format!("/authorizers/{}", id), &update)
                    .await
            }
        }
    }

    pub async fn delete_authorizer(&self, id: Uuid) -> Result<()> {
        match &self.backend {
            Backend::Local(store) => self.with_store(store, |s| s.delete_authorizer(&id)).await,
            Backend::Remote(client) => {
                client
                    .delete_existing("Authorizer", id, &format!("/authorizers/{}", id))
                    .await
            }
        }
    }

    // ========================================================================
    // Settings, email templates, categories, subscription
    // ========================================================================

    pub async fn get_settings(&self, section: SettingsSection) -> Result<serde_json::Value> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.get_settings(section)).await),
            Backend::Remote(client) => client.get(section.path()).await,
        }
    }

    pub async fn put_settings(
        &self,
        section: SettingsSection,
        value: serde_json::Value,
    ) -> Result<serde_json::Value> {
        match &self.backend {
            Backend::Local(store) => Ok(self
                .with_store(store, |s| s.put_settings(section, value))
                .await),
            Backend::Remote(client) => client.put(section.path(), &value).await,
        }
    }

    pub async fn list_email_templates(&self) -> Result<Vec<EmailTemplate>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.list_email_templates()).await),
            Backend::Remote(client) => client.get("/email-templates").await,
        }
    }

    pub async fn get_email_template(&self, id: Uuid) -> Result<Option<EmailTemplate>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.get_email_template(&id)).await),
            Backend::Remote(client) => client.get_optional(&format!("/email-templates/{}", id)).await,
        }
    }

    pub async fn create_email_template(&self, new: NewEmailTemplate) -> Result<EmailTemplate> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.create_email_template(new)).await)
            }
            Backend::Remote(client) => client.post("/email-templates", &new).await,
        }
    }

    pub async fn update_email_template(
        &self,
        id: Uuid,
        update: EmailTemplateUpdate,
    ) -> Result<Option<EmailTemplate>> {
        match &self.backend {
            Backend::Local(store) => Ok(self
                .with_store(store, |s| s.update_email_template(&id, update))
                .await),
            Backend::Remote(client) => {
                client
                    .patch_optional(&format!("/email-templates/{}", id), &update)
                    .await
            }
        }
    }

    pub async fn delete_email_template(&self, id: Uuid) -> Result<bool> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.delete_email_template(&id)).await)
            }
            Backend::Remote(client) => client.delete(&format!("/email-templates/{}", id)).await,
        }
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.list_categories()).await),
            Backend::Remote(client) => client.get("/categories").await,
        }
    }

    pub async fn create_category(&self, new: NewCategory) -> Result<Category> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.create_category(new)).await),
            Backend::Remote(client) => client.post("/categories", &new).await,
        }
    }

    pub async fn list_subscription_plans(&self) -> Result<Vec<SubscriptionPlan>> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.list_subscription_plans()).await)
            }
            Backend::Remote(client) => client.get("/subscription-plans").await,
        }
    }

    pub async fn get_subscription(&self) -> Result<Option<Subscription>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.get_subscription()).await),
            Backend::Remote(client) => client.get_optional("/subscription").await,
        }
    }

    pub async fn put_subscription(&self, subscription: Subscription) -> Result<Subscription> {
        match &self.backend {
            Backend::Local(store) => Ok(self
                .with_store(store, |s| s.put_subscription(subscription))
                .await),
            Backend::Remote(client) => client.put("/subscription", &subscription).await,
        }
    }

    // ========================================================================
    // Logs
    // ========================================================================

    pub async fn recent_activities(&self, limit: Option<usize>) -> Result<Vec<RecentActivity>> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.recent_activities(limit)).await)
            }
            Backend::Remote(client) => {
                let path = match limit {
                    Some(limit) => format!("/recent-activities?limit={}", limit),
                    None => "/recent-activities".to_string(),
                };
                client.get(&path).await
            }
        }
    }

    pub async fn audit_logs(&self) -> Result<Vec<AuditLog>> {
        match &self.backend {
            Backend::Local(store) => Ok(self.with_store(store, |s| s.audit_logs()).await),
            Backend::Remote(client) => client.get("/audit-logs").await,
        }
    }

    /// Entries about one item, including changes it received as a side effect.
    pub async fn audit_logs_for(&self, item_id: Uuid) -> Result<Vec<AuditLog>> {
        match &self.backend {
            Backend::Local(store) => {
                Ok(self.with_store(store, |s| s.audit_logs_for(&item_id)).await)
            }
            Backend::Remote(client) => {
                client
                    .get(&format!("/audit-logs?item_id={}", item_id))
                    .await
            }
        }
    }
}
