//! Route handlers. Each one takes the store lock for a single operation.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::json_error;
use crate::api::{BindRequest, ACTOR_ID_HEADER, ACTOR_NAME_HEADER};
use crate::entity::{
    Actor, AuditLog, Authorizer, Category, Department, Document, EmailTemplate,
    NewAuthorizer, NewCategory, NewDepartment, NewDocument, NewEmailTemplate, NewRole,
    NewSignature, NewTemplate, NewWorkflow, NewWorkflowTemplate, RecentActivity, Role,
    SettingsSection, Signature, Subscription, SubscriptionPlan, Template, Workflow,
    WorkflowTemplate,
};
use crate::error::SigndeskError;
use crate::storage::{
    Advance, AuthorizerUpdate, DepartmentUpdate, DocumentUpdate, EmailTemplateUpdate,
    EntityStore, RoleUpdate, SignatureUpdate, StoreHandle, TemplateUpdate, WorkflowBinding,
    WorkflowTemplateUpdate, WorkflowUpdate,
};

/// The user a request is attributed to, from the `x-signdesk-actor-*`
/// headers. Absent headers leave the store's actor in place.
pub(crate) struct RequestActor(Option<Actor>);

impl<S: Send + Sync> FromRequestParts<S> for RequestActor {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        };
        let actor = header(ACTOR_ID_HEADER).map(|id| {
            let name = header(ACTOR_NAME_HEADER).unwrap_or_else(|| id.clone());
            Actor::new(id, name)
        });
        Ok(RequestActor(actor))
    }
}

/// Run one mutation attributed to `actor`, restoring the store's own actor
/// afterwards.
async fn mutate<R>(
    store: &StoreHandle,
    actor: RequestActor,
    op: impl FnOnce(&mut EntityStore) -> R,
) -> R {
    let mut guard = store.lock().await;
    match actor.0 {
        Some(actor) => {
            let previous = guard.actor().clone();
            guard.set_actor(actor);
            let out = op(&mut guard);
            guard.set_actor(previous);
            out
        }
        None => op(&mut guard),
    }
}

fn found<T: Serialize>(value: Option<T>, kind: &str, id: &Uuid) -> Response {
    match value {
        Some(value) => Json(value).into_response(),
        None => json_error(StatusCode::NOT_FOUND, &format!("{} not found: {}", kind, id)),
    }
}

fn deleted(existed: bool, kind: &str, id: &Uuid) -> Response {
    if existed {
        StatusCode::NO_CONTENT.into_response()
    } else {
        json_error(StatusCode::NOT_FOUND, &format!("{} not found: {}", kind, id))
    }
}

fn outcome<T: Serialize>(result: crate::error::Result<T>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e @ SigndeskError::NotFound { .. }) => {
            json_error(StatusCode::NOT_FOUND, &e.to_string())
        }
        Err(e) => json_error(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
    }
}

/// Fallback for unmatched routes.
pub(crate) async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ============================================================================
// Documents and workflow engine
// ============================================================================

pub(crate) async fn list_documents(State(store): State<StoreHandle>) -> Json<Vec<Document>> {
    Json(store.lock().await.list_documents())
}

pub(crate) async fn get_document(
    State(store): State<StoreHandle>,
    Path(id): Path<Uuid>,
) -> Response {
    found(store.lock().await.get_document(&id), "Document", &id)
}

pub(crate) async fn create_document(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Json(new): Json<NewDocument>,
) -> Json<Document> {
    Json(mutate(&store, actor, |s| s.create_document(new)).await)
}

pub(crate) async fn update_document(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
    Json(update): Json<DocumentUpdate>,
) -> Response {
    let updated = mutate(&store, actor, |s| s.update_document(&id, update)).await;
    found(updated, "Document", &id)
}

pub(crate) async fn delete_document(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
) -> Response {
    let existed = mutate(&store, actor, |s| s.delete_document(&id)).await;
    deleted(existed, "Document", &id)
}

/// POST /documents/{id}/workflow
pub(crate) async fn bind_workflow(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
    Json(request): Json<BindRequest>,
) -> Json<Option<WorkflowBinding>> {
    Json(mutate(&store, actor, |s| s.bind_workflow(&id, &request.template_id)).await)
}

/// POST /documents/{id}/advance
pub(crate) async fn advance_document(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
) -> Json<Option<Advance>> {
    Json(mutate(&store, actor, |s| s.advance_document(&id)).await)
}

// ============================================================================
// Workflows
// ============================================================================

pub(crate) async fn list_workflows(State(store): State<StoreHandle>) -> Json<Vec<Workflow>> {
    Json(store.lock().await.list_workflows())
}

pub(crate) async fn get_workflow(
    State(store): State<StoreHandle>,
    Path(id): Path<Uuid>,
) -> Response {
    found(store.lock().await.get_workflow(&id), "Workflow", &id)
}

pub(crate) async fn create_workflow(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Json(new): Json<NewWorkflow>,
) -> Json<Workflow> {
    Json(mutate(&store, actor, |s| s.create_workflow(new)).await)
}

pub(crate) async fn update_workflow(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
    Json(update): Json<WorkflowUpdate>,
) -> Response {
    let updated = mutate(&store, actor, |s| s.update_workflow(&id, update)).await;
    found(updated, "Workflow", &id)
}

pub(crate) async fn delete_workflow(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
) -> Response {
    let existed = mutate(&store, actor, |s| s.delete_workflow(&id)).await;
    deleted(existed, "Workflow", &id)
}

// ============================================================================
// Workflow templates
// ============================================================================

pub(crate) async fn list_workflow_templates(
    State(store): State<StoreHandle>,
) -> Json<Vec<WorkflowTemplate>> {
    Json(store.lock().await.list_workflow_templates())
}

pub(crate) async fn get_workflow_template(
    State(store): State<StoreHandle>,
    Path(id): Path<Uuid>,
) -> Response {
    found(
        store.lock().await.get_workflow_template(&id),
        "Workflow template",
        &id,
    )
}

pub(crate) async fn create_workflow_template(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Json(new): Json<NewWorkflowTemplate>,
) -> Json<WorkflowTemplate> {
    Json(mutate(&store, actor, |s| s.create_workflow_template(new)).await)
}

pub(crate) async fn update_workflow_template(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
    Json(update): Json<WorkflowTemplateUpdate>,
) -> Response {
    let updated = mutate(&store, actor, |s| s.update_workflow_template(&id, update)).await;
    found(updated, "Workflow template", &id)
}

pub(crate) async fn delete_workflow_template(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
) -> Response {
    let existed = mutate(&store, actor, |s| s.delete_workflow_template(&id)).await;
    deleted(existed, "Workflow template", &id)
}

// ============================================================================
// Signatures
// ============================================================================

pub(crate) async fn list_signatures(State(store): State<StoreHandle>) -> Json<Vec<Signature>> {
    Json(store.lock().await.list_signatures())
}

pub(crate) async fn get_signature(
    State(store): State<StoreHandle>,
    Path(id): Path<Uuid>,
) -> Response {
    found(store.lock().await.get_signature(&id), "Signature", &id)
}

pub(crate) async fn create_signature(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Json(new): Json<NewSignature>,
) -> Response {
    let document_id = new.document_id;
    let created = mutate(&store, actor, |s| s.create_signature(new)).await;
    found(created, "Document", &document_id)
}

pub(crate) async fn update_signature(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
    Json(update): Json<SignatureUpdate>,
) -> Response {
    let updated = mutate(&store, actor, |s| s.update_signature(&id, update)).await;
    found(updated, "Signature", &id)
}

pub(crate) async fn delete_signature(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
) -> Response {
    let existed = mutate(&store, actor, |s| s.delete_signature(&id)).await;
    deleted(existed, "Signature", &id)
}

// ============================================================================
// Document templates
// ============================================================================

pub(crate) async fn list_templates(State(store): State<StoreHandle>) -> Json<Vec<Template>> {
    Json(store.lock().await.list_templates())
}

pub(crate) async fn get_template(
    State(store): State<StoreHandle>,
    Path(id): Path<Uuid>,
) -> Response {
    found(store.lock().await.get_template(&id), "Template", &id)
}

pub(crate) async fn create_template(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Json(new): Json<NewTemplate>,
) -> Json<Template> {
    Json(mutate(&store, actor, |s| s.create_template(new)).await)
}

pub(crate) async fn update_template(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
    Json(update): Json<TemplateUpdate>,
) -> Response {
    let updated = mutate(&store, actor, |s| s.update_template(&id, update)).await;
    found(updated, "Template", &id)
}

pub(crate) async fn delete_template(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
) -> Response {
    let existed = mutate(&store, actor, |s| s.delete_template(&id)).await;
    deleted(existed, "Template", &id)
}

// ============================================================================
// Departments, roles, authorizers
// ============================================================================

pub(crate) async fn list_departments(State(store): State<StoreHandle>) -> Json<Vec<Department>> {
    Json(store.lock().await.list_departments())
}

pub(crate) async fn get_department(
    State(store): State<StoreHandle>,
    Path(id): Path<Uuid>,
) -> Response {
    found(store.lock().await.get_department(&id), "Department", &id)
}

pub(crate) async fn create_department(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Json(new): Json<NewDepartment>,
) -> Json<Department> {
    Json(mutate(&store, actor, |s| s.create_department(new)).await)
}

pub(crate) async fn update_department(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
    Json(update): Json<DepartmentUpdate>,
) -> Response {
    outcome(mutate(&store, actor, |s| s.update_department(&id, update)).await)
}

pub(crate) async fn delete_department(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
) -> Response {
    match mutate(&store, actor, |s| s.delete_department(&id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => outcome::<()>(Err(e)),
    }
}

pub(crate) async fn list_roles(State(store): State<StoreHandle>) -> Json<Vec<Role>> {
    Json(store.lock().await.list_roles())
}

pub(crate) async fn get_role(
    State(store): State<StoreHandle>,
    Path(id): Path<Uuid>,
) -> Response {
    found(store.lock().await.get_role(&id), "Role", &id)
}

pub(crate) async fn create_role(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Json(new): Json<NewRole>,
) -> Json<Role> {
    Json(mutate(&store, actor, |s| s.create_role(new)).await)
}

pub(crate) async fn update_role(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
    Json(update): Json<RoleUpdate>,
) -> Response {
    outcome(mutate(&store, actor, |s| s.update_role(&id, update)).await)
}

pub(crate) async fn delete_role(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
) -> Response {
    match mutate(&store, actor, |s| s.delete_role(&id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => outcome::<()>(Err(e)),
    }
}

pub(crate) async fn list_authorizers(State(store): State<StoreHandle>) -> Json<Vec<Authorizer>> {
    Json(store.lock().await.list_authorizers())
}

pub(crate) async fn get_authorizer(
    State(store): State<StoreHandle>,
    Path(id): Path<Uuid>,
) -> Response {
    found(store.lock().await.get_authorizer(&id), "Authorizer", &id)
}

pub(crate) async fn create_authorizer(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Json(new): Json<NewAuthorizer>,
) -> Json<Authorizer> {
    Json(mutate(&store, actor, |s| s.create_authorizer(new)).await)
}

pub(crate) async fn update_authorizer(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
    Json(update): Json<AuthorizerUpdate>,
) -> Response {
    outcome(mutate(&store, actor, |s| s.update_authorizer(&id, update)).await)
}

pub(crate) async fn delete_authorizer(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
) -> Response {
    match mutate(&store, actor, |s| s.delete_authorizer(&id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => outcome::<()>(Err(e)),
    }
}

// ============================================================================
// Settings, email templates, categories, subscription
// ============================================================================

pub(crate) async fn get_settings(
    store: StoreHandle,
    section: SettingsSection,
) -> Json<serde_json::Value> {
    Json(store.lock().await.get_settings(section))
}

pub(crate) async fn put_settings(
    store: StoreHandle,
    actor: RequestActor,
    section: SettingsSection,
    value: serde_json::Value,
) -> Json<serde_json::Value> {
    Json(mutate(&store, actor, |s| s.put_settings(section, value)).await)
}

pub(crate) async fn list_email_templates(
    State(store): State<StoreHandle>,
) -> Json<Vec<EmailTemplate>> {
    Json(store.lock().await.list_email_templates())
}

pub(crate) async fn get_email_template(
    State(store): State<StoreHandle>,
    Path(id): Path<Uuid>,
) -> Response {
    found(store.lock().await.get_email_template(&id), "Email template", &id)
}

pub(crate) async fn create_email_template(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Json(new): Json<NewEmailTemplate>,
) -> Json<EmailTemplate> {
    Json(mutate(&store, actor, |s| s.create_email_template(new)).await)
}

pub(crate) async fn update_email_template(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
    Json(update): Json<EmailTemplateUpdate>,
) -> Response {
    let updated = mutate(&store, actor, |s| s.update_email_template(&id, update)).await;
    found(updated, "Email template", &id)
}

pub(crate) async fn delete_email_template(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Path(id): Path<Uuid>,
) -> Response {
    let existed = mutate(&store, actor, |s| s.delete_email_template(&id)).await;
    deleted(existed, "Email template", &id)
}

pub(crate) async fn list_categories(State(store): State<StoreHandle>) -> Json<Vec<Category>> {
    Json(store.lock().await.list_categories())
}

pub(crate) async fn create_category(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Json(new): Json<NewCategory>,
) -> Json<Category> {
    Json(mutate(&store, actor, |s| s.create_category(new)).await)
}

pub(crate) async fn list_subscription_plans(
    State(store): State<StoreHandle>,
) -> Json<Vec<SubscriptionPlan>> {
    Json(store.lock().await.list_subscription_plans())
}

pub(crate) async fn get_subscription(State(store): State<StoreHandle>) -> Response {
    match store.lock().await.get_subscription() {
        Some(subscription) => Json(subscription).into_response(),
        None => json_error(StatusCode::NOT_FOUND, "no subscription"),
    }
}

pub(crate) async fn put_subscription(
    State(store): State<StoreHandle>,
    actor: RequestActor,
    Json(subscription): Json<Subscription>,
) -> Json<Subscription> {
    Json(mutate(&store, actor, |s| s.put_subscription(subscription)).await)
}

// ============================================================================
// Logs
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LimitQuery {
    limit: Option<usize>,
}

pub(crate) async fn recent_activities(
    State(store): State<StoreHandle>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<RecentActivity>> {
    Json(store.lock().await.recent_activities(query.limit))
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AuditQuery {
    item_id: Option<Uuid>,
}

pub(crate) async fn audit_logs(
    State(store): State<StoreHandle>,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<AuditLog>> {
    let store = store.lock().await;
    Json(match query.item_id {
        Some(id) => store.audit_logs_for(&id),
        None => store.audit_logs(),
    })
}
