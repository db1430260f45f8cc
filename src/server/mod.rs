//! `signdesk serve`: the entity store over HTTP.
//!
//! The same REST surface remote mode talks to, backed by one in-process
//! [`StoreHandle`]. All routes live under `/api`; `/health` sits at the root.
//!
//! Not-found handling mirrors the store: families whose store operations
//! return `Option`/`bool` answer 404 on a miss, and so do families that
//! fail with `NotFound`. Engine no-ops (bind, advance) answer 200 with
//! `null`.
//!
//! Mutations are attributed to the user named in the `x-signdesk-actor-*`
//! headers, or to the store's own actor when they are absent.

mod handlers;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self as axum_middleware, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::entity::SettingsSection;
use crate::error::Result;
use crate::storage::StoreHandle;

use self::handlers::*;

/// Path prefix of every resource route.
pub const API_BASE_PATH: &str = "/api";

fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({"error": message}))).into_response()
}

/// Build the application router over `store`.
pub fn router(store: StoreHandle) -> Router {
    let mut api = Router::new()
        .route("/documents", get(list_documents).post(create_document))
        .route(
            "/documents/{id}",
            get(get_document)
                .patch(update_document)
                .delete(delete_document),
        )
        .route(
            "/documents/{id}/workflow",
            axum::routing::post(bind_workflow),
        )
        .route(
            "/documents/{id}/advance",
            axum::routing::post(advance_document),
        )
        .route("/workflows", get(list_workflows).post(create_workflow))
        .route(
            "/workflows/{id}",
            get(get_workflow)
                .patch(update_workflow)
                .delete(delete_workflow),
        )
        .route(
            "/workflow-templates",
            get(list_workflow_templates).post(create_workflow_template),
        )
        .route(
            "/workflow-templates/{id}",
            get(get_workflow_template)
                .patch(update_workflow_template)
                .delete(delete_workflow_template),
        )
        .route("/signatures", get(list_signatures).post(create_signature))
        .route(
            "/signatures/{id}",
            get(get_signature)
                .patch(update_signature)
                .delete(delete_signature),
        )
        .route("/templates", get(list_templates).post(create_template))
        .route(
            "/templates/{id}",
            get(get_template)
                .patch(update_template)
                .delete(delete_template),
        )
        .route("/departments", get(list_departments).post(create_department))
        .route(
            "/departments/{id}",
            get(get_department).put(update_department).delete(delete_department),
        )
        .route("/roles", get(list_roles).post(create_role))
        .route(
            "/roles/{id}",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route("/authorizers", get(list_authorizers).post(create_authorizer))
        .route(
            "/authorizers/{id}",
            get(get_authorizer).put(update_authorizer).delete(delete_authorizer),
        )
        .route(
            "/email-templates",
            get(list_email_templates).post(create_email_template),
        )
        .route(
            "/email-templates/{id}",
            get(get_email_template)
                .patch(update_email_template)
                .delete(delete_email_template),
        )
        .route("/categories", get(list_categories).post(create_category))
        .route("/subscription-plans", get(list_subscription_plans))
        .route("/subscription", get(get_subscription).put(put_subscription))
        .route("/recent-activities", get(recent_activities))
        .route("/audit-logs", get(audit_logs));

    for section in SettingsSection::ALL {
        api = api.route(
            section.path(),
            get(move |State(store): State<StoreHandle>| get_settings(store, section)).put(
                move |State(store): State<StoreHandle>,
                      actor: RequestActor,
                      Json(value): Json<serde_json::Value>| {
                    put_settings(store, actor, section, value)
                },
            ),
        );
    }

    Router::new()
        .route("/health", get(health))
        .nest(API_BASE_PATH, api)
        .fallback(not_found)
        .layer(axum_middleware::from_fn(log_requests))
        .with_state(store)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    debug!(%method, %path, status = response.status().as_u16(), "Handled request");
    response
}

/// Serve `store` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    store: StoreHandle,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "Listening on http://{}{}", addr, API_BASE_PATH);
    axum::serve(listener, router(store))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Server shut down");
    Ok(())
}
