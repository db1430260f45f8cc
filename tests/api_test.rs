//! Remote-mode facade against an in-process server.

use signdesk::api::{Api, RemoteClient};
use signdesk::entity::{
    Action, Actor, DocumentStatus, ItemType, NewDocument, SettingsSection, SignatureStatus,
    WorkflowStatus,
};
use signdesk::storage::{
    AuthorizerUpdate, DepartmentUpdate, RoleUpdate, StoreHandle, TemplateUpdate,
    STANDARD_TEMPLATE,
};
use signdesk::SigndeskError;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct TestServer {
    store: StoreHandle,
    base_url: String,
    shutdown: CancellationToken,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let store = StoreHandle::seeded();
        let shutdown = CancellationToken::new();
        tokio::spawn(signdesk::server::serve(
            listener,
            store.clone(),
            shutdown.clone(),
        ));
        Self {
            store,
            base_url: format!("http://{}/api", addr),
            shutdown,
        }
    }

    fn api(&self) -> Api {
        Api::remote(RemoteClient::new(self.base_url.clone()).unwrap())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[tokio::test]
async fn test_remote_lifecycle_to_signed() {
    let server = TestServer::start().await;
    let api = server.api();

    let doc = api.create_document(NewDocument::named("A.pdf")).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Draft);

    let template = api
        .list_workflow_templates()
        .await
        .unwrap()
        .into_iter()
        .find(|t| t.name == STANDARD_TEMPLATE)
        .unwrap();
    let binding = api
        .bind_workflow(doc.base.id, template.base.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(binding.document.status, DocumentStatus::InWorkflow);
    assert_eq!(binding.workflow.current_step, 0);

    for _ in 0..2 {
        let advance = api.advance_document(doc.base.id).await.unwrap().unwrap();
        assert_eq!(advance.document.status, DocumentStatus::InWorkflow);
    }
    let advance = api.advance_document(doc.base.id).await.unwrap().unwrap();
    assert_eq!(advance.to_step, 3);
    assert_eq!(advance.document.status, DocumentStatus::PendingForSign);
    assert_eq!(advance.workflow.status, WorkflowStatus::Active);

    let signatures = api.list_signatures().await.unwrap();
    let signature = signatures
        .iter()
        .find(|s| s.document_id == doc.base.id)
        .unwrap();
    assert_eq!(signature.assignee, "Marta Silva");
    assert_eq!(signature.status, SignatureStatus::Pending);

    // Waiting for a signature blocks advancement.
    assert!(api.advance_document(doc.base.id).await.unwrap().is_none());

    let signed = api.sign(signature.base.id).await.unwrap().unwrap();
    assert_eq!(signed.status, SignatureStatus::Signed);
    let doc = api.get_document(doc.base.id).await.unwrap().unwrap();
    assert_eq!(doc.status, DocumentStatus::Signed);

    let advance = api.advance_document(doc.base.id).await.unwrap().unwrap();
    assert!(advance.completed);
    assert_eq!(advance.workflow.status, WorkflowStatus::Completed);
    assert_eq!(advance.document.current_step, 3);

    let history = api.audit_logs_for(doc.base.id).await.unwrap();
    assert!(history
        .iter()
        .any(|log| log.item_type == ItemType::Signature && log.action == Action::Signed));
    assert!(history.iter().all(|log| log.item_type != ItemType::Workflow));

    let audit = api.audit_logs().await.unwrap();
    assert!(audit
        .iter()
        .any(|log| log.item_type == ItemType::Signature && log.action == Action::Signed));
    assert_eq!(
        server.store.lock().await.audit_logs().len(),
        audit.len()
    );
}

#[tokio::test]
async fn test_remote_not_found_per_family() {
    let server = TestServer::start().await;
    let api = server.api();
    let missing = Uuid::new_v4();

    assert!(api.get_document(missing).await.unwrap().is_none());
    assert!(!api.delete_document(missing).await.unwrap());
    assert!(api.get_workflow(missing).await.unwrap().is_none());
    assert!(api
        .update_template(missing, TemplateUpdate::default())
        .await
        .unwrap()
        .is_none());
    assert!(api.bind_workflow(missing, missing).await.unwrap().is_none());
    assert!(api.advance_document(missing).await.unwrap().is_none());

    assert!(api.get_department(missing).await.unwrap().is_none());
    assert!(api.get_role(missing).await.unwrap().is_none());
    assert!(api.get_authorizer(missing).await.unwrap().is_none());
    assert!(api.get_email_template(missing).await.unwrap().is_none());
    let department = api.list_departments().await.unwrap().remove(0);
    assert_eq!(
        api.get_department(department.base.id).await.unwrap(),
        Some(department)
    );

    assert!(matches!(
        api.update_department(missing, DepartmentUpdate::default()).await,
        Err(SigndeskError::NotFound { kind: "Department", .. })
    ));
    assert!(matches!(
        api.delete_role(missing).await,
        Err(SigndeskError::NotFound { kind: "Role", .. })
    ));
    assert!(matches!(
        api.update_authorizer(missing, AuthorizerUpdate::default()).await,
        Err(SigndeskError::NotFound { kind: "Authorizer", .. })
    ));
    assert!(matches!(
        api.update_role(missing, RoleUpdate::default()).await,
        Err(SigndeskError::NotFound { .. })
    ));

    assert!(api.audit_logs().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remote_settings_replace_wholesale() {
    let server = TestServer::start().await;
    let api = server.api();

    let value = serde_json::json!({"issuer": "Demo CA"});
    api.put_settings(SettingsSection::Certificate, value.clone())
        .await
        .unwrap();
    assert_eq!(
        api.get_settings(SettingsSection::Certificate).await.unwrap(),
        value
    );

    let replaced = serde_json::json!({"valid_days": 365});
    api.put_settings(SettingsSection::Certificate, replaced.clone())
        .await
        .unwrap();
    assert_eq!(
        api.get_settings(SettingsSection::Certificate).await.unwrap(),
        replaced
    );
}

#[tokio::test]
async fn test_remote_mutations_carry_actor() {
    let server = TestServer::start().await;
    let client = RemoteClient::new(server.base_url.clone())
        .unwrap()
        .with_actor(Actor::new("u-9", "Ines Duarte"));
    let api = Api::remote(client);

    api.create_document(NewDocument::named("B.pdf")).await.unwrap();

    let recent = api.recent_activities(Some(1)).await.unwrap();
    assert_eq!(recent[0].user_id, "u-9");
    assert_eq!(recent[0].user_name, "Ines Duarte");
}

#[tokio::test]
async fn test_unreachable_server_is_an_error() {
    let api = Api::remote(RemoteClient::new("http://127.0.0.1:9/api").unwrap());
    assert!(matches!(
        api.list_documents().await,
        Err(SigndeskError::Http(_))
    ));
}
