use std::path::Path;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api::Api;
use crate::config::Config;
use crate::entity::{
    AuditLog, Document, NewDocument, RecentActivity, SettingsSection, Signature, Workflow,
    WorkflowTemplate,
};
use crate::error::{Result, SigndeskError};
use crate::server;
use crate::session::{CurrentUser, SessionStore};
use crate::storage::{StoreHandle, Stored, STANDARD_TEMPLATE};

/// Everything a command needs: resolved config, the session and a facade.
///
/// Local mode gets a freshly seeded store per invocation; nothing but the
/// session survives the process.
pub struct Context {
    pub config: Config,
    pub session: SessionStore,
    pub store: StoreHandle,
    pub api: Api,
}

impl Context {
    pub async fn from_cli(
        config_path: Option<&Path>,
        remote: bool,
        api_url: Option<String>,
    ) -> Result<Self> {
        let mut config = Config::load(config_path)?;
        if remote {
            config.use_remote = true;
        }
        if let Some(url) = api_url {
            config.api_base_url = url;
        }

        let session = SessionStore::new(config.state_dir.clone());
        let actor = session.load()?.map(|user| user.actor());
        let store = StoreHandle::seeded();
        let api = Api::from_config(&config, store.clone(), actor).await?;

        Ok(Self {
            config,
            session,
            store,
            api,
        })
    }
}

fn short_id(item: &impl Stored) -> String {
    item.id().to_string()[..8].to_string()
}

/// Find one record by full ID, ID prefix or case-insensitive name.
fn pick<T: Stored>(items: Vec<T>, key: &str, kind: &'static str) -> Result<T> {
    let needle = key.trim().to_lowercase();
    let mut exact: Vec<T> = items
        .iter()
        .filter(|item| item.id().to_string() == needle || item.label().to_lowercase() == needle)
        .cloned()
        .collect();
    if exact.len() == 1 {
        return Ok(exact.remove(0));
    }

    let mut prefixed: Vec<T> = items
        .into_iter()
        .filter(|item| !needle.is_empty() && item.id().to_string().starts_with(&needle))
        .collect();
    match (exact.len(), prefixed.len()) {
        (0, 0) => Err(SigndeskError::not_found(kind, key)),
        (0, 1) => Ok(prefixed.remove(0)),
        (e, p) => Err(SigndeskError::InvalidInput(format!(
            "'{}' matches {} records; use more of the ID",
            key,
            e.max(p)
        ))),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn step_label(workflow: &Workflow, index: usize) -> String {
    let name = workflow
        .steps
        .get(index)
        .map(|s| s.name.as_str())
        .unwrap_or("?");
    format!("step {}/{} {}", index + 1, workflow.steps.len(), name)
}

fn print_document(doc: &Document) {
    println!("  {} [{}] {}", short_id(doc), doc.status, doc.name);
    if let Some(customer) = &doc.customer_name {
        println!("      customer: {}", customer);
    }
    if doc.workflow_id.is_some() {
        println!("      workflow step: {}", doc.current_step + 1);
    }
}

fn print_activity(entry: &RecentActivity) {
    println!(
        "  {} {} {} {} \"{}\" by {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.item_type,
        entry.action,
        entry.item_id,
        entry.item_name,
        entry.user_name
    );
}

fn print_audit_log(entry: &AuditLog) {
    println!(
        "  {} {} {} \"{}\" by {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.item_type,
        entry.action,
        entry.item_name,
        entry.user_name
    );
}

// ============================================================================
// Server and demo
// ============================================================================

pub async fn handle_serve(ctx: &Context, bind: Option<String>) -> Result<()> {
    if ctx.api.is_remote() {
        return Err(SigndeskError::InvalidInput(
            "serve always runs a local store; drop --remote".to_string(),
        ));
    }
    let addr = bind.unwrap_or_else(|| ctx.config.bind.clone());
    let listener = TcpListener::bind(&addr).await?;

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    server::serve(listener, ctx.store.clone(), shutdown).await
}

/// Walk one document from upload to signature through the facade.
pub async fn handle_demo(ctx: &Context, json: bool) -> Result<()> {
    let api = &ctx.api;

    let mut new = NewDocument::named("Demo-Agreement.pdf");
    new.customer_name = Some("Demo Customer".to_string());
    new.amount = Some(25_000.0);
    let document = api.create_document(new).await?;
    let id = document.base.id;
    if json {
        print_json(&document)?;
    } else {
        println!("Uploaded {} ({}) [{}]", document.name, short_id(&document), document.status);
    }

    let template = pick(
        api.list_workflow_templates().await?,
        STANDARD_TEMPLATE,
        "Workflow template",
    )?;
    let binding = api
        .bind_workflow(id, template.base.id)
        .await?
        .ok_or_else(|| {
            SigndeskError::InvalidInput(format!("could not bind '{}'", template.name))
        })?;
    if json {
        print_json(&binding)?;
    } else {
        println!(
            "Bound to {}: {} [{}]",
            template.name,
            step_label(&binding.workflow, 0),
            binding.document.status
        );
    }

    let mut pending: Option<Signature> = binding.signature;
    while let Some(advance) = api.advance_document(id).await? {
        if json {
            print_json(&advance)?;
        } else {
            println!(
                "Advanced to {} [{}]",
                step_label(&advance.workflow, advance.to_step),
                advance.document.status
            );
        }
        if advance.signature.is_some() {
            pending = advance.signature;
        }
    }

    let Some(signature) = pending else {
        return Err(SigndeskError::InvalidInput(
            "workflow ended without a signature request".to_string(),
        ));
    };
    api.sign(signature.base.id)
        .await?
        .ok_or_else(|| SigndeskError::not_found("Signature", signature.base.id))?;
    let document = api
        .get_document(id)
        .await?
        .ok_or_else(|| SigndeskError::not_found("Document", id))?;
    if json {
        print_json(&document)?;
    } else {
        println!("Signed by {} [{}]", signature.assignee, document.status);
    }

    if let Some(advance) = api.advance_document(id).await? {
        if !json && advance.completed {
            println!("Workflow {} completed", advance.workflow.name);
        }
    }

    if !json {
        println!("\nRecent activity:");
        for entry in api.recent_activities(Some(10)).await? {
            print_activity(&entry);
        }
    }
    Ok(())
}

// ============================================================================
// Documents
// ============================================================================

async fn find_document(api: &Api, key: &str) -> Result<Document> {
    pick(api.list_documents().await?, key, "Document")
}

pub async fn handle_documents_list(ctx: &Context, json: bool) -> Result<()> {
    let documents = ctx.api.list_documents().await?;
    if json {
        return print_json(&documents);
    }
    if documents.is_empty() {
        println!("No documents found.");
        return Ok(());
    }
    println!("Documents:\n");
    for doc in &documents {
        print_document(doc);
    }
    Ok(())
}

pub async fn handle_documents_get(ctx: &Context, key: String, json: bool) -> Result<()> {
    let doc = find_document(&ctx.api, &key).await?;
    if json {
        return print_json(&doc);
    }
    println!("{} ({})", doc.name, doc.base.id);
    println!("  status:   {}", doc.status);
    if let Some(account) = &doc.account_number {
        println!("  account:  {}", account);
    }
    if let Some(branch) = &doc.branch {
        println!("  branch:   {}", branch);
    }
    if let Some(customer) = &doc.customer_name {
        println!("  customer: {}", customer);
    }
    if let Some(amount) = doc.amount {
        println!("  amount:   {:.2}", amount);
    }
    if let Some(workflow_id) = doc.workflow_id {
        if let Some(workflow) = ctx.api.get_workflow(workflow_id).await? {
            println!(
                "  workflow: {} [{}] {}",
                workflow.name,
                workflow.status,
                step_label(&workflow, doc.current_step)
            );
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn handle_documents_create(
    ctx: &Context,
    name: String,
    account_number: Option<String>,
    branch: Option<String>,
    customer_name: Option<String>,
    document_type: Option<String>,
    amount: Option<f64>,
    json: bool,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SigndeskError::InvalidInput(
            "document name must not be empty".to_string(),
        ));
    }
    let doc = ctx
        .api
        .create_document(NewDocument {
            name,
            status: None,
            account_number,
            branch,
            customer_name,
            document_type,
            amount,
        })
        .await?;
    if json {
        return print_json(&doc);
    }
    println!("Created document {} - {}", short_id(&doc), doc.name);
    Ok(())
}

pub async fn handle_documents_bind(
    ctx: &Context,
    document: String,
    template: String,
    json: bool,
) -> Result<()> {
    let doc = find_document(&ctx.api, &document).await?;
    let template: WorkflowTemplate = pick(
        ctx.api.list_workflow_templates().await?,
        &template,
        "Workflow template",
    )?;
    let binding = ctx.api.bind_workflow(doc.base.id, template.base.id).await?;
    if json {
        return print_json(&binding);
    }
    match binding {
        Some(binding) => println!(
            "Bound {} to {}: {} [{}]",
            doc.name,
            template.name,
            step_label(&binding.workflow, 0),
            binding.document.status
        ),
        None => println!(
            "{} not bound: the document must be a Draft and the template usable",
            doc.name
        ),
    }
    Ok(())
}

pub async fn handle_documents_advance(ctx: &Context, document: String, json: bool) -> Result<()> {
    let doc = find_document(&ctx.api, &document).await?;
    let advance = ctx.api.advance_document(doc.base.id).await?;
    if json {
        return print_json(&advance);
    }
    match advance {
        Some(advance) if advance.completed => {
            println!("{}: workflow {} completed", doc.name, advance.workflow.name)
        }
        Some(advance) => println!(
            "{}: {} [{}]",
            doc.name,
            step_label(&advance.workflow, advance.to_step),
            advance.document.status
        ),
        None => println!("{} not advanced [{}]", doc.name, doc.status),
    }
    Ok(())
}

pub async fn handle_documents_delete(ctx: &Context, document: String) -> Result<()> {
    let doc = find_document(&ctx.api, &document).await?;
    if !ctx.api.delete_document(doc.base.id).await? {
        return Err(SigndeskError::not_found("Document", doc.base.id));
    }
    println!("Deleted document {} - {}", short_id(&doc), doc.name);
    Ok(())
}

// ============================================================================
// Signatures and workflow templates
// ============================================================================

pub async fn handle_signatures_list(ctx: &Context, pending: bool, json: bool) -> Result<()> {
    let signatures: Vec<Signature> = ctx
        .api
        .list_signatures()
        .await?
        .into_iter()
        .filter(|s| !pending || !s.is_signed())
        .collect();
    if json {
        return print_json(&signatures);
    }
    if signatures.is_empty() {
        println!("No signature requests found.");
        return Ok(());
    }
    println!("Signature requests:\n");
    for s in &signatures {
        println!(
            "  {} [{}] {} -> {} (due {})",
            short_id(s),
            s.status,
            s.document_name,
            s.assignee,
            s.due_date.format("%Y-%m-%d")
        );
    }
    Ok(())
}

pub async fn handle_signatures_sign(ctx: &Context, key: String, json: bool) -> Result<()> {
    let signature = pick(ctx.api.list_signatures().await?, &key, "Signature")?;
    let signed = ctx
        .api
        .sign(signature.base.id)
        .await?
        .ok_or_else(|| SigndeskError::not_found("Signature", signature.base.id))?;
    if json {
        return print_json(&signed);
    }
    println!("Signed {} for {}", signed.document_name, signed.assignee);
    Ok(())
}

pub async fn handle_workflow_templates(ctx: &Context, json: bool) -> Result<()> {
    let templates = ctx.api.list_workflow_templates().await?;
    if json {
        return print_json(&templates);
    }
    println!("Workflow templates:\n");
    for t in &templates {
        let steps: Vec<&str> = t.steps.iter().map(|s| s.name.as_str()).collect();
        println!("  {} [{}] {}", short_id(t), t.status, t.name);
        println!("      steps: {}", steps.join(" -> "));
    }
    Ok(())
}

// ============================================================================
// Settings and logs
// ============================================================================

pub async fn handle_settings(ctx: &Context, section: String, set: Option<String>) -> Result<()> {
    let section: SettingsSection = section.parse().map_err(SigndeskError::InvalidInput)?;
    let value = match set {
        Some(text) => {
            let value: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| SigndeskError::InvalidInput(format!("invalid JSON: {}", e)))?;
            ctx.api.put_settings(section, value).await?
        }
        None => ctx.api.get_settings(section).await?,
    };
    print_json(&value)
}

pub async fn handle_activity(ctx: &Context, limit: usize, json: bool) -> Result<()> {
    let entries = ctx.api.recent_activities(Some(limit)).await?;
    if json {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("No activity yet.");
    }
    for entry in &entries {
        print_activity(entry);
    }
    Ok(())
}

pub async fn handle_audit(ctx: &Context, item: Option<String>, json: bool) -> Result<()> {
    let logs: Vec<AuditLog> = match item {
        None => ctx.api.audit_logs().await?,
        Some(key) => {
            let id = match key.parse::<uuid::Uuid>() {
                Ok(id) => id,
                Err(_) => find_document(&ctx.api, &key).await?.base.id,
            };
            ctx.api.audit_logs_for(id).await?
        }
    };
    if json {
        return print_json(&logs);
    }
    if logs.is_empty() {
        println!("No audit log entries.");
    }
    for entry in &logs {
        print_audit_log(entry);
    }
    Ok(())
}

// ============================================================================
// Session
// ============================================================================

pub fn handle_login(
    session: &SessionStore,
    name: String,
    email: Option<String>,
    role: Option<String>,
) -> Result<()> {
    if name.trim().is_empty() {
        return Err(SigndeskError::InvalidInput("name must not be empty".to_string()));
    }
    let mut user = CurrentUser::new(name);
    user.email = email;
    user.role = role;
    session.save(&user)?;
    println!("Logged in as {}", user.name);
    Ok(())
}

pub fn handle_logout(session: &SessionStore) -> Result<()> {
    if session.clear()? {
        println!("Logged out");
    } else {
        println!("Not logged in");
    }
    Ok(())
}

pub fn handle_whoami(session: &SessionStore) -> Result<()> {
    let user = session.require()?;
    println!("{} ({})", user.name, user.id);
    if let Some(email) = &user.email {
        println!("  email: {}", email);
    }
    if let Some(role) = &user.role {
        println!("  role:  {}", role);
    }
    Ok(())
}

// ============================================================================
// Watch
// ============================================================================

/// Print `target` once, then again after every change until Ctrl+C.
pub async fn handle_watch(ctx: &Context, target: String, interval: Option<u64>) -> Result<()> {
    let interval = interval
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| ctx.config.poll_interval());
    let api = ctx.api.clone();
    let cancel = CancellationToken::new();

    let (mut rx, handle) = match target.as_str() {
        "documents" => {
            ctx.api
                .watch(interval, cancel.clone(), move || {
                    let api = api.clone();
                    async move {
                        let docs = api.list_documents().await?;
                        Ok(docs
                            .iter()
                            .map(|d| format!("  {} [{}] {}", short_id(d), d.status, d.name))
                            .collect::<Vec<_>>()
                            .join("\n"))
                    }
                })
                .await
        }
        "signatures" => {
            ctx.api
                .watch(interval, cancel.clone(), move || {
                    let api = api.clone();
                    async move {
                        let signatures = api.list_signatures().await?;
                        Ok(signatures
                            .iter()
                            .map(|s| format!("  {} [{}] {}", short_id(s), s.status, s.document_name))
                            .collect::<Vec<_>>()
                            .join("\n"))
                    }
                })
                .await
        }
        "activity" => {
            ctx.api
                .watch(interval, cancel.clone(), move || {
                    let api = api.clone();
                    async move {
                        let entries = api.recent_activities(Some(10)).await?;
                        Ok(entries
                            .iter()
                            .map(|e| format!("  {} {} {}", e.item_type, e.action, e.item_name))
                            .collect::<Vec<_>>()
                            .join("\n"))
                    }
                })
                .await
        }
        other => {
            return Err(SigndeskError::InvalidInput(format!(
                "cannot watch '{}' (documents, signatures, activity)",
                other
            )))
        }
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(text) = rx.borrow_and_update().as_ref() {
                    println!("--- {} ---\n{}", target, text);
                }
            }
        }
    }
    cancel.cancel();
    let _ = handle.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Category;
    use crate::entity::EntityBase;

    fn category(name: &str) -> Category {
        Category {
            base: EntityBase::new(),
            name: name.to_string(),
            description: None,
        }
    }

    #[test]
    fn test_pick_by_name_id_and_prefix() {
        let items = vec![category("Loans"), category("Accounts")];
        let loans_id = items[0].base.id;

        assert_eq!(pick(items.clone(), "loans", "Category").unwrap().base.id, loans_id);
        assert_eq!(
            pick(items.clone(), &loans_id.to_string(), "Category").unwrap().base.id,
            loans_id
        );
        assert_eq!(
            pick(items.clone(), &loans_id.to_string()[..8], "Category")
                .unwrap()
                .base
                .id,
            loans_id
        );
        assert!(matches!(
            pick(items, "Mortgages", "Category"),
            Err(SigndeskError::NotFound { .. })
        ));
    }

    #[test]
    fn test_pick_ambiguous_name() {
        let items = vec![category("Loans"), category("Loans")];
        assert!(matches!(
            pick(items, "Loans", "Category"),
            Err(SigndeskError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_demo_runs_locally() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.latency_ms = 0;
        config.state_dir = tmp.path().to_path_buf();
        let store = StoreHandle::seeded();
        let ctx = Context {
            api: Api::from_config(&config, store.clone(), None).await.unwrap(),
            session: SessionStore::new(tmp.path()),
            config,
            store: store.clone(),
        };

        handle_demo(&ctx, true).await.unwrap();

        let store = store.lock().await;
        let demo = store
            .list_documents()
            .into_iter()
            .find(|d| d.name == "Demo-Agreement.pdf")
            .unwrap();
        assert_eq!(demo.status, crate::entity::DocumentStatus::Signed);
        let workflow = store.get_workflow(&demo.workflow_id.unwrap()).unwrap();
        assert!(workflow.is_completed());
    }
}
