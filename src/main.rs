use clap::Parser;
use signdesk::cli::{
    handle_activity, handle_audit, handle_demo, handle_documents_advance, handle_documents_bind,
    handle_documents_create, handle_documents_delete, handle_documents_get, handle_documents_list,
    handle_login, handle_logout, handle_serve, handle_settings, handle_signatures_list,
    handle_signatures_sign, handle_watch, handle_whoami, handle_workflow_templates, Cli, Commands,
    Context, DocumentsAction, SignaturesAction,
};
use signdesk::config::Config;
use signdesk::session::SessionStore;
use signdesk::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(command: &Commands) {
    let default = match command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    // Session commands never touch a store.
    match &cli.command {
        Commands::Login { name, email, role } => {
            let config = Config::load(cli.config.as_deref())?;
            let session = SessionStore::new(config.state_dir);
            return handle_login(&session, name.clone(), email.clone(), role.clone());
        }
        Commands::Logout => {
            let config = Config::load(cli.config.as_deref())?;
            return handle_logout(&SessionStore::new(config.state_dir));
        }
        Commands::Whoami => {
            let config = Config::load(cli.config.as_deref())?;
            return handle_whoami(&SessionStore::new(config.state_dir));
        }
        _ => {}
    }

    let ctx = Context::from_cli(cli.config.as_deref(), cli.remote, cli.api_url).await?;

    match cli.command {
        Commands::Serve { bind } => handle_serve(&ctx, bind).await,
        Commands::Demo { json } => handle_demo(&ctx, json).await,
        Commands::Documents(cmd) => match cmd.action {
            DocumentsAction::List { json } => handle_documents_list(&ctx, json).await,
            DocumentsAction::Get { document, json } => {
                handle_documents_get(&ctx, document, json).await
            }
            DocumentsAction::Create {
                name,
                account_number,
                branch,
                customer,
                document_type,
                amount,
                json,
            } => {
                handle_documents_create(
                    &ctx,
                    name,
                    account_number,
                    branch,
                    customer,
                    document_type,
                    amount,
                    json,
                )
                .await
            }
            DocumentsAction::Bind {
                document,
                template,
                json,
            } => handle_documents_bind(&ctx, document, template, json).await,
            DocumentsAction::Advance { document, json } => {
                handle_documents_advance(&ctx, document, json).await
            }
            DocumentsAction::Delete { document } => handle_documents_delete(&ctx, document).await,
        },
        Commands::Signatures(cmd) => match cmd.action {
            SignaturesAction::List { pending, json } => {
                handle_signatures_list(&ctx, pending, json).await
            }
            SignaturesAction::Sign { signature, json } => {
                handle_signatures_sign(&ctx, signature, json).await
            }
        },
        Commands::WorkflowTemplates { json } => handle_workflow_templates(&ctx, json).await,
        Commands::Settings { section, set } => handle_settings(&ctx, section, set).await,
        Commands::Activity { limit, json } => handle_activity(&ctx, limit, json).await,
        Commands::Audit { item, json } => handle_audit(&ctx, item, json).await,
        Commands::Watch { target, interval } => handle_watch(&ctx, target, interval).await,
        Commands::Login { .. } | Commands::Logout | Commands::Whoami => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.command);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
