use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "signdesk")]
#[command(version, about = "Document workflow and e-signature administration")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to ./signdesk.yaml when present)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Talk to a remote signdesk server instead of the local store
    #[arg(long, global = true)]
    pub remote: bool,

    /// Base URL of the remote server, e.g. http://127.0.0.1:4000/api
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve a seeded store over HTTP
    Serve {
        /// Listen address (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run a document through the standard approval workflow to signature
    Demo {
        /// Output each step as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage documents
    Documents(DocumentsCommand),

    /// Manage signature requests
    Signatures(SignaturesCommand),

    /// List workflow templates
    WorkflowTemplates {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or replace a settings section
    Settings {
        /// Section (customization, advanced, pdf, certificate, dsc, branding)
        section: String,

        /// Replace the section with this JSON document
        #[arg(long, value_name = "JSON")]
        set: Option<String>,
    },

    /// Show recent activity, newest first
    Activity {
        /// Maximum number of entries
        #[arg(long, short = 'n', default_value_t = 10)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the audit log
    Audit {
        /// Only entries for this item ID, or the document with this name
        #[arg(long)]
        item: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Store the current user
    Login {
        /// Display name
        name: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        role: Option<String>,
    },

    /// Forget the current user
    Logout,

    /// Show the current user
    Whoami,

    /// Print a collection every time it changes
    Watch {
        /// What to watch (documents, signatures, activity)
        #[arg(default_value = "documents")]
        target: String,

        /// Polling interval in seconds (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[derive(Args, Debug)]
pub struct DocumentsCommand {
    #[command(subcommand)]
    pub action: DocumentsAction,
}

#[derive(Subcommand, Debug)]
pub enum DocumentsAction {
    /// List documents
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one document
    Get {
        /// Document ID, ID prefix or name
        document: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Upload a new draft document
    Create {
        /// Document name
        name: String,

        #[arg(long)]
        account_number: Option<String>,

        #[arg(long)]
        branch: Option<String>,

        #[arg(long)]
        customer: Option<String>,

        #[arg(long = "type")]
        document_type: Option<String>,

        #[arg(long)]
        amount: Option<f64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a draft document to a workflow
    Bind {
        /// Document ID, ID prefix or name
        document: String,

        /// Workflow template ID, ID prefix or name
        template: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Move a document to the next workflow step
    Advance {
        /// Document ID, ID prefix or name
        document: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a document
    Delete {
        /// Document ID, ID prefix or name
        document: String,
    },
}

#[derive(Args, Debug)]
pub struct SignaturesCommand {
    #[command(subcommand)]
    pub action: SignaturesAction,
}

#[derive(Subcommand, Debug)]
pub enum SignaturesAction {
    /// List signature requests
    List {
        /// Only pending requests
        #[arg(long)]
        pending: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign a pending request
    Sign {
        /// Signature ID or ID prefix
        signature: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
