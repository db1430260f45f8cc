mod commands;
mod handlers;

pub use commands::{
    Cli, Commands, DocumentsAction, DocumentsCommand, SignaturesAction, SignaturesCommand,
};
pub use handlers::{
    handle_activity, handle_audit, handle_demo, handle_documents_advance, handle_documents_bind,
    handle_documents_create, handle_documents_delete, handle_documents_get, handle_documents_list,
    handle_login, handle_logout, handle_serve, handle_settings, handle_signatures_list,
    handle_signatures_sign, handle_watch, handle_whoami, handle_workflow_templates, Context,
};
