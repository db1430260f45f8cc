use thiserror::Error;

#[derive(Error, Debug)]
pub enum SigndeskError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Any non-success response from the remote backend. The message is fixed;
    /// the status is kept for logging.
    #[error("API request failed")]
    RequestFailed { status: u16 },

    #[error("Not logged in. Run 'signdesk login <name>' first.")]
    NotLoggedIn,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SigndeskError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        SigndeskError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SigndeskError>;
