use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Domain list error: {0}")]
    DomainList(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;

/// Why a single page could not be turned into a document.
///
/// The `Display` form is what gets stored on an error leaf of the tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Timeout")]
    Timeout,

    #[error("Non-HTML content")]
    NonHtml,

    #[error("Request error: {0}")]
    Request(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FetchError {
    pub fn request(msg: impl ToString) -> Self {
        FetchError::Request(truncate_message(&msg.to_string()))
    }

    pub fn parse(msg: impl ToString) -> Self {
        FetchError::Parse(truncate_message(&msg.to_string()))
    }
}

const MAX_MESSAGE_CHARS: usize = 100;

fn truncate_message(msg: &str) -> String {
    msg.chars().take(MAX_MESSAGE_CHARS).collect()
}
