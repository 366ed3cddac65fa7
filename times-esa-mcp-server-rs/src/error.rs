use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("複数の日報が存在します (category={category}, total_count={count})")]
    Ambiguous { category: String, count: u64 },

    #[error("{0}")]
    Remote(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("journal entry has no id")]
    MissingId,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("confirmed_by_user must be true: show the text to the user, get their approval, then call again with confirmed_by_user=true")]
    ConfirmationRequired,

    #[error("the same or a similar text was posted within the last {window_secs} seconds; wait and retry")]
    DuplicateSubmission { window_secs: u64 },

    #[error("search failed: {0}")]
    Search(#[source] JournalError),

    #[error("creation failed: {0}")]
    Create(#[source] JournalError),

    #[error("update failed: {0}")]
    Append(#[source] JournalError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}
