use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;

use crate::error::WorkflowError;
use crate::journal::{daily_category, JournalEntry, JournalStore};
use crate::submission_guard::SubmissionGuard;

pub const DEFAULT_PREFIX: &str = "#times-esa";
pub const SUCCESS_MESSAGE: &str = "日報を投稿しました";

#[derive(Clone, Debug)]
pub struct ReportRequest {
    pub text: String,
    pub confirmed_by_user: Option<bool>,
    pub tags: Vec<String>,
    pub now: DateTime<Local>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportResponse {
    pub success: bool,
    pub message: String,
    pub entry: JournalEntry,
}

#[derive(Clone, Debug)]
pub struct WorkflowOptions {
    pub prefix: String,
    pub require_confirmation: bool,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            require_confirmation: true,
        }
    }
}

pub fn strip_prefix<'a>(text: &'a str, prefix: &str) -> &'a str {
    if prefix.is_empty() {
        return text;
    }
    match text.strip_prefix(prefix) {
        Some(rest) => rest.trim_start(),
        None => text,
    }
}

pub struct ReportWorkflow<S> {
    store: S,
    guard: Arc<SubmissionGuard>,
    options: WorkflowOptions,
}

impl<S: JournalStore> ReportWorkflow<S> {
    pub fn new(store: S, guard: Arc<SubmissionGuard>, options: WorkflowOptions) -> Self {
        Self { store, guard, options }
    }

    pub fn options(&self) -> &WorkflowOptions {
        &self.options
    }

    pub fn submit(&self, request: ReportRequest) -> Result<ReportResponse, WorkflowError> {
        if request.text.is_empty() {
            return Err(WorkflowError::InvalidArgument("text is required".to_string()));
        }
        if self.options.require_confirmation && request.confirmed_by_user != Some(true) {
            return Err(WorkflowError::ConfirmationRequired);
        }

        let text = strip_prefix(&request.text, &self.options.prefix);

        // An accepted text stays recorded even if the remote calls below fail.
        if self.guard.check_and_record(text, request.now) {
            let window = self.guard.config().window;
            // Sub-second windows round up so the message never says 0 seconds.
            let window_secs = window.as_secs() + u64::from(window.subsec_nanos() > 0);
            tracing::info!(window_secs, "submission suppressed as duplicate");
            return Err(WorkflowError::DuplicateSubmission { window_secs });
        }

        let category = daily_category(&request.now);
        let existing = self
            .store
            .find_by_category(&category)
            .map_err(WorkflowError::Search)?;

        let entry = match existing {
            None => {
                let entry = self
                    .store
                    .create(text, &request.tags, &request.now)
                    .map_err(WorkflowError::Create)?;
                tracing::info!(category = %category, id = ?entry.id, "created daily report");
                entry
            }
            Some(existing) => {
                let entry = self
                    .store
                    .append(&existing, text, &request.tags, &request.now)
                    .map_err(WorkflowError::Append)?;
                tracing::info!(category = %category, id = ?entry.id, "appended to daily report");
                entry
            }
        };

        Ok(ReportResponse {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            entry,
        })
    }
}
