mod content;
mod esa;
mod query;

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::JournalError;

pub use content::{daily_category, draft_append, draft_new_entry, EntryDraft};
pub use esa::{EsaClient, EsaConfig, SearchResult, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use query::SearchQuery;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    #[serde(rename = "number", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "name", default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body_md: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body_html: String,
    #[serde(default)]
    pub wip: bool,
}

// Uncategorized posts come back with `"category": null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub trait JournalStore: Send + Sync {
    fn find_by_category(&self, category: &str) -> Result<Option<JournalEntry>, JournalError>;

    fn create(&self, text: &str, tags: &[String], now: &DateTime<Local>) -> Result<JournalEntry, JournalError>;

    fn append(
        &self,
        existing: &JournalEntry,
        text: &str,
        tags: &[String],
        now: &DateTime<Local>,
    ) -> Result<JournalEntry, JournalError>;
}
