use chrono::{DateTime, Local};

use super::JournalEntry;

pub const DAILY_TITLE: &str = "日報";
pub const DAILY_CATEGORY_ROOT: &str = "日報";
const SEPARATOR: &str = "\n\n---";

#[derive(Clone, Debug, PartialEq)]
pub struct EntryDraft {
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
    pub body_md: String,
}

pub fn daily_category(now: &DateTime<Local>) -> String {
    format!("{}/{}", DAILY_CATEGORY_ROOT, now.format("%Y/%m/%d"))
}

/// `<a id="HHMM" href="#HHMM">HH:MM</a>`.
///
/// Two posts in the same minute produce the same id; the body then holds
/// duplicate anchors and the fragment link resolves to the first one.
pub fn timestamp_anchor(now: &DateTime<Local>) -> String {
    let id = now.format("%H%M");
    format!("<a id=\"{id}\" href=\"#{id}\">{}</a>", now.format("%H:%M"))
}

pub fn new_body(text: &str, now: &DateTime<Local>) -> String {
    format!("{} {}{}", timestamp_anchor(now), text, SEPARATOR)
}

pub fn prepend_body(existing: &str, text: &str, now: &DateTime<Local>) -> String {
    if text.is_empty() {
        return existing.to_string();
    }
    format!("{}\n\n{}", new_body(text, now), existing)
}

pub fn merge_title(existing: &str, incoming: &str) -> String {
    let existing = existing.trim();
    let incoming = incoming.trim();
    if existing.is_empty() {
        return incoming.to_string();
    }
    if incoming.is_empty() || existing.contains(incoming) {
        return existing.to_string();
    }
    format!("{existing} {incoming}")
}

pub fn merge_tags(existing: &[String], extra: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in existing.iter().chain(extra.iter()) {
        let normalized = tag.trim();
        if normalized.is_empty() || out.iter().any(|t| t == normalized) {
            continue;
        }
        out.push(normalized.to_string());
    }
    out
}

pub fn draft_new_entry(text: &str, tags: &[String], now: &DateTime<Local>) -> EntryDraft {
    EntryDraft {
        title: DAILY_TITLE.to_string(),
        category: daily_category(now),
        tags: merge_tags(&[], tags),
        body_md: new_body(text, now),
    }
}

pub fn draft_append(existing: &JournalEntry, text: &str, tags: &[String], now: &DateTime<Local>) -> EntryDraft {
    EntryDraft {
        title: merge_title(&existing.title, DAILY_TITLE),
        category: existing.category.clone(),
        tags: merge_tags(&existing.tags, tags),
        body_md: prepend_body(&existing.body_md, text, now),
    }
}
