use chrono::{DateTime, Local};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::content::{draft_append, draft_new_entry};
use super::{JournalEntry, JournalStore, SearchQuery};
use crate::error::JournalError;

pub const DEFAULT_BASE_URL: &str = "https://api.esa.io/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct EsaConfig {
    pub team: String,
    pub access_token: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for EsaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsaConfig")
            .field("team", &self.team)
            .field("access_token", &"***")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub posts: Vec<JournalEntry>,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
struct EsaErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Serialize)]
struct PostEnvelope<T> {
    post: T,
}

#[derive(Serialize)]
struct NewPost<'a> {
    name: &'a str,
    category: &'a str,
    tags: &'a [String],
    body_md: &'a str,
    wip: bool,
}

#[derive(Serialize)]
struct PostPatch<'a> {
    name: &'a str,
    tags: &'a [String],
    body_md: &'a str,
    wip: bool,
}

pub struct EsaClient {
    http: Client,
    config: EsaConfig,
}

impl EsaClient {
    pub fn new(config: EsaConfig) -> Result<Self, JournalError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| JournalError::Transport(err.to_string()))?;
        Ok(Self { http, config })
    }

    fn posts_url(&self) -> String {
        format!(
            "{}/teams/{}/posts",
            self.config.base_url.trim_end_matches('/'),
            self.config.team
        )
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchResult, JournalError> {
        let response = self
            .http
            .get(self.posts_url())
            .query(&query.to_params())
            .bearer_auth(&self.config.access_token)
            .send()
            .map_err(transport_error)?;
        read_json(response, StatusCode::OK, "search result")
    }
}

impl JournalStore for EsaClient {
    fn find_by_category(&self, category: &str) -> Result<Option<JournalEntry>, JournalError> {
        let query = SearchQuery::new().category(category).pagination(1, 1);
        let result = self.search(&query)?;
        if result.total_count > 1 {
            return Err(JournalError::Ambiguous {
                category: category.to_string(),
                count: result.total_count,
            });
        }
        if result.total_count == 0 {
            return Ok(None);
        }
        match result.posts.into_iter().next() {
            Some(entry) => Ok(Some(entry)),
            None => Err(JournalError::Remote(format!(
                "search reported total_count=1 for {category} but returned no posts"
            ))),
        }
    }

    fn create(&self, text: &str, tags: &[String], now: &DateTime<Local>) -> Result<JournalEntry, JournalError> {
        let draft = draft_new_entry(text, tags, now);
        let body = PostEnvelope {
            post: NewPost {
                name: &draft.title,
                category: &draft.category,
                tags: &draft.tags,
                body_md: &draft.body_md,
                wip: false,
            },
        };
        let response = self
            .http
            .post(self.posts_url())
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .map_err(transport_error)?;
        read_json(response, StatusCode::CREATED, "created post")
    }

    fn append(
        &self,
        existing: &JournalEntry,
        text: &str,
        tags: &[String],
        now: &DateTime<Local>,
    ) -> Result<JournalEntry, JournalError> {
        let id = existing.id.ok_or(JournalError::MissingId)?;
        let draft = draft_append(existing, text, tags, now);
        let body = PostEnvelope {
            post: PostPatch {
                name: &draft.title,
                tags: &draft.tags,
                body_md: &draft.body_md,
                wip: false,
            },
        };
        let response = self
            .http
            .patch(format!("{}/{}", self.posts_url(), id))
            .bearer_auth(&self.config.access_token)
            .json(&body)
            .send()
            .map_err(transport_error)?;
        read_json(response, StatusCode::OK, "updated post")
    }
}

fn transport_error(err: reqwest::Error) -> JournalError {
    tracing::warn!(timeout = err.is_timeout(), "esa request failed: {err}");
    JournalError::Transport(err.to_string())
}

fn read_json<T: DeserializeOwned>(response: Response, expected: StatusCode, what: &str) -> Result<T, JournalError> {
    let status = response.status();
    let body = response.text().map_err(transport_error)?;
    if status != expected {
        let message = match serde_json::from_str::<EsaErrorResponse>(&body) {
            Ok(err) => format!("{}: {}", err.error, err.message),
            Err(err) => format!("failed to parse error response (HTTP {status}): {err}"),
        };
        tracing::warn!(status = status.as_u16(), "esa returned an error: {message}");
        return Err(JournalError::Remote(message));
    }
    serde_json::from_str(&body).map_err(|err| JournalError::Remote(format!("failed to parse {what}: {err}")))
}
