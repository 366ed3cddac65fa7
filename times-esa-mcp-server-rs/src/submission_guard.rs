use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::similarity::similarity;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(180);
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SuppressionConfig {
    pub window: Duration,
    pub similarity_threshold: f64,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

#[derive(Clone, Debug)]
struct SuppressionEntry {
    text: String,
    seen_at: DateTime<Local>,
}

#[derive(Debug)]
struct GuardState {
    config: SuppressionConfig,
    entries: HashMap<String, SuppressionEntry>,
}

// One lock covers entries and config, so check-and-record is atomic.
#[derive(Debug)]
pub struct SubmissionGuard {
    state: Mutex<GuardState>,
}

fn age(now: DateTime<Local>, seen_at: DateTime<Local>) -> Duration {
    // Entries stamped in the future (clock skew) count as brand new.
    now.signed_duration_since(seen_at)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

fn prune_entries(state: &mut GuardState, now: DateTime<Local>) {
    let max_age = state.config.window.saturating_mul(2);
    let mut removed = Vec::new();
    for (key, entry) in state.entries.iter() {
        if age(now, entry.seen_at) > max_age {
            removed.push(key.clone());
        }
    }
    for key in removed {
        state.entries.remove(&key);
    }
}

impl SubmissionGuard {
    pub fn new(config: SuppressionConfig) -> Self {
        Self {
            state: Mutex::new(GuardState {
                config,
                entries: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> SuppressionConfig {
        self.lock().config
    }

    pub fn configure(&self, window: Duration, similarity_threshold: f64) {
        self.lock().config = SuppressionConfig {
            window,
            similarity_threshold,
        };
    }

    pub fn reset(&self) {
        self.lock().entries.clear();
    }

    pub fn check_and_record(&self, text: &str, now: DateTime<Local>) -> bool {
        if text.is_empty() {
            return true;
        }
        let mut state = self.lock();
        let window = state.config.window;
        let threshold = state.config.similarity_threshold;

        if let Some(entry) = state.entries.get(text) {
            if age(now, entry.seen_at) < window {
                tracing::debug!(window_ms = window.as_millis() as u64, "exact resubmission suppressed");
                return true;
            }
        }

        // Single-character texts only ever match exactly.
        if text.chars().count() > 1 {
            for entry in state.entries.values() {
                if age(now, entry.seen_at) >= window || entry.text.chars().count() <= 1 {
                    continue;
                }
                let score = similarity(text, &entry.text);
                if score >= threshold {
                    tracing::debug!(score, threshold, "similar resubmission suppressed");
                    return true;
                }
            }
        }

        state.entries.insert(
            text.to_string(),
            SuppressionEntry {
                text: text.to_string(),
                seen_at: now,
            },
        );
        prune_entries(&mut state, now);
        false
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

impl Default for SubmissionGuard {
    fn default() -> Self {
        Self::new(SuppressionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 6, 1, h, m, s).unwrap()
    }

    fn guard(window: Duration, threshold: f64) -> SubmissionGuard {
        SubmissionGuard::new(SuppressionConfig {
            window,
            similarity_threshold: threshold,
        })
    }

    #[test]
    fn first_submission_is_allowed_and_repeat_is_suppressed() {
        let guard = guard(Duration::from_secs(10), 0.9);
        let now = at(9, 0, 0);
        assert!(!guard.check_and_record("test message", now));
        assert!(guard.check_and_record("test message", now + chrono::Duration::seconds(1)));
        assert!(!guard.check_and_record("different message", now));
    }

    #[test]
    fn empty_text_is_always_suppressed_and_never_recorded() {
        let guard = SubmissionGuard::default();
        assert!(guard.check_and_record("", at(9, 0, 0)));
        assert_eq!(guard.len(), 0);
    }

    #[test]
    fn similar_text_inside_window_is_suppressed() {
        let guard = guard(Duration::from_millis(100), 0.75);
        let start = at(12, 0, 0);
        assert!(!guard.check_and_record("今日はとても良い天気です。", start));
        assert!(guard.check_and_record("今日は良い天気です。", start + chrono::Duration::milliseconds(5)));
        assert!(!guard.check_and_record("明日の会議資料を準備する", start + chrono::Duration::milliseconds(10)));

        let later = start + chrono::Duration::milliseconds(150);
        assert!(!guard.check_and_record("今日はとても良い天気です。", later));
    }

    #[test]
    fn fuzzy_matching_ignores_expired_entries() {
        let guard = guard(Duration::from_secs(10), 0.75);
        let start = at(12, 0, 0);
        assert!(!guard.check_and_record("今日はとても良い天気です。", start));
        assert!(guard.check_and_record("今日は良い天気です。", start + chrono::Duration::seconds(5)));

        let expired = start + chrono::Duration::seconds(10) + chrono::Duration::milliseconds(1);
        assert!(!guard.check_and_record("今日は良い天気です。", expired));
        // The expired entry is still cached until it passes twice the window.
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn exact_match_expires_at_the_window_boundary() {
        let guard = guard(Duration::from_secs(10), 0.9);
        let start = at(9, 0, 0);
        assert!(!guard.check_and_record("hello", start));
        assert!(guard.check_and_record("hello", start + chrono::Duration::milliseconds(9_999)));
        assert!(!guard.check_and_record("hello", start + chrono::Duration::seconds(10)));
    }

    #[test]
    fn suppressed_call_does_not_refresh_the_entry() {
        let guard = guard(Duration::from_secs(10), 0.9);
        let start = at(9, 0, 0);
        assert!(!guard.check_and_record("hello", start));
        assert!(guard.check_and_record("hello", start + chrono::Duration::seconds(9)));
        // Measured from the original acceptance, not the suppressed retry.
        assert!(!guard.check_and_record("hello", start + chrono::Duration::seconds(11)));
    }

    #[test]
    fn single_characters_skip_fuzzy_matching() {
        let guard = guard(Duration::from_secs(10), 0.0);
        let now = at(9, 0, 0);
        assert!(!guard.check_and_record("a", now));
        assert!(!guard.check_and_record("b", now));
        assert!(guard.check_and_record("a", now));
        // Threshold 0.0 suppresses any multi-character text against a live multi-character entry.
        assert!(!guard.check_and_record("xy", now));
        assert!(guard.check_and_record("zw", now));
    }

    #[test]
    fn stale_entries_are_pruned_after_twice_the_window() {
        let guard = guard(Duration::from_secs(10), 0.9);
        let start = at(9, 0, 0);
        assert!(!guard.check_and_record("first entry", start));
        assert!(!guard.check_and_record("second entry text", start + chrono::Duration::seconds(15)));
        assert_eq!(guard.len(), 2);
        assert!(!guard.check_and_record("third one here", start + chrono::Duration::seconds(21)));
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn reset_and_configure() {
        let guard = guard(Duration::from_secs(10), 0.9);
        let now = at(9, 0, 0);
        assert!(!guard.check_and_record("hello world", now));
        guard.reset();
        assert!(!guard.check_and_record("hello world", now));

        guard.configure(Duration::from_millis(1), 0.9);
        assert_eq!(guard.config().window, Duration::from_millis(1));
        assert!(!guard.check_and_record("hello world", now + chrono::Duration::milliseconds(5)));
    }

    #[test]
    fn concurrent_identical_submissions_allow_exactly_one() {
        let guard = Arc::new(SubmissionGuard::default());
        let now = at(9, 0, 0);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                std::thread::spawn(move || guard.check_and_record("並行投稿", now))
            })
            .collect();
        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|suppressed| !suppressed)
            .count();
        assert_eq!(allowed, 1);
    }
}
