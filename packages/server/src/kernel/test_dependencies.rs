// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::jobs::{JobCancellations, PostgresJobQueue};
use super::{BaseAI, BaseFetcher, ServerDeps};
use crate::config::DiscoveryConfig;

// =============================================================================
// Mock AI (Generic LLM capabilities)
// =============================================================================

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Fail(String),
}

/// A recorded prompt pair.
#[derive(Debug, Clone)]
pub struct AiCall {
    pub system: String,
    pub user: String,
}

/// Pauses a [`MockAI`] call until the test releases it.
#[derive(Clone)]
pub struct MockGate {
    needle: String,
    triggered: Arc<AtomicBool>,
    reached: Arc<Notify>,
    release: Arc<Notify>,
}

impl MockGate {
    /// Wait until a prompt containing the gate's needle arrives.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    /// Let the paused call continue.
    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// LLM stand-in that answers by matching substrings of the user prompt.
///
/// Rules are checked in insertion order; the first needle contained in the
/// user prompt wins. Unmatched prompts get the default reply, or an error
/// when no default is set.
pub struct MockAI {
    rules: Mutex<Vec<(String, MockReply)>>,
    default: Mutex<Option<MockReply>>,
    calls: Mutex<Vec<AiCall>>,
    gate: Mutex<Option<MockGate>>,
}

impl Default for MockAI {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            default: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    /// Reply with `response` when the user prompt contains `needle`.
    pub fn with_response(self, needle: &str, response: &str) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((needle.to_string(), MockReply::Text(response.to_string())));
        self
    }

    /// Fail with `message` when the user prompt contains `needle`.
    pub fn with_failure(self, needle: &str, message: &str) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((needle.to_string(), MockReply::Fail(message.to_string())));
        self
    }

    pub fn with_default(self, response: &str) -> Self {
        *self.default.lock().unwrap() = Some(MockReply::Text(response.to_string()));
        self
    }

    /// Every unmatched call fails.
    pub fn failing(self, message: &str) -> Self {
        *self.default.lock().unwrap() = Some(MockReply::Fail(message.to_string()));
        self
    }

    /// Pause the first call whose user prompt contains `needle`.
    pub fn pause_on(self, needle: &str) -> (Self, MockGate) {
        let gate = MockGate {
            needle: needle.to_string(),
            triggered: Arc::new(AtomicBool::new(false)),
            reached: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        *self.gate.lock().unwrap() = Some(gate.clone());
        (self, gate)
    }

    pub fn calls(&self) -> Vec<AiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Whether any recorded user prompt contains `needle`.
    pub fn was_prompted_with(&self, needle: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c.user.contains(needle))
    }

    fn reply_for(&self, user: &str) -> Option<MockReply> {
        let rules = self.rules.lock().unwrap();
        rules
            .iter()
            .find(|(needle, _)| user.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .or_else(|| self.default.lock().unwrap().clone())
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.calls.lock().unwrap().push(AiCall {
            system: system.to_string(),
            user: user.to_string(),
        });

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if user.contains(gate.needle.as_str()) && !gate.triggered.swap(true, Ordering::SeqCst) {
                gate.reached.notify_one();
                gate.release.notified().await;
            }
        }

        match self.reply_for(user) {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("MockAI has no response for prompt: {}", user)),
        }
    }
}

// =============================================================================
// Mock Fetcher
// =============================================================================

/// HTTP stand-in keyed by URL prefix. Unmatched URLs fail like a 404.
#[derive(Default)]
pub struct MockFetcher {
    pages: Mutex<Vec<(String, String)>>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for any URL starting with `prefix`.
    pub fn with_page(self, prefix: &str, body: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .push((prefix.to_string(), body.to_string()));
        self
    }

    /// URLs fetched so far, query strings excluded.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseFetcher for MockFetcher {
    async fn get_text(&self, url: &str, _params: &[(&str, &str)]) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());

        self.pages
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| anyhow!("GET {} returned 404 Not Found", url))
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Discovery endpoints that only the mock fetcher knows about.
pub fn mock_discovery_config() -> DiscoveryConfig {
    DiscoveryConfig {
        wikipedia_api_url: "http://wiki.test/w/api.php".to_string(),
        brave_search_url: "http://brave.test/search".to_string(),
        yahoo_search_url: "http://yahoo.test/search".to_string(),
        youtube_search_url: "http://youtube.test/results".to_string(),
    }
}

/// Builder for a [`ServerDeps`] wired with mocks.
pub struct TestDependencies {
    pub ai: Arc<MockAI>,
    pub fetcher: Arc<MockFetcher>,
    pub job_cancellations: JobCancellations,
    pub generate_quizzes: bool,
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            ai: Arc::new(MockAI::new()),
            fetcher: Arc::new(MockFetcher::new()),
            job_cancellations: JobCancellations::new(),
            generate_quizzes: false,
        }
    }

    pub fn mock_ai(mut self, ai: MockAI) -> Self {
        self.ai = Arc::new(ai);
        self
    }

    pub fn mock_fetcher(mut self, fetcher: MockFetcher) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn generate_quizzes(mut self, enabled: bool) -> Self {
        self.generate_quizzes = enabled;
        self
    }

    pub fn into_server_deps(&self, db_pool: PgPool) -> Arc<ServerDeps> {
        Arc::new(ServerDeps::new(
            db_pool.clone(),
            self.ai.clone(),
            self.fetcher.clone(),
            Arc::new(PostgresJobQueue::new(db_pool)),
            self.job_cancellations.clone(),
            mock_discovery_config(),
            self.generate_quizzes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_ai_matches_first_rule() {
        let ai = MockAI::new()
            .with_response("outline", "{\"modules\": []}")
            .with_failure("broken", "boom")
            .with_default("fallback");

        assert_eq!(ai.complete("s", "an outline please").await.unwrap(), "{\"modules\": []}");
        assert!(ai.complete("s", "broken lesson").await.is_err());
        assert_eq!(ai.complete("s", "anything").await.unwrap(), "fallback");
        assert_eq!(ai.call_count(), 3);
        assert!(ai.was_prompted_with("broken"));
    }

    #[tokio::test]
    async fn mock_ai_without_default_errors() {
        let ai = MockAI::new();
        assert!(ai.complete("s", "u").await.is_err());
    }

    #[tokio::test]
    async fn mock_fetcher_matches_prefix() {
        let fetcher = MockFetcher::new().with_page("http://a.test/search", "<a>");
        assert_eq!(
            fetcher.get_text("http://a.test/search", &[("q", "x")]).await.unwrap(),
            "<a>"
        );
        assert!(fetcher.get_text("http://b.test/", &[]).await.is_err());
        assert_eq!(fetcher.calls().len(), 2);
    }
}
