// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Business logic (what to prompt for, which pages to search) lives in
// domain activities that take these traits.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseFetcher)

use anyhow::Result;
use async_trait::async_trait;

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Complete a system + user prompt pair (returns raw text response)
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Complete a prompt expecting a JSON object back (returns raw JSON string)
    /// Parse with serde_json::from_str in calling code
    async fn complete_json(&self, system: &str, user: &str) -> Result<String> {
        self.complete(system, user).await
    }
}

// =============================================================================
// Fetcher Trait (Infrastructure - plain HTTP GET of public pages)
// =============================================================================

#[async_trait]
pub trait BaseFetcher: Send + Sync {
    /// GET `url` with the given query parameters and return the body.
    ///
    /// Non-success statuses are errors.
    async fn get_text(&self, url: &str, params: &[(&str, &str)]) -> Result<String>;
}
