use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes a prepared request. Wrap an implementation to add headers,
/// auth or retries without touching the loaders.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
