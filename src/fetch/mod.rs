//! Retrieval of raw resource payloads over HTTP or from local files.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use tracing::debug;

use crate::error::DataError;

/// GETs `url` and returns the body as text.
///
/// # Errors
///
/// Returns [`DataError::FetchFailure`] on transport errors or a
/// non-success status.
pub async fn fetch_text<C: HttpClient>(client: &C, url: &str) -> Result<String, DataError> {
    let failure = |message: String| DataError::FetchFailure {
        resource: url.to_string(),
        message,
    };

    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse::<reqwest::Url>()
            .map_err(|e| failure(e.to_string()))?,
    );

    let resp = client
        .execute(req)
        .await
        .map_err(|e| failure(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(failure(format!("status {status}")));
    }

    resp.text().await.map_err(|e| failure(e.to_string()))
}

/// Joins a base location and a resource name with a single `/`.
pub fn resource_location(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

/// Loads a resource from an `http(s)` URL or a local file path.
///
/// # Errors
///
/// Returns [`DataError::FetchFailure`] when the resource cannot be retrieved
/// or does not exist, and [`DataError::Io`] for other local read errors.
#[tracing::instrument(skip(client))]
pub async fn read_resource<C: HttpClient>(client: &C, location: &str) -> Result<String, DataError> {
    if location.starts_with("http") {
        fetch_text(client, location).await
    } else {
        debug!("Reading resource from disk");
        tokio::fs::read_to_string(location).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DataError::FetchFailure {
                resource: location.to_string(),
                message: e.to_string(),
            },
            _ => DataError::Io(e),
        })
    }
}
