//! JSON-over-HTTP calls to model providers with retry and backoff.
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)
//!
//! Errors are returned as plain messages; callers wrap them in the
//! provider-specific error kind.

use std::time::Duration;

use anyhow::Context;

/// Build a client with a per-request timeout.
pub fn client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// POST `body` to `url` and return the parsed JSON response.
///
/// Makes at most `max_retries + 1` attempts.
pub async fn post_json(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
) -> Result<serde_json::Value, String> {
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::warn!(
                url,
                attempt,
                delay_secs = delay.as_secs(),
                error = last_err.as_deref().unwrap_or(""),
                "retrying provider request"
            );
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return response
                        .json::<serde_json::Value>()
                        .await
                        .map_err(|e| format!("invalid JSON response: {}", e));
                }

                let body_text = response.text().await.unwrap_or_default();
                let message = format!("HTTP {}: {}", status, body_text);
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(message);
                    continue;
                }
                return Err(message);
            }
            Err(e) => {
                last_err = Some(e.to_string());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| "request failed after retries".to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Serve `router` on an ephemeral port and return its base URL.
    pub(crate) async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Fails with `status` for the first `failures` calls, then succeeds.
    async fn flaky(status: StatusCode, failures: usize) -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/",
            post(move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < failures {
                        (status, Json(serde_json::json!({"error": "nope"})))
                    } else {
                        (StatusCode::OK, Json(serde_json::json!({"ok": true})))
                    }
                }
            }),
        );
        (serve(router).await, hits)
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let (url, hits) = flaky(StatusCode::SERVICE_UNAVAILABLE, 0).await;
        let json = post_json(&client(5).unwrap(), &url, None, &serde_json::json!({}), 0)
            .await
            .unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let (url, hits) = flaky(StatusCode::SERVICE_UNAVAILABLE, 1).await;
        let err = post_json(&client(5).unwrap(), &url, None, &serde_json::json!({}), 0)
            .await
            .unwrap_err();
        assert!(err.contains("503"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let (url, hits) = flaky(StatusCode::SERVICE_UNAVAILABLE, 1).await;
        let json = post_json(&client(5).unwrap(), &url, None, &serde_json::json!({}), 1)
            .await
            .unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let (url, hits) = flaky(StatusCode::BAD_REQUEST, 1).await;
        let err = post_json(&client(5).unwrap(), &url, None, &serde_json::json!({}), 3)
            .await
            .unwrap_err();
        assert!(err.contains("400"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
