use std::io;
use std::sync::mpsc::Sender;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::model::{BucketDetail, BucketSummary};

/// Default backend endpoint, overridable per binary with `--endpoint`.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000";

/// Failure shapes a fetch can come back with. Nothing panics past this
/// boundary; frontends render the message and move on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// HTTP client for the bucket backend.
///
/// Stateless apart from the connection pool: every call re-fetches, and
/// concurrent calls for different buckets are independent.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: Client,
    base_url: String,
}

impl Gateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The buckets worth surfacing in navigation: status done or manual
    /// only, sorted by size, largest first.
    pub async fn list_buckets(&self) -> Result<Vec<BucketSummary>, FetchError> {
        let url = format!("{}/", self.base_url);
        let body = self.fetch_text(&url).await?;
        let all: Vec<BucketSummary> = decode(&url, &body)?;
        debug!("bucket list fetched: {} entries", all.len());
        Ok(surfaced_buckets(all))
    }

    /// One bucket's snapshot, exactly as the backend sent it. Folder
    /// order is untouched here; sorting happens per level at render time.
    pub async fn bucket_detail(&self, bucket_name: &str) -> Result<BucketDetail, FetchError> {
        let url = format!("{}/{}", self.base_url, bucket_name);
        let body = self.fetch_text(&url).await?;
        decode(&url, &body)
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|source| {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(url: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Filter a raw listing down to the surfaced statuses and sort it by
/// size descending. The sort is stable, so equal sizes keep the
/// backend's relative order.
pub fn surfaced_buckets(mut all: Vec<BucketSummary>) -> Vec<BucketSummary> {
    all.retain(|b| b.status.is_surfaced());
    all.sort_by(|a, b| b.size.cmp(&a.size));
    all
}

/// Identity of one detail fetch: the request sequence current at
/// initiation plus the bucket it was for. Completions carry it back so
/// stale ones can be recognized and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub seq: u64,
    pub bucket_name: String,
}

/// Completions crossing from the fetch runtime back to the UI thread.
#[derive(Debug)]
pub enum FetchEvent {
    BucketList(Result<Vec<BucketSummary>, FetchError>),
    BucketDetail {
        request: DetailRequest,
        result: Result<BucketDetail, FetchError>,
    },
}

/// Runs gateway calls on a background tokio runtime and reports each
/// completion over an mpsc channel the UI polls every frame.
pub struct Fetcher {
    runtime: Runtime,
    gateway: Arc<Gateway>,
    tx: Sender<FetchEvent>,
}

impl Fetcher {
    pub fn new(gateway: Gateway, tx: Sender<FetchEvent>) -> io::Result<Self> {
        Ok(Self {
            runtime: Runtime::new()?,
            gateway: Arc::new(gateway),
            tx,
        })
    }

    /// Fire the bucket-list fetch; the completion arrives on the channel.
    pub fn request_bucket_list(&self) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = gateway.list_buckets().await;
            // The UI may already be gone during shutdown; a dead channel is fine.
            let _ = tx.send(FetchEvent::BucketList(result));
        });
    }

    /// Fire one detail fetch tagged with its request identity.
    pub fn request_bucket_detail(&self, request: DetailRequest) {
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = gateway.bucket_detail(&request.bucket_name).await;
            let _ = tx.send(FetchEvent::BucketDetail { request, result });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BucketStatus;

    fn summary(name: &str, size: u64, status: BucketStatus) -> BucketSummary {
        BucketSummary {
            bucket_name: name.to_string(),
            size,
            status,
        }
    }

    #[test]
    fn test_surfaced_buckets_filters_and_sorts() {
        let out = surfaced_buckets(vec![
            summary("backups", 50, BucketStatus::Manual),
            summary("tmp", 10, BucketStatus::Other),
            summary("logs", 100, BucketStatus::Done),
        ]);

        let names: Vec<&str> = out.iter().map(|b| b.bucket_name.as_str()).collect();
        assert_eq!(names, vec!["logs", "backups"]);
        assert_eq!(out[0].size, 100);
        assert_eq!(out[1].size, 50);
    }

    #[test]
    fn test_equal_sizes_keep_backend_order() {
        let out = surfaced_buckets(vec![
            summary("first", 70, BucketStatus::Done),
            summary("second", 70, BucketStatus::Manual),
            summary("third", 70, BucketStatus::Done),
        ]);

        let names: Vec<&str> = out.iter().map(|b| b.bucket_name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_nothing_surfaced_yields_empty_list() {
        // An all-filtered listing is still a successful fetch; showing the
        // empty state is the view's business.
        let out = surfaced_buckets(vec![
            summary("a", 10, BucketStatus::Other),
            summary("b", 20, BucketStatus::Other),
        ]);

        assert!(out.is_empty());
    }

    #[test]
    fn test_gateway_strips_trailing_slash() {
        let gateway = Gateway::new("http://127.0.0.1:8000/");
        assert_eq!(gateway.base_url(), "http://127.0.0.1:8000");
    }
}
