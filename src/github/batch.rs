// Concurrent batch fetching.
// Many keyed GETs run concurrently on the current task; the first failure aborts the batch.

use std::collections::HashMap;

use futures::{StreamExt, TryStreamExt, stream};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, ScanError};

use super::client::GitHubClient;

/// One keyed request within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub key: String,
    pub locator: String,
}

impl BatchRequest {
    pub fn new(key: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            locator: locator.into(),
        }
    }
}

/// A decoded response, tagged with the request it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponse {
    pub key: String,
    pub locator: String,
    pub body: Value,
}

impl GitHubClient {
    /// Fetch every request concurrently and return the results keyed by request key.
    ///
    /// Completion order is unspecified. Any failed request fails the whole call and
    /// drops the requests still in flight; no partial map is returned.
    ///
    /// Keys should be unique. When they are not, the request submitted last wins,
    /// whatever order the responses arrived in.
    pub async fn fetch_many(
        &self,
        requests: Vec<BatchRequest>,
    ) -> Result<HashMap<String, BatchResponse>> {
        let total = requests.len();
        debug!(total, max_concurrency = self.max_concurrency(), "batch fetch");

        let mut slots: Vec<Option<BatchResponse>> = vec![None; total];
        let mut in_flight = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| async move {
                let body = self.fetch_json(&request.locator).await?;
                Ok::<_, ScanError>((
                    index,
                    BatchResponse {
                        key: request.key,
                        locator: request.locator,
                        body,
                    },
                ))
            })
            .buffer_unordered(self.max_concurrency());

        while let Some((index, response)) = in_flight.try_next().await? {
            slots[index] = Some(response);
        }

        let mut results = HashMap::with_capacity(total);
        for response in slots.into_iter().flatten() {
            let key = response.key.clone();
            if results.insert(key.clone(), response).is_some() {
                warn!(%key, "duplicate batch key, keeping the later request");
            }
        }
        Ok(results)
    }
}
