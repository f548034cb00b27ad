//! Bounded batch prober: drives the probe client over many channels.

use super::{ChannelStatus, ProbeStatus, StatusClient};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Channels are processed in fixed-size batches to bound peak memory and the
/// number of connections scheduled at once.
const BATCH_SIZE: usize = 10;

/// Pause after each probe, before its semaphore slot is released. Throttles
/// request rate independently of the concurrency width.
const REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Pause between batches, skipped after the final batch.
const BATCH_DELAY: Duration = Duration::from_secs(2);

/// Check many channels concurrently, with at most `concurrency` probes in
/// flight at once.
///
/// Returns exactly one outcome per input id (duplicates probed independently).
/// No individual failure aborts the run; a task fault degrades to an
/// error-status outcome for that channel. Result order is not guaranteed to
/// match input order.
pub async fn check_channels(
    client: Arc<StatusClient>,
    channel_ids: Vec<String>,
    concurrency: usize,
) -> Vec<ChannelStatus> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let total = channel_ids.len();
    let mut all_results = Vec::with_capacity(total);

    for (batch_index, batch) in channel_ids.chunks(BATCH_SIZE).enumerate() {
        // JoinSet aborts in-flight probes if this future is dropped mid-batch.
        let mut tasks = tokio::task::JoinSet::new();

        for channel_id in batch {
            let client = client.clone();
            let semaphore = semaphore.clone();
            let task_id = channel_id.clone();

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return fault_outcome(&task_id, "probe slot unavailable"),
                };
                let outcome = client.check_channel(&task_id).await;
                tokio::time::sleep(REQUEST_DELAY).await;
                outcome
            });
        }

        let mut batch_results = Vec::with_capacity(batch.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => batch_results.push(outcome),
                Err(e) => tracing::error!("Probe task failed: {}", e),
            }
        }

        // A faulted task loses its outcome; every input id still gets exactly
        // one entry, so reconcile the ids that went missing.
        let mut remaining: Vec<&String> = batch.iter().collect();
        for result in &batch_results {
            if let Some(pos) = remaining.iter().position(|id| **id == result.channel_id) {
                remaining.swap_remove(pos);
            }
        }
        for channel_id in remaining {
            batch_results.push(fault_outcome(channel_id, "probe task failed"));
        }
        all_results.append(&mut batch_results);

        if (batch_index + 1) * BATCH_SIZE < total {
            tokio::time::sleep(BATCH_DELAY).await;
        }
    }

    all_results
}

fn fault_outcome(channel_id: &str, message: &str) -> ChannelStatus {
    ChannelStatus {
        channel_id: channel_id.to_string(),
        is_online: false,
        status: ProbeStatus::Error,
        message: message.to_string(),
        last_checked: Utc::now(),
        error: Some(message.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Channel, Store};
    use tempfile::NamedTempFile;

    fn test_client(engine_url: &str) -> (NamedTempFile, Arc<StatusClient>) {
        let tmp = NamedTempFile::new().unwrap();
        let store = Arc::new(Store::new(tmp.path()).unwrap());
        for id in ["a", "b", "c"] {
            store
                .add_channel(&Channel {
                    id: id.to_string(),
                    name: id.to_string(),
                    ..Default::default()
                })
                .unwrap();
        }
        (tmp, Arc::new(StatusClient::new(engine_url, store)))
    }

    #[tokio::test]
    async fn test_mixed_outcomes_one_per_channel() {
        let mut server = mockito::Server::new_async().await;
        let _online = server
            .mock("GET", "/ace/getstream")
            .match_query(mockito::Matcher::UrlEncoded("id".into(), "a".into()))
            .with_status(200)
            .with_body(r#"{"response": {"is_live": 1}, "error": null}"#)
            .create_async()
            .await;
        let _http_error = server
            .mock("GET", "/ace/getstream")
            .match_query(mockito::Matcher::UrlEncoded("id".into(), "b".into()))
            .with_status(500)
            .create_async()
            .await;
        let _garbage = server
            .mock("GET", "/ace/getstream")
            .match_query(mockito::Matcher::UrlEncoded("id".into(), "c".into()))
            .with_status(200)
            .with_body("<html>nope</html>")
            .create_async()
            .await;

        let (_tmp, client) = test_client(&server.url());
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let results = check_channels(client, ids, 1).await;

        assert_eq!(results.len(), 3);
        let by_id = |id: &str| results.iter().find(|r| r.channel_id == id).unwrap();

        assert!(by_id("a").is_online);
        assert_eq!(by_id("b").status, ProbeStatus::Error);
        assert_eq!(by_id("b").message, "HTTP 500");
        assert_eq!(by_id("c").status, ProbeStatus::Error);
        assert!(by_id("c").message.starts_with("Invalid response format"));

        let online_count = results.iter().filter(|r| r.is_online).count();
        assert_eq!(online_count, 1);
        assert_eq!(results.len() - online_count, 2);
    }

    #[tokio::test]
    async fn test_duplicate_ids_probed_independently() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/ace/getstream")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"response": {"is_live": 1}, "error": null}"#)
            .expect_at_least(2)
            .create_async()
            .await;

        let (_tmp, client) = test_client(&server.url());
        let ids = vec!["a".to_string(), "a".to_string()];
        let results = check_channels(client, ids, 2).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.channel_id == "a"));
    }

    #[tokio::test]
    async fn test_concurrency_width_does_not_change_results() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/ace/getstream")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error": "unable to find content"}"#)
            .create_async()
            .await;

        let (_tmp, client) = test_client(&server.url());
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let narrow = check_channels(client.clone(), ids.clone(), 1).await;
        let wide = check_channels(client, ids, 3).await;

        let mut narrow_ids: Vec<_> = narrow.iter().map(|r| r.channel_id.clone()).collect();
        let mut wide_ids: Vec<_> = wide.iter().map(|r| r.channel_id.clone()).collect();
        narrow_ids.sort();
        wide_ids.sort();
        assert_eq!(narrow_ids, wide_ids);
        assert!(narrow.iter().all(|r| r.status == ProbeStatus::Offline));
        assert!(wide.iter().all(|r| r.status == ProbeStatus::Offline));
    }
}
