//! Status service: dispatch policy and fleet-wide summary.

use super::{
    check_channels, BulkCheckResponse, ChannelStatus, StatusCheckRequest, StatusClient,
    StatusError, StatusSummary,
};
use crate::db::Store;
use crate::tasks::TaskQueue;

use chrono::{NaiveTime, Utc};
use std::sync::Arc;

/// Batches larger than this are handed to the background queue instead of
/// being checked inline.
const BACKGROUND_THRESHOLD: usize = 20;

/// Default number of simultaneous in-flight probes.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Upper bound on channels read for a summary.
const SUMMARY_LIMIT: i64 = 10_000;

/// Entry point for status checking, exposed to the routing layer.
pub struct StatusService {
    store: Arc<Store>,
    client: Arc<StatusClient>,
    tasks: TaskQueue,
}

impl StatusService {
    /// Create the service and its background task queue. Must be called from
    /// within a Tokio runtime.
    pub fn new(store: Arc<Store>, client: Arc<StatusClient>) -> Self {
        Self {
            store,
            client,
            tasks: TaskQueue::new(),
        }
    }

    /// Check a single channel. The id is resolved before any network call;
    /// an unknown id fails here, never as a probe outcome.
    pub async fn check_one(&self, channel_id: &str) -> Result<ChannelStatus, StatusError> {
        let channel = self
            .store
            .get_channel(channel_id)
            .map_err(|_| StatusError::ChannelNotFound(channel_id.to_string()))?;

        Ok(self.client.check_channel(&channel.id).await)
    }

    /// Check many channels, inline or deferred depending on batch size.
    ///
    /// Explicit ids are resolved against the store, silently skipping
    /// unresolvable ones; without explicit ids all active channels are
    /// checked. `limit` truncates the resolved set before the size check, so
    /// a limit can pull a request back under the background threshold.
    pub async fn check_many(
        &self,
        request: &StatusCheckRequest,
        limit: Option<usize>,
    ) -> Result<BulkCheckResponse, StatusError> {
        let mut channel_ids: Vec<String> = match &request.channel_ids {
            Some(ids) if !ids.is_empty() => ids
                .iter()
                .filter_map(|id| self.store.get_channel(id).ok())
                .map(|c| c.id)
                .collect(),
            _ => self
                .store
                .get_channels(true, SUMMARY_LIMIT)?
                .into_iter()
                .map(|c| c.id)
                .collect(),
        };

        if channel_ids.is_empty() {
            return Err(StatusError::NoChannels);
        }

        if let Some(limit) = limit {
            channel_ids.truncate(limit);
        }

        let concurrency = request.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        let total_channels = channel_ids.len();

        if total_channels > BACKGROUND_THRESHOLD {
            tracing::info!(
                "Deferring status check of {} channels to the background queue",
                total_channels
            );
            let client = self.client.clone();
            self.tasks.submit(async move {
                let results = check_channels(client, channel_ids, concurrency).await;
                tracing::info!("Background status check finished, {} channels", results.len());
            });

            return Ok(BulkCheckResponse {
                total_channels,
                total_checked: 0,
                online_count: 0,
                offline_count: 0,
                results: Vec::new(),
                summary: self.summary()?,
            });
        }

        let results = check_channels(self.client.clone(), channel_ids, concurrency).await;
        let online_count = results.iter().filter(|r| r.is_online).count();

        Ok(BulkCheckResponse {
            total_channels,
            total_checked: results.len(),
            online_count,
            offline_count: results.len() - online_count,
            results,
            summary: self.summary()?,
        })
    }

    /// Compute fleet-wide counts from the currently persisted state.
    pub fn summary(&self) -> Result<StatusSummary, StatusError> {
        let channels = self.store.get_channels(false, SUMMARY_LIMIT)?;

        let total = channels.len();
        let active = channels.iter().filter(|c| c.is_active).count();
        let online = channels.iter().filter(|c| c.is_online == Some(true)).count();
        let offline = channels.iter().filter(|c| c.is_online == Some(false)).count();
        let unknown = channels.iter().filter(|c| c.is_online.is_none()).count();

        // Calendar-day boundary, not a rolling 24h window.
        let day_start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        let recent_checks = channels
            .iter()
            .filter(|c| c.last_checked.map_or(false, |t| t >= day_start))
            .count();

        Ok(StatusSummary {
            total_channels: total,
            active_channels: active,
            online,
            offline,
            unknown,
            recent_checks,
            online_percentage: percentage(online, total),
            checked_percentage: percentage(recent_checks, total),
        })
    }
}

/// Percentage rounded to one decimal place; 0.0 for an empty fleet.
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 1000.0).round() / 10.0
}
