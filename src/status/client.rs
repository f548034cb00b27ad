//! Probe client: single-channel liveness checks against the streaming engine.

use super::{ChannelStatus, ProbeStatus};
use crate::db::Store;

use chrono::Utc;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-request timeout against the engine.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Player ids wrap at this modulus to stay within the engine's expected range.
const PLAYER_ID_MODULUS: u64 = 100_000;

/// Engine liveness response body. Decoded once, then matched.
#[derive(Debug, Deserialize)]
struct EngineResponse {
    #[serde(default)]
    response: Option<EngineStreamStatus>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EngineStreamStatus {
    #[serde(default)]
    is_live: Option<i64>,
}

/// Client for checking channel status via the engine HTTP API.
///
/// A probe is single-shot and idempotent; retries are the caller's concern.
pub struct StatusClient {
    http: reqwest::Client,
    engine_url: String,
    store: Arc<Store>,
    /// Distinct player id per probe, so concurrent probes do not collide on an
    /// upstream session.
    next_player_id: AtomicU64,
}

impl StatusClient {
    /// Create a client with the default request timeout.
    ///
    /// `engine_url` must already be normalized (scheme present, no trailing
    /// slash), see [`crate::config::normalize_engine_url`].
    pub fn new(engine_url: &str, store: Arc<Store>) -> Self {
        Self::with_timeout(engine_url, store, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(engine_url: &str, store: Arc<Store>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            http,
            engine_url: engine_url.to_string(),
            store,
            next_player_id: AtomicU64::new(0),
        }
    }

    /// Check whether a single channel is currently servable by the engine.
    ///
    /// Never fails: every failure mode is folded into the returned outcome.
    /// The outcome is persisted best-effort before returning; a failed write
    /// is logged and does not affect the answer.
    pub async fn check_channel(&self, channel_id: &str) -> ChannelStatus {
        let check_time = Utc::now();
        let pid = self.next_player_id.fetch_add(1, Ordering::Relaxed) % PLAYER_ID_MODULUS;
        let pid = pid.to_string();

        let url = format!("{}/ace/getstream", self.engine_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("id", channel_id),
                ("format", "json"),
                ("method", "get_status"),
                ("pid", pid.as_str()),
            ])
            .send()
            .await;

        let outcome = match response {
            Err(e) if e.is_timeout() => {
                tracing::warn!("Timeout checking channel {}", channel_id);
                self.error_outcome(channel_id, "Request timeout".to_string(), check_time)
            }
            Err(e) => {
                tracing::error!("Error checking channel {}: {}", channel_id, e);
                self.error_outcome(channel_id, e.to_string(), check_time)
            }
            Ok(resp) if !resp.status().is_success() => {
                let msg = format!("HTTP {}", resp.status().as_u16());
                self.error_outcome(channel_id, msg, check_time)
            }
            Ok(resp) => match resp.json::<EngineResponse>().await {
                Err(e) => {
                    let msg = format!("Invalid response format: {}", e);
                    self.error_outcome(channel_id, msg, check_time)
                }
                Ok(body) => self.interpret(channel_id, body, check_time),
            },
        };

        self.persist(&outcome);
        outcome
    }

    /// Interpret a decoded engine response, in priority order.
    fn interpret(
        &self,
        channel_id: &str,
        body: EngineResponse,
        check_time: chrono::DateTime<Utc>,
    ) -> ChannelStatus {
        // "got newer download" means the stream exists and is already being
        // served; the engine reports it as an error but the channel is online.
        if let Some(error) = &body.error {
            if error.to_lowercase().contains("got newer download") {
                return ChannelStatus {
                    channel_id: channel_id.to_string(),
                    is_online: true,
                    status: ProbeStatus::Online,
                    message: "Channel is available".to_string(),
                    last_checked: check_time,
                    error: None,
                };
            }
        }

        if body.error.is_none()
            && body
                .response
                .as_ref()
                .map_or(false, |r| r.is_live == Some(1))
        {
            return ChannelStatus {
                channel_id: channel_id.to_string(),
                is_online: true,
                status: ProbeStatus::Online,
                message: "Channel is live".to_string(),
                last_checked: check_time,
                error: None,
            };
        }

        let message = body.error.unwrap_or_else(|| "Channel is not live".to_string());
        ChannelStatus {
            channel_id: channel_id.to_string(),
            is_online: false,
            status: ProbeStatus::Offline,
            message: message.clone(),
            last_checked: check_time,
            error: Some(message),
        }
    }

    fn error_outcome(
        &self,
        channel_id: &str,
        message: String,
        check_time: chrono::DateTime<Utc>,
    ) -> ChannelStatus {
        ChannelStatus {
            channel_id: channel_id.to_string(),
            is_online: false,
            status: ProbeStatus::Error,
            message: message.clone(),
            last_checked: check_time,
            error: Some(message),
        }
    }

    /// Best-effort write-back of an outcome. The probe's answer to the caller
    /// is authoritative even if this write fails.
    fn persist(&self, outcome: &ChannelStatus) {
        if let Err(e) = self.store.update_channel_status(
            &outcome.channel_id,
            outcome.is_online,
            outcome.error.as_deref(),
        ) {
            tracing::warn!(
                "Failed to persist status for channel {}: {}",
                outcome.channel_id,
                e
            );
        }
    }
}
