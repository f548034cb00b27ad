//! Channel liveness probing engine.
//!
//! Probes channels against the external streaming engine, bounds outbound
//! concurrency, and aggregates fleet-wide status counts.

mod batch;
mod client;
mod service;

pub use batch::*;
pub use client::*;
pub use service::*;

use crate::db::DbError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resolution-time errors, surfaced to the caller before any probe runs.
///
/// Probe-time failures (timeouts, transport errors, upstream errors) are never
/// errors at this level; they are captured inside [`ChannelStatus`].
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
    #[error("no channels found to check")]
    NoChannels,
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Probe outcome classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Online,
    Offline,
    Error,
}

/// The outcome of one liveness probe. Response-scoped and immutable; only the
/// persisted online flag, check time, and error text outlive the response.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelStatus {
    pub channel_id: String,
    pub is_online: bool,
    pub status: ProbeStatus,
    pub message: String,
    pub last_checked: DateTime<Utc>,
    pub error: Option<String>,
}

/// Request schema for bulk status checking.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusCheckRequest {
    /// Explicit channel ids to check; when absent, all active channels are
    /// checked. Duplicates are probed independently, not deduplicated.
    #[serde(default)]
    pub channel_ids: Option<Vec<String>>,
    /// Maximum simultaneous in-flight probes (default: 3).
    #[serde(default)]
    pub concurrency: Option<usize>,
}

/// Response for bulk status check operations.
#[derive(Debug, Clone, Serialize)]
pub struct BulkCheckResponse {
    pub total_channels: usize,
    /// 0 when the check was deferred to the background queue.
    pub total_checked: usize,
    pub online_count: usize,
    pub offline_count: usize,
    pub results: Vec<ChannelStatus>,
    pub summary: StatusSummary,
}

/// Fleet-wide status counts, recomputed from persisted state on every call.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub total_channels: usize,
    pub active_channels: usize,
    pub online: usize,
    pub offline: usize,
    /// Channels never probed, or whose status was never recorded.
    pub unknown: usize,
    /// Channels checked since the start of the current UTC day.
    pub recent_checks: usize,
    pub online_percentage: f64,
    pub checked_percentage: f64,
}
