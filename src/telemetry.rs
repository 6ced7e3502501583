//! Telemetry aggregation.
//!
//! Fetches raw CPU utilization points for one or many instances over a time
//! window and reshapes the provider's label-keyed series into one ordered
//! [`MetricSeries`] per instance. A series references its instance by id
//! only; it holds no reference to the `Instance` value itself.

use chrono::{DateTime, NaiveDateTime, Utc};
use snafu::prelude::*;
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::emit;
use crate::error::{MissingSeriesSnafu, QuerySnafu, TelemetryError, TimestampParseSnafu};
use crate::metrics::events::MetricPointsFetched;
use crate::provider::{MonitoringApi, RawPoint, TimeSeriesQuery};

/// Provider metric name for per-instance CPU utilization.
pub const CPU_UTILIZATION_METRIC: &str = "compute.googleapis.com/instance/cpu/utilization";

/// Label key carrying the instance name in monitoring responses.
const INSTANCE_NAME_LABEL: &str = "compute.googleapis.com/instance_name";

/// Textual format of point timestamps in monitoring responses.
const POINT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// A single utilization sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Per-instance ordered sequence of timestamped utilization samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub instance_id: String,
    /// Ascending by timestamp.
    pub points: Vec<MetricPoint>,
}

/// Fetches and normalizes provider metric streams.
pub struct TelemetryAggregator {
    monitoring: Arc<dyn MonitoringApi>,
    config: Arc<Config>,
}

impl TelemetryAggregator {
    pub fn new(monitoring: Arc<dyn MonitoringApi>, config: Arc<Config>) -> Self {
        Self { monitoring, config }
    }

    /// Fetch CPU utilization for the window `[start, end]`.
    ///
    /// In autoscaled mode a single prefix-filtered query covers the whole
    /// instance group and is demultiplexed into one series per distinct
    /// instance name found in the response labels; `instance_ids` is
    /// ignored. In fixed-roster mode one exact-match query is issued per
    /// id, producing one series per id in input order.
    pub async fn fetch_cpu_utilization(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        instance_ids: &[String],
    ) -> Result<Vec<MetricSeries>, TelemetryError> {
        // The provider calls its window bounds "oldest" and "youngest":
        // oldest receives the start of the window, youngest the end.
        let oldest = format_bound(start);
        let youngest = format_bound(end);

        let mut series = Vec::new();

        if self.config.roster.autoscaled {
            let prefix = self.config.roster.name_prefix();
            let query = TimeSeriesQuery {
                metric: CPU_UTILIZATION_METRIC.to_string(),
                oldest,
                youngest,
                label_filter: format!("{INSTANCE_NAME_LABEL}=~{prefix}*.+"),
            };
            let response = self
                .monitoring
                .list_time_series(&query)
                .await
                .context(QuerySnafu)?;

            for data in response.timeseries {
                series.push(MetricSeries {
                    instance_id: data.instance_name.clone(),
                    points: parse_points(&data.points)?,
                });
            }
        } else {
            for instance_id in instance_ids {
                let query = TimeSeriesQuery {
                    metric: CPU_UTILIZATION_METRIC.to_string(),
                    oldest: oldest.clone(),
                    youngest: youngest.clone(),
                    label_filter: format!("{INSTANCE_NAME_LABEL}=={instance_id}"),
                };
                let response = self
                    .monitoring
                    .list_time_series(&query)
                    .await
                    .context(QuerySnafu)?;

                let data = response
                    .timeseries
                    .first()
                    .context(MissingSeriesSnafu {
                        instance_id: instance_id.clone(),
                    })?;
                series.push(MetricSeries {
                    instance_id: instance_id.clone(),
                    points: parse_points(&data.points)?,
                });
            }
        }

        let total_points: u64 = series.iter().map(|s| s.points.len() as u64).sum();
        emit!(MetricPointsFetched {
            count: total_points
        });
        debug!(
            series = series.len(),
            points = total_points,
            "Fetched CPU utilization"
        );

        Ok(series)
    }

    /// Database metrics are not collected for this provider.
    ///
    /// Explicit empty-result contract: callers may rely on an `Ok` empty
    /// sequence rather than an error.
    pub async fn fetch_database_metrics(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _instance_ids: &[String],
    ) -> Result<Vec<MetricSeries>, TelemetryError> {
        Ok(Vec::new())
    }

    /// Autoscaling-group metrics are not collected for this provider.
    ///
    /// Explicit empty-result contract, same as [`Self::fetch_database_metrics`].
    pub async fn fetch_autoscaling_metrics(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<MetricSeries>, TelemetryError> {
        Ok(Vec::new())
    }
}

/// Format a window bound the way the provider expects,
/// `YYYY-MM-DDTHH:MM:SS.ffffffZ`.
fn format_bound(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Parse raw points into samples, ascending by timestamp.
fn parse_points(raw: &[RawPoint]) -> Result<Vec<MetricPoint>, TelemetryError> {
    let mut points = raw
        .iter()
        .map(|point| {
            let timestamp = NaiveDateTime::parse_from_str(&point.end, POINT_TIMESTAMP_FORMAT)
                .context(TimestampParseSnafu {
                    raw: point.end.clone(),
                })?
                .and_utc();
            Ok(MetricPoint {
                timestamp,
                value: point.double_value,
            })
        })
        .collect::<Result<Vec<_>, TelemetryError>>()?;

    points.sort_by_key(|point| point.timestamp);
    Ok(points)
}
