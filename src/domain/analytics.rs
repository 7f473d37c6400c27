// Reporting view over the cached live table and the historical dataset
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::flow::{CongestionLevel, FlowSnapshot};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LiveKpis {
    pub fetched_at: DateTime<Utc>,
    pub sample_count: usize,
    pub avg_current_speed: f64,
    pub avg_free_flow_speed: f64,
    pub high_congestion_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DelaySeverity {
    None,
    Minor,
    Severe,
}

impl DelaySeverity {
    pub fn from_delay(delay_seconds: f64) -> Self {
        if delay_seconds > 60.0 {
            DelaySeverity::Severe
        } else if delay_seconds > 0.0 {
            DelaySeverity::Minor
        } else {
            DelaySeverity::None
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LocationDelay {
    pub location_name: String,
    pub delay_seconds: f64,
    pub severity: DelaySeverity,
}

/// One row of the reference dataset, reduced to what the reports need.
/// Blank or unreadable numeric cells are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalRecord {
    pub location_name: String,
    pub timestamp: NaiveDateTime,
    pub current_speed: Option<f64>,
    pub current_travel_time: Option<f64>,
    pub free_flow_travel_time: Option<f64>,
}

/// A mean is `None` when the hour has no value for that column.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HourlyStat {
    pub hour: u32,
    pub avg_speed: Option<f64>,
    pub avg_current_travel_time: Option<f64>,
    pub avg_free_flow_travel_time: Option<f64>,
    pub avg_delay: Option<f64>,
}

pub fn live_kpis(snapshot: &FlowSnapshot) -> LiveKpis {
    let rows = &snapshot.rows;
    LiveKpis {
        fetched_at: snapshot.fetched_at,
        sample_count: rows.len(),
        avg_current_speed: mean(rows.iter().map(|r| r.current_speed)),
        avg_free_flow_speed: mean(rows.iter().map(|r| r.free_flow_speed)),
        high_congestion_count: rows
            .iter()
            .filter(|r| r.congestion_level == CongestionLevel::High)
            .count(),
    }
}

pub fn location_delays(snapshot: &FlowSnapshot) -> Vec<LocationDelay> {
    snapshot
        .rows
        .iter()
        .map(|r| {
            let delay_seconds = r.delay_seconds();
            LocationDelay {
                location_name: r.location_name.clone(),
                delay_seconds,
                severity: DelaySeverity::from_delay(delay_seconds),
            }
        })
        .collect()
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

#[derive(Default)]
struct HourBucket {
    speed: Accumulator,
    current_travel_time: Accumulator,
    free_flow_travel_time: Accumulator,
}

/// Means per hour of day, ordered by hour. Hours without rows are absent;
/// missing cells are skipped column by column.
pub fn hourly_stats(records: &[HistoricalRecord]) -> Vec<HourlyStat> {
    let mut buckets: BTreeMap<u32, HourBucket> = BTreeMap::new();
    for record in records {
        let bucket = buckets.entry(record.timestamp.hour()).or_default();
        bucket.speed.add(record.current_speed);
        bucket.current_travel_time.add(record.current_travel_time);
        bucket.free_flow_travel_time.add(record.free_flow_travel_time);
    }

    buckets
        .into_iter()
        .map(|(hour, b)| {
            let avg_current_travel_time = b.current_travel_time.mean();
            let avg_free_flow_travel_time = b.free_flow_travel_time.mean();
            HourlyStat {
                hour,
                avg_speed: b.speed.mean(),
                avg_current_travel_time,
                avg_free_flow_travel_time,
                avg_delay: avg_current_travel_time
                    .zip(avg_free_flow_travel_time)
                    .map(|(current, free)| current - free),
            }
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}
