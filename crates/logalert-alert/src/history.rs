use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

pub const DEFAULT_CAPACITY: usize = 1000;

/// One sample of a derived metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Fixed-capacity ring of points; `head` is the slot of the oldest point
/// once the ring is full.
struct Series {
    points: Vec<MetricPoint>,
    head: usize,
}

impl Series {
    fn new(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            head: 0,
        }
    }

    fn push(&mut self, point: MetricPoint, capacity: usize) {
        if self.points.len() < capacity {
            self.points.push(point);
        } else {
            self.points[self.head] = point;
            self.head = (self.head + 1) % capacity;
        }
    }

    /// Oldest to newest.
    fn iter(&self) -> impl Iterator<Item = &MetricPoint> {
        let (newer, older) = self.points.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    fn latest(&self) -> Option<&MetricPoint> {
        if self.points.is_empty() {
            return None;
        }
        let idx = (self.head + self.points.len() - 1) % self.points.len();
        self.points.get(idx)
    }
}

/// Bounded per-metric time series.
///
/// Series are created on first write and kept for the lifetime of the
/// history; each holds at most `capacity` points and overwrites its oldest
/// point when full.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use logalert_alert::history::MetricsHistory;
///
/// let mut history = MetricsHistory::with_capacity(2);
/// let now = Utc::now();
/// history.record("latency", now - Duration::seconds(30), 1.0);
/// history.record("latency", now - Duration::seconds(20), 2.0);
/// history.record("latency", now - Duration::seconds(10), 3.0);
///
/// let values: Vec<f64> = history.window("latency", now, 60).iter().map(|p| p.value).collect();
/// assert_eq!(values, vec![2.0, 3.0]);
/// assert!(history.window("unknown", now, 60).is_empty());
/// ```
pub struct MetricsHistory {
    capacity: usize,
    index: HashMap<String, usize>,
    series: Vec<Series>,
}

impl Default for MetricsHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A capacity of 0 is treated as 1.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            index: HashMap::new(),
            series: Vec::new(),
        }
    }

    /// Appends a point. Values are stored as given, NaN included.
    pub fn record(&mut self, metric: &str, timestamp: DateTime<Utc>, value: f64) {
        let slot = match self.index.get(metric) {
            Some(&slot) => slot,
            None => {
                self.series.push(Series::new(self.capacity));
                let slot = self.series.len() - 1;
                self.index.insert(metric.to_string(), slot);
                slot
            }
        };
        self.series[slot].push(MetricPoint { timestamp, value }, self.capacity);
    }

    /// Points with `timestamp >= now - duration_secs`, oldest first.
    /// Unknown metrics yield an empty vector.
    pub fn window(&self, metric: &str, now: DateTime<Utc>, duration_secs: u64) -> Vec<MetricPoint> {
        let Some(series) = self.get(metric) else {
            return Vec::new();
        };
        let cutoff = now - Duration::seconds(clamp_secs(duration_secs));
        series
            .iter()
            .filter(|p| p.timestamp >= cutoff)
            .copied()
            .collect()
    }

    pub fn latest(&self, metric: &str) -> Option<MetricPoint> {
        self.get(metric).and_then(Series::latest).copied()
    }

    /// Number of points currently held for `metric`.
    pub fn len(&self, metric: &str) -> usize {
        self.get(metric).map_or(0, |s| s.points.len())
    }

    /// Metric names in creation order.
    pub fn metric_names(&self) -> Vec<&str> {
        let mut names: Vec<(&str, usize)> =
            self.index.iter().map(|(k, &v)| (k.as_str(), v)).collect();
        names.sort_by_key(|&(_, slot)| slot);
        names.into_iter().map(|(name, _)| name).collect()
    }

    fn get(&self, metric: &str) -> Option<&Series> {
        self.index.get(metric).map(|&slot| &self.series[slot])
    }
}

/// Keeps window arithmetic inside chrono's representable range.
pub(crate) fn clamp_secs(secs: u64) -> i64 {
    const MAX_WINDOW_SECS: u64 = 100 * 365 * 86_400;
    secs.min(MAX_WINDOW_SECS) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn values(points: &[MetricPoint]) -> Vec<f64> {
        points.iter().map(|p| p.value).collect()
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut history = MetricsHistory::with_capacity(1000);
        for i in 0..1005 {
            history.record("m", t(i), i as f64);
        }
        assert_eq!(history.len("m"), 1000);

        let all = history.window("m", t(2000), 100_000);
        assert_eq!(all.len(), 1000);
        assert_eq!(all.first().unwrap().value, 5.0);
        assert_eq!(all.last().unwrap().value, 1004.0);
        assert_eq!(history.latest("m").unwrap().value, 1004.0);
    }

    #[test]
    fn window_keeps_insertion_order_across_wraparound() {
        let mut history = MetricsHistory::with_capacity(3);
        for (i, v) in [1.0, 2.0, 3.0, 4.0, 5.0].into_iter().enumerate() {
            history.record("m", t(i as i64), v);
        }
        assert_eq!(values(&history.window("m", t(10), 60)), vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn window_cutoff_is_inclusive() {
        let mut history = MetricsHistory::new();
        history.record("m", t(0), 1.0);
        history.record("m", t(40), 2.0);
        history.record("m", t(100), 3.0);

        assert_eq!(values(&history.window("m", t(100), 60)), vec![2.0, 3.0]);
        assert_eq!(
            values(&history.window("m", t(100), 100)),
            vec![1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn unknown_metric_is_empty() {
        let history = MetricsHistory::new();
        assert!(history.window("nope", t(0), 300).is_empty());
        assert!(history.latest("nope").is_none());
        assert_eq!(history.len("nope"), 0);
    }

    #[test]
    fn accepts_nan_values() {
        let mut history = MetricsHistory::new();
        history.record("m", t(0), f64::NAN);
        assert!(history.latest("m").unwrap().value.is_nan());
    }

    #[test]
    fn zero_capacity_keeps_latest_point() {
        let mut history = MetricsHistory::with_capacity(0);
        history.record("m", t(0), 1.0);
        history.record("m", t(1), 2.0);
        assert_eq!(values(&history.window("m", t(1), 60)), vec![2.0]);
    }

    #[test]
    fn metric_names_in_creation_order() {
        let mut history = MetricsHistory::new();
        history.record("log_frequency", t(0), 1.0);
        history.record("error_rate", t(0), 0.0);
        history.record("log_frequency", t(1), 2.0);
        assert_eq!(history.metric_names(), vec!["log_frequency", "error_rate"]);
    }
}
