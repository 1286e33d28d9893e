//! Descriptive statistics over per-face metrics.
//!
//! Non-finite values (NaN, ±∞) are dropped before anything is computed, so
//! the infinite aspect proxy of a degenerate triangle never skews a mean.
//! Percentiles interpolate linearly between the two closest ranks.
//!
//! ```
//! use mesh_quality::summary::summarize;
//!
//! let s = summarize(&[0.1, 0.3, 0.5, f64::NAN]);
//! assert_eq!(s.count, 3);
//! let stats = s.stats.unwrap();
//! assert_eq!(stats.median, 0.3);
//! assert_eq!((stats.min, stats.max), (0.1, 0.5));
//! ```

use serde::{Deserialize, Serialize};

use crate::quality::{Metric, MeshQuality};

/// Metrics included in the summary report, in report order.
pub const SUMMARY_METRICS: [Metric; 8] = [
    Metric::ShapeQuality,
    Metric::RadiusRatio,
    Metric::AspectProxy,
    Metric::MinAngle,
    Metric::MaxAngle,
    Metric::Area,
    Metric::MinEdge,
    Metric::MaxEdge,
];

/// Statistics of a non-empty set of finite values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub median: f64,
    pub p05: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
}

/// Summary of one metric. `stats` is `None` when no finite values remain.
///
/// Serializes as `{"n": 0}` or `{"n": 3, "mean": ..., ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    #[serde(rename = "n")]
    pub count: usize,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SummaryStats>,
}

/// Linear-interpolation percentile of sorted, non-empty data; `p` in `[0, 100]`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = (sorted.len() - 1) as f64 * p / 100.0;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = rank - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Summarize the finite entries of `values`.
pub fn summarize(values: &[f64]) -> MetricSummary {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return MetricSummary {
            count: 0,
            stats: None,
        };
    }
    finite.sort_by(f64::total_cmp);

    let n = finite.len();
    let mean = finite.iter().sum::<f64>() / n as f64;

    MetricSummary {
        count: n,
        stats: Some(SummaryStats {
            mean,
            median: percentile(&finite, 50.0),
            p05: percentile(&finite, 5.0),
            p25: percentile(&finite, 25.0),
            p75: percentile(&finite, 75.0),
            p95: percentile(&finite, 95.0),
            min: finite[0],
            max: finite[n - 1],
        }),
    }
}

/// Summary of every reported metric.
///
/// Serializes as a JSON object keyed by metric name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub shape_quality: MetricSummary,
    pub radius_ratio: MetricSummary,
    pub aspect_proxy: MetricSummary,
    pub min_angle: MetricSummary,
    pub max_angle: MetricSummary,
    pub area: MetricSummary,
    pub min_edge: MetricSummary,
    pub max_edge: MetricSummary,
}

impl QualitySummary {
    /// Summarize every reported metric of a scored mesh.
    pub fn from_quality(quality: &MeshQuality) -> Self {
        let s = |metric| summarize(&quality.values(metric));
        Self {
            shape_quality: s(Metric::ShapeQuality),
            radius_ratio: s(Metric::RadiusRatio),
            aspect_proxy: s(Metric::AspectProxy),
            min_angle: s(Metric::MinAngle),
            max_angle: s(Metric::MaxAngle),
            area: s(Metric::Area),
            min_edge: s(Metric::MinEdge),
            max_edge: s(Metric::MaxEdge),
        }
    }

    /// Summary of one metric, or None for a metric not in the report.
    pub fn get(&self, metric: Metric) -> Option<&MetricSummary> {
        match metric {
            Metric::ShapeQuality => Some(&self.shape_quality),
            Metric::RadiusRatio => Some(&self.radius_ratio),
            Metric::AspectProxy => Some(&self.aspect_proxy),
            Metric::MinAngle => Some(&self.min_angle),
            Metric::MaxAngle => Some(&self.max_angle),
            Metric::Area => Some(&self.area),
            Metric::MinEdge => Some(&self.min_edge),
            Metric::MaxEdge => Some(&self.max_edge),
            _ => None,
        }
    }

    /// `(metric, summary)` pairs in report order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, &MetricSummary)> + '_ {
        SUMMARY_METRICS
            .into_iter()
            .filter_map(move |m| self.get(m).map(|s| (m, s)))
    }

    /// Pretty JSON, as written to `<prefix>_summary.json`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_nan_excluded() {
        let s = summarize(&[0.1, 0.3, 0.5, f64::NAN]);
        assert_eq!(s.count, 3);
        let stats = s.stats.unwrap();
        assert_eq!(stats.min, 0.1);
        assert_eq!(stats.max, 0.5);
        assert_eq!(stats.median, 0.3);
        assert_relative_eq!(stats.mean, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_infinities_excluded() {
        let s = summarize(&[f64::INFINITY, 2.0, f64::NEG_INFINITY, 4.0]);
        assert_eq!(s.count, 2);
        assert_eq!(s.stats.unwrap().mean, 3.0);
    }

    #[test]
    fn test_empty_has_count_only() {
        let s = summarize(&[f64::NAN, f64::INFINITY]);
        assert_eq!(s, MetricSummary { count: 0, stats: None });
        assert_eq!(serde_json::to_string(&s).unwrap(), r#"{"n":0}"#);
        assert_eq!(summarize(&[]).count, 0);
    }

    #[test]
    fn test_linear_percentiles() {
        let s = summarize(&[4.0, 1.0, 3.0, 2.0, 5.0]).stats.unwrap();
        assert_relative_eq!(s.median, 3.0);
        assert_relative_eq!(s.p25, 2.0);
        assert_relative_eq!(s.p75, 4.0);
        assert_relative_eq!(s.p05, 1.2, epsilon = 1e-12);
        assert_relative_eq!(s.p95, 4.8, epsilon = 1e-12);

        let even = summarize(&[1.0, 2.0, 3.0, 4.0]).stats.unwrap();
        assert_relative_eq!(even.median, 2.5);
    }

    #[test]
    fn test_single_value() {
        let s = summarize(&[7.0]).stats.unwrap();
        assert_eq!((s.min, s.p05, s.median, s.p95, s.max), (7.0, 7.0, 7.0, 7.0, 7.0));
    }

    #[test]
    fn test_iter_follows_summary_order() {
        let mesh = crate::Mesh::from_arrays(
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            &[[0, 1, 2]],
        );
        let summary = QualitySummary::from_quality(&crate::compute_mesh_quality(&mesh));

        let metrics: Vec<Metric> = summary.iter().map(|(m, _)| m).collect();
        assert_eq!(metrics, SUMMARY_METRICS.to_vec());
        assert!(summary.iter().all(|(_, s)| s.count == 1));

        let (_, angle) = summary.iter().find(|(m, _)| *m == Metric::MinAngle).unwrap();
        assert_relative_eq!(angle.stats.unwrap().median, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_json_shape() {
        let s = summarize(&[1.0, 2.0]);
        let json = serde_json::to_value(s).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        for key in ["n", "mean", "median", "p05", "p25", "p75", "p95", "min", "max"] {
            assert!(keys.contains(&key), "missing {}", key);
        }
        let back: MetricSummary = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }
}
