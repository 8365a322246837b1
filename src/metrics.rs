//! Body weight history.

use crate::model::{BodyMetric, Millis};
use crate::units::{WeightUnit, convert};

/// Create a metric stamped at `now`, recorded in `unit`.
pub fn new_metric(weight: f64, unit: WeightUnit, note: Option<String>, now: Millis) -> BodyMetric {
    BodyMetric {
        id: format!("bm_{now}"),
        date: now,
        weight,
        unit,
        note,
    }
}

/// Metrics ordered newest first.
pub fn newest_first(metrics: &[BodyMetric]) -> Vec<&BodyMetric> {
    let mut sorted: Vec<&BodyMetric> = metrics.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

/// Latest recorded weight converted to `display`.
pub fn current_weight(metrics: &[BodyMetric], display: WeightUnit) -> Option<f64> {
    metrics
        .iter()
        .max_by_key(|m| m.date)
        .map(|m| convert(m.weight, m.unit, display))
}

/// Earliest recorded weight converted to `display`.
pub fn starting_weight(metrics: &[BodyMetric], display: WeightUnit) -> Option<f64> {
    metrics
        .iter()
        .min_by_key(|m| m.date)
        .map(|m| convert(m.weight, m.unit, display))
}

/// Change between the first and latest weight in `display` units.
pub fn weight_change(metrics: &[BodyMetric], display: WeightUnit) -> Option<f64> {
    Some(current_weight(metrics, display)? - starting_weight(metrics, display)?)
}

/// Chart series in `display` units, oldest first.
pub fn weight_series(metrics: &[BodyMetric], display: WeightUnit) -> Vec<(Millis, f64)> {
    let mut points: Vec<(Millis, f64)> = metrics
        .iter()
        .map(|m| (m.date, convert(m.weight, m.unit, display)))
        .collect();
    points.sort_by_key(|p| p.0);
    points
}
