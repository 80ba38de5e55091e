use crate::models::{HistorySample, MetricKind};

/// Least-squares line `outcome = slope * distance + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, distance_m: f64) -> f64 {
        self.slope * distance_m + self.intercept
    }
}

/// Ordinary least squares over every sample.
///
/// Returns `None` until the history holds two distinct distances, since no line
/// is determined before that.
pub fn fit(history: &[HistorySample]) -> Option<LinearFit> {
    let first = history.first()?;
    if history.iter().all(|sample| sample.distance_m == first.distance_m) {
        return None;
    }

    let n = history.len() as f64;
    let mean_x = history.iter().map(|s| s.distance_m).sum::<f64>() / n;
    let mean_y = history.iter().map(|s| s.outcome).sum::<f64>() / n;

    let (covariance, variance) = history.iter().fold((0.0, 0.0), |(cov, var), s| {
        let dx = s.distance_m - mean_x;
        (cov + dx * (s.outcome - mean_y), var + dx * dx)
    });
    if variance <= 0.0 {
        return None;
    }

    let slope = covariance / variance;
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}

pub fn predict(history: &[HistorySample], query_distance_m: f64) -> Option<f64> {
    fit(history).map(|line| line.at(query_distance_m))
}

/// Per-session sample series. The engine reads these; only the owner appends.
#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    pub duration: Vec<HistorySample>,
    pub ascent: Vec<HistorySample>,
}

impl SessionHistory {
    pub fn samples(&self, kind: MetricKind) -> &[HistorySample] {
        match kind {
            MetricKind::Duration => &self.duration,
            MetricKind::Ascent => &self.ascent,
        }
    }

    pub fn append(&mut self, kind: MetricKind, sample: HistorySample) {
        match kind {
            MetricKind::Duration => self.duration.push(sample),
            MetricKind::Ascent => self.ascent.push(sample),
        }
    }

    pub fn predict(&self, kind: MetricKind, query_distance_m: f64) -> Option<f64> {
        predict(self.samples(kind), query_distance_m)
    }
}
