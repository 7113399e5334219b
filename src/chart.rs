//! Chart projection — pure transform from a series snapshot to renderer input.

use crate::domain::price_history::PriceObservation;
use rust_decimal::prelude::ToPrimitive;

/// Renderer-ready parallel arrays, index-aligned with the snapshot order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// The rendering surface the application plugs in.
pub trait ChartRenderer {
    fn render(&self, series: &ChartSeries);
}

/// Project a snapshot into labels and magnitudes.
///
/// Pure: no mutation, no I/O. An empty snapshot projects to two empty
/// vectors — the renderer shows its "no data" state, never an error.
pub fn project(snapshot: &[PriceObservation]) -> ChartSeries {
    ChartSeries {
        labels: snapshot.iter().map(|obs| format_label(obs)).collect(),
        values: snapshot
            .iter()
            .map(|obs| obs.price.to_f64().unwrap_or(0.0))
            .collect(),
    }
}

fn format_label(obs: &PriceObservation) -> String {
    obs.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}
