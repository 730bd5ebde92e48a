//! Window statistics for the insight prompt and job result.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::telemetry::TelemetryRow;

/// Aggregates over one product's telemetry window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: usize,
    pub price_min: f64,
    pub price_max: f64,
    pub price_avg: f64,
    pub buybox_min: f64,
    pub buybox_max: f64,
    pub buybox_avg: f64,
    pub rank_best: Option<i64>,
    pub rank_worst: Option<i64>,
    pub rank_latest: Option<i64>,
    pub rating_latest: Option<f64>,
    pub rating_count_latest: Option<i64>,
    pub seller_count_latest: Option<i64>,
}

/// Summarize an ascending-by-date window. `None` for an empty window.
pub fn summarize(rows: &[TelemetryRow]) -> Option<WindowSummary> {
    let first = rows.first()?;
    let last = rows.last()?;

    let n = rows.len() as f64;
    let mut price_min = f64::INFINITY;
    let mut price_max = f64::NEG_INFINITY;
    let mut price_sum = 0.0;
    let mut buybox_min = f64::INFINITY;
    let mut buybox_max = f64::NEG_INFINITY;
    let mut buybox_sum = 0.0;
    let mut rank_best = None;
    let mut rank_worst = None;

    for row in rows {
        price_min = price_min.min(row.price);
        price_max = price_max.max(row.price);
        price_sum += row.price;
        buybox_min = buybox_min.min(row.buybox_price);
        buybox_max = buybox_max.max(row.buybox_price);
        buybox_sum += row.buybox_price;
        if let Some(rank) = row.rank {
            rank_best = Some(rank_best.map_or(rank, |b: i64| b.min(rank)));
            rank_worst = Some(rank_worst.map_or(rank, |w: i64| w.max(rank)));
        }
    }

    Some(WindowSummary {
        from: first.date,
        to: last.date,
        days: rows.len(),
        price_min,
        price_max,
        price_avg: price_sum / n,
        buybox_min,
        buybox_max,
        buybox_avg: buybox_sum / n,
        rank_best,
        rank_worst,
        rank_latest: last.rank,
        rating_latest: last.rating,
        rating_count_latest: last.rating_count,
        seller_count_latest: last.seller_count,
    })
}
