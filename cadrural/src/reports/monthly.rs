//! Trailing monthly series with zero-filled buckets.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};

/// Months shown by the dashboard evolution chart.
pub const TRAILING_MONTHS: u32 = 12;

const MONTH_LABELS: [&str; 12] = ["Jan", "Fev", "Mar", "Abr", "Mai", "Jun", "Jul", "Ago", "Set", "Out", "Nov", "Dez"];

/// One calendar month of a series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket {
    /// Sortable `YYYY-MM` key.
    pub key: String,
    /// Display label, `Out/25`.
    pub label: String,
    pub first_day: NaiveDate,
}

impl MonthBucket {
    fn of(first_day: NaiveDate) -> Self {
        let label = MONTH_LABELS
            .get(first_day.month0() as usize)
            .copied()
            .unwrap_or_default();
        Self {
            key: first_day.format("%Y-%m").to_string(),
            label: format!("{label}/{:02}", first_day.year().rem_euclid(100)),
            first_day,
        }
    }
}

/// `months` contiguous buckets ending at the month of `reference`, oldest first.
pub fn month_buckets(reference: NaiveDate, months: u32) -> Vec<MonthBucket> {
    let current = first_of_month(reference);
    (0..months)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .map(MonthBucket::of)
        .collect()
}

/// First day of the oldest bucket; source counts are collected from this date on.
pub fn window_start(reference: NaiveDate, months: u32) -> NaiveDate {
    let current = first_of_month(reference);
    current
        .checked_sub_months(Months::new(months.saturating_sub(1)))
        .unwrap_or(current)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// One bucket with a count per source, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyPoint {
    pub label: String,
    pub key: String,
    pub counts: Vec<u64>,
}

/// Looks up every bucket in every source map; months absent from a source count zero.
pub fn build_monthly_series(reference: NaiveDate, months: u32, sources: &[&BTreeMap<String, u64>]) -> Vec<MonthlyPoint> {
    month_buckets(reference, months)
        .into_iter()
        .map(|bucket| MonthlyPoint {
            counts: sources
                .iter()
                .map(|source| source.get(&bucket.key).copied().unwrap_or(0))
                .collect(),
            label: bucket.label,
            key: bucket.key,
        })
        .collect()
}
