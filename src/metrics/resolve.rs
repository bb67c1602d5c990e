/// Two-tier reads: derive from the granular table when it has rows,
/// otherwise serve the flat aggregate table. The two are never merged.
use super::{
    auc_metrics_from_row, compute_auc_metrics, compute_customer_growth_series, compute_customer_metrics,
    compute_income_metrics, compute_segment_breakdown, income_metrics_from_row,
};
use crate::errors::{DashboardError, DashboardResult};
use crate::state::{AucMetrics, CustomerGrowthPoint, CustomerMetrics, CustomerSegmentBreakdown, IncomeMetrics};
use crate::store::MetricsStore;
use crate::wire;

pub fn customer_metrics(store: &dyn MetricsStore) -> DashboardResult<CustomerMetrics> {
    let snapshots = store.monthly_snapshots()?;
    if !snapshots.is_empty() {
        tracing::debug!("customer metrics derived from {} snapshots", snapshots.len());
        return compute_customer_metrics(&snapshots);
    }
    store
        .customer_metrics_row()?
        .ok_or_else(|| DashboardError::EmptyDataset("customer metrics".into()))
}

pub fn customer_growth(store: &dyn MetricsStore) -> DashboardResult<Vec<CustomerGrowthPoint>> {
    let snapshots = store.monthly_snapshots()?;
    if !snapshots.is_empty() {
        tracing::debug!("customer growth derived from {} snapshots", snapshots.len());
        return Ok(compute_customer_growth_series(&snapshots));
    }
    let stored = store.customer_growth()?;
    if stored.is_empty() {
        return Err(DashboardError::EmptyDataset("customer growth".into()));
    }
    Ok(stored)
}

pub fn customer_segments(store: &dyn MetricsStore) -> DashboardResult<Vec<CustomerSegmentBreakdown>> {
    let snapshots = store.monthly_snapshots()?;
    if let Some(latest) = snapshots.iter().max_by_key(|s| s.month) {
        tracing::debug!("customer segments derived from {}", latest.month);
        return Ok(compute_segment_breakdown(latest)?.to_vec());
    }
    let flat = store.customer_segments()?;
    if flat.is_empty() {
        return Err(DashboardError::EmptyDataset("customer segments".into()));
    }
    Ok(flat
        .into_iter()
        .map(|s| CustomerSegmentBreakdown {
            segment_name: s.segment_name,
            percentage: wire::percent(s.percentage),
        })
        .collect())
}

pub fn auc_metrics(store: &dyn MetricsStore) -> DashboardResult<AucMetrics> {
    let history = store.auc_history()?;
    if !history.is_empty() {
        return compute_auc_metrics(&history);
    }
    store
        .auc_metrics_row()?
        .map(|row| auc_metrics_from_row(&row))
        .ok_or_else(|| DashboardError::EmptyDataset("AUC metrics".into()))
}

pub fn income(store: &dyn MetricsStore) -> DashboardResult<IncomeMetrics> {
    let history = store.income_history()?;
    if !history.is_empty() {
        return compute_income_metrics(&history);
    }
    store
        .income_row()?
        .map(|row| income_metrics_from_row(&row))
        .ok_or_else(|| DashboardError::EmptyDataset("income".into()))
}
