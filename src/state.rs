use crate::config::AppConfig;
use crate::errors::{DashboardError, DashboardResult};
use crate::metrics::timeseries::Dated;
use crate::regen::GrowthSeriesRegenerator;
use crate::store::MetricsStore;
use crate::wire;
use chrono::NaiveDate;
use std::sync::Arc;

// ── Shared application state ──

/// Everything a request handler needs, built once in `main` and injected.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn MetricsStore>,
    pub regenerator: GrowthSeriesRegenerator,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn MetricsStore>) -> Arc<Self> {
        let regenerator = GrowthSeriesRegenerator::from_config(&config);
        Arc::new(Self { config, store, regenerator })
    }
}

// ── Customer data ──

/// One month of raw segment counts. Ground truth for every derived customer metric.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCustomerSnapshot {
    pub id: i64,
    #[serde(with = "wire::month")]
    pub month: NaiveDate,
    pub institutional: i64,
    pub corporate: i64,
    pub hni: i64,
    pub funds: i64,
    pub active_customers: i64,
}

impl MonthlyCustomerSnapshot {
    /// Saturates instead of wrapping; stored rows are validated to fit.
    #[inline]
    pub fn total(&self) -> i64 {
        self.segment_counts().into_iter().fold(0i64, i64::saturating_add)
    }

    #[inline]
    pub fn segment_counts(&self) -> [i64; 4] {
        [self.institutional, self.corporate, self.hni, self.funds]
    }
}

/// Sum of segment counts, rejecting totals that do not fit in an `i64`.
fn checked_segment_total(counts: [i64; 4]) -> DashboardResult<i64> {
    counts
        .iter()
        .try_fold(0i64, |acc, &c| acc.checked_add(c))
        .ok_or_else(|| DashboardError::Validation("segment counts overflow the customer total".into()))
}

/// Insert payload for a monthly snapshot.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMonthlySnapshot {
    #[serde(with = "wire::month")]
    pub month: NaiveDate,
    pub institutional: i64,
    pub corporate: i64,
    pub hni: i64,
    pub funds: i64,
    pub active_customers: i64,
}

impl NewMonthlySnapshot {
    pub fn validate(&self) -> DashboardResult<()> {
        let counts = [
            ("institutional", self.institutional),
            ("corporate", self.corporate),
            ("hni", self.hni),
            ("funds", self.funds),
            ("activeCustomers", self.active_customers),
        ];
        if let Some((field, value)) = counts.iter().find(|(_, v)| *v < 0) {
            return Err(DashboardError::Validation(format!("{field} must not be negative (got {value})")));
        }
        let total = checked_segment_total([self.institutional, self.corporate, self.hni, self.funds])?;
        if self.active_customers > total {
            return Err(DashboardError::Validation(format!(
                "activeCustomers ({}) exceeds segment total ({total})",
                self.active_customers
            )));
        }
        Ok(())
    }

    pub fn with_id(self, id: i64) -> MonthlyCustomerSnapshot {
        MonthlyCustomerSnapshot {
            id,
            month: self.month,
            institutional: self.institutional,
            corporate: self.corporate,
            hni: self.hni,
            funds: self.funds,
            active_customers: self.active_customers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerMetrics {
    pub total_customers: i64,
    pub active_customers: i64,
    #[serde(rename = "newCustomersMTD")]
    pub new_customers_mtd: i64,
    #[serde(with = "wire::month")]
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerGrowthPoint {
    #[serde(with = "wire::month")]
    pub date: NaiveDate,
    pub total_customers: i64,
    pub new_customers: i64,
}

/// One month of customer lifecycle statistics, recorded as reported.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerHistory {
    pub id: i64,
    #[serde(with = "wire::month")]
    pub date: NaiveDate,
    pub total_customers: i64,
    pub new_customers: i64,
    pub churned_customers: i64,
    #[serde(serialize_with = "wire::percent_str::serialize")]
    pub retention_rate: f64,
    #[serde(serialize_with = "wire::money_str::serialize")]
    pub acquisition_cost: f64,
    #[serde(serialize_with = "wire::money_str::serialize")]
    pub lifetime_value: f64,
    pub institutional: i64,
    pub corporate: i64,
    pub hni: i64,
    pub funds: i64,
    pub total: i64,
    #[serde(rename = "new")]
    pub new_count: i64,
    pub active: i64,
}

/// Insert payload for a customer history record.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomerHistory {
    #[serde(with = "wire::month")]
    pub date: NaiveDate,
    pub total_customers: i64,
    pub new_customers: i64,
    pub churned_customers: i64,
    pub retention_rate: f64,
    pub acquisition_cost: f64,
    pub lifetime_value: f64,
    pub institutional: i64,
    pub corporate: i64,
    pub hni: i64,
    pub funds: i64,
    pub total: i64,
    #[serde(rename = "new")]
    pub new_count: i64,
    pub active: i64,
}

impl NewCustomerHistory {
    pub fn validate(&self) -> DashboardResult<()> {
        let counts = [
            ("totalCustomers", self.total_customers),
            ("newCustomers", self.new_customers),
            ("churnedCustomers", self.churned_customers),
            ("institutional", self.institutional),
            ("corporate", self.corporate),
            ("hni", self.hni),
            ("funds", self.funds),
            ("total", self.total),
            ("new", self.new_count),
            ("active", self.active),
        ];
        if let Some((field, value)) = counts.iter().find(|(_, v)| *v < 0) {
            return Err(DashboardError::Validation(format!("{field} must not be negative (got {value})")));
        }
        checked_segment_total([self.institutional, self.corporate, self.hni, self.funds])?;
        if !(0.0..=100.0).contains(&self.retention_rate) {
            return Err(DashboardError::Validation(format!(
                "retentionRate must be between 0 and 100 (got {})",
                self.retention_rate
            )));
        }
        let amounts = [("acquisitionCost", self.acquisition_cost), ("lifetimeValue", self.lifetime_value)];
        if let Some((field, value)) = amounts.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(DashboardError::Validation(format!("{field} must be a non-negative amount (got {value})")));
        }
        if self.active > self.total {
            return Err(DashboardError::Validation(format!(
                "active ({}) exceeds total ({})",
                self.active, self.total
            )));
        }
        Ok(())
    }

    pub fn with_id(self, id: i64) -> CustomerHistory {
        CustomerHistory {
            id,
            date: self.date,
            total_customers: self.total_customers,
            new_customers: self.new_customers,
            churned_customers: self.churned_customers,
            retention_rate: self.retention_rate,
            acquisition_cost: self.acquisition_cost,
            lifetime_value: self.lifetime_value,
            institutional: self.institutional,
            corporate: self.corporate,
            hni: self.hni,
            funds: self.funds,
            total: self.total,
            new_count: self.new_count,
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSegmentBreakdown {
    pub segment_name: String,
    pub percentage: String,
}

/// Flat, independently seeded segment share.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentShare {
    pub segment_name: String,
    pub percentage: f64,
}

// ── Assets under custody ──

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AucHistoryPoint {
    #[serde(with = "wire::month")]
    pub date: NaiveDate,
    #[serde(serialize_with = "wire::money_str::serialize")]
    pub equity: f64,
    #[serde(serialize_with = "wire::money_str::serialize")]
    pub fixed_income: f64,
    #[serde(serialize_with = "wire::money_str::serialize")]
    pub mutual_funds: f64,
    #[serde(serialize_with = "wire::money_str::serialize")]
    pub others: f64,
}

impl AucHistoryPoint {
    #[inline]
    pub fn total(&self) -> f64 {
        self.equity + self.fixed_income + self.mutual_funds + self.others
    }
}

/// Single-row current AUC table.
#[derive(Debug, Clone, PartialEq)]
pub struct AucMetricsRow {
    pub total_auc: f64,
    pub equity: f64,
    pub fixed_income: f64,
    pub mutual_funds: f64,
    pub others: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AucMetrics {
    pub total_auc: String,
    pub equity: String,
    pub fixed_income: String,
    pub mutual_funds: String,
    pub others: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth: Option<String>,
}

// ── Income ──

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IncomeHistoryPoint {
    #[serde(with = "wire::month")]
    pub date: NaiveDate,
    #[serde(serialize_with = "wire::money_str::serialize")]
    pub amount: f64,
}

/// Single-row current income table.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeRow {
    pub income_mtd: f64,
    pub outstanding_fees: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeMetrics {
    #[serde(rename = "incomeMTD")]
    pub income_mtd: String,
    pub outstanding_fees: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeByService {
    pub service_name: String,
    #[serde(serialize_with = "wire::money_str::serialize")]
    pub amount: f64,
}

// ── Trading and clients ──

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TradingVolumePoint {
    #[serde(with = "wire::month")]
    pub date: NaiveDate,
    #[serde(serialize_with = "wire::money_str::serialize")]
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub name: String,
    pub customer_type: String,
    #[serde(serialize_with = "wire::money_str::serialize")]
    pub revenue: f64,
    #[serde(serialize_with = "wire::money_str::serialize")]
    pub assets: f64,
    #[serde(serialize_with = "wire::percent_str::serialize")]
    pub change_percent: f64,
}

// ── Date access for time-series utilities ──

impl Dated for CustomerHistory {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for MonthlyCustomerSnapshot {
    fn date(&self) -> NaiveDate {
        self.month
    }
}

impl Dated for CustomerGrowthPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for AucHistoryPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for IncomeHistoryPoint {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for TradingVolumePoint {
    fn date(&self) -> NaiveDate {
        self.date
    }
}
