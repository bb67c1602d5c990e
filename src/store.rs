//! Storage seam. The service talks to a `MetricsStore`; which implementation
//! backs it is decided once at startup.

use crate::errors::{DashboardError, DashboardResult};
use crate::metrics::timeseries::sort_ascending;
use crate::state::{
    AucHistoryPoint, AucMetricsRow, CustomerGrowthPoint, CustomerHistory, CustomerMetrics, IncomeByService,
    IncomeHistoryPoint, IncomeRow, MonthlyCustomerSnapshot, NewCustomerHistory, NewMonthlySnapshot,
    SegmentShare, TopCustomer, TradingVolumePoint,
};
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Rows inserted together by `MetricsStore::seed`.
#[derive(Debug, Clone, Default)]
pub struct SeedData {
    pub monthly_snapshots: Vec<NewMonthlySnapshot>,
    pub customer_metrics: Option<CustomerMetrics>,
    pub customer_growth: Vec<CustomerGrowthPoint>,
    pub customer_segments: Vec<SegmentShare>,
    pub trading_volume: Vec<TradingVolumePoint>,
    pub auc_history: Vec<AucHistoryPoint>,
    pub auc_metrics: Option<AucMetricsRow>,
    pub income: Option<IncomeRow>,
    pub income_history: Vec<IncomeHistoryPoint>,
    pub income_by_service: Vec<IncomeByService>,
    pub top_customers: Vec<TopCustomer>,
}

/// Read/write access to raw facts and flat aggregate tables.
/// Time-series reads return rows ascending by date.
/// Send + Sync required for sharing across request handlers.
pub trait MetricsStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    fn monthly_snapshots(&self) -> DashboardResult<Vec<MonthlyCustomerSnapshot>>;
    /// Validates the snapshot before storing it.
    fn insert_monthly_snapshot(&self, snapshot: NewMonthlySnapshot) -> DashboardResult<MonthlyCustomerSnapshot>;

    fn customer_history(&self) -> DashboardResult<Vec<CustomerHistory>>;
    /// Validates the record before storing it.
    fn insert_customer_history(&self, record: NewCustomerHistory) -> DashboardResult<CustomerHistory>;

    /// First row of the flat customer metrics table.
    fn customer_metrics_row(&self) -> DashboardResult<Option<CustomerMetrics>>;

    fn customer_growth(&self) -> DashboardResult<Vec<CustomerGrowthPoint>>;
    /// Delete every stored growth point and insert `points`, all or nothing.
    /// Dates must be unique.
    fn replace_customer_growth(&self, points: &[CustomerGrowthPoint]) -> DashboardResult<()>;

    fn customer_segments(&self) -> DashboardResult<Vec<SegmentShare>>;

    fn auc_history(&self) -> DashboardResult<Vec<AucHistoryPoint>>;
    fn auc_metrics_row(&self) -> DashboardResult<Option<AucMetricsRow>>;

    fn income_history(&self) -> DashboardResult<Vec<IncomeHistoryPoint>>;
    fn income_row(&self) -> DashboardResult<Option<IncomeRow>>;

    fn trading_volume(&self) -> DashboardResult<Vec<TradingVolumePoint>>;
    fn income_by_service(&self) -> DashboardResult<Vec<IncomeByService>>;
    fn top_customers(&self) -> DashboardResult<Vec<TopCustomer>>;

    /// Whether demo data has already been loaded.
    fn is_seeded(&self) -> DashboardResult<bool>;
    /// Insert every row in `data` in one atomic step.
    fn seed(&self, data: &SeedData) -> DashboardResult<()>;
}

pub(crate) fn duplicate_month_error(month: chrono::NaiveDate) -> DashboardError {
    DashboardError::Validation(format!("data for {} already exists", month.format("%Y-%m")))
}

// ── In-memory implementation ──

#[derive(Debug, Default)]
struct Tables {
    next_snapshot_id: i64,
    monthly_snapshots: Vec<MonthlyCustomerSnapshot>,
    next_history_id: i64,
    customer_history: Vec<CustomerHistory>,
    customer_metrics: Vec<CustomerMetrics>,
    customer_growth: Vec<CustomerGrowthPoint>,
    customer_segments: Vec<SegmentShare>,
    trading_volume: Vec<TradingVolumePoint>,
    auc_history: Vec<AucHistoryPoint>,
    auc_metrics: Vec<AucMetricsRow>,
    income: Vec<IncomeRow>,
    income_history: Vec<IncomeHistoryPoint>,
    income_by_service: Vec<IncomeByService>,
    top_customers: Vec<TopCustomer>,
}

impl Tables {
    fn push_snapshot(&mut self, snapshot: NewMonthlySnapshot) -> DashboardResult<MonthlyCustomerSnapshot> {
        snapshot.validate()?;
        if self.monthly_snapshots.iter().any(|s| s.month == snapshot.month) {
            return Err(duplicate_month_error(snapshot.month));
        }
        self.next_snapshot_id += 1;
        let row = snapshot.with_id(self.next_snapshot_id);
        self.monthly_snapshots.push(row.clone());
        Ok(row)
    }
}

/// Process-local store. Every table sits behind one lock, so multi-table
/// writes are atomic with respect to readers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> DashboardResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| DashboardError::Database(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> DashboardResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| DashboardError::Database(format!("lock poisoned: {e}")))
    }
}

fn sorted<T: Clone + crate::metrics::timeseries::Dated>(rows: &[T]) -> Vec<T> {
    let mut out = rows.to_vec();
    sort_ascending(&mut out);
    out
}

impl MetricsStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn monthly_snapshots(&self) -> DashboardResult<Vec<MonthlyCustomerSnapshot>> {
        Ok(sorted(&self.read()?.monthly_snapshots))
    }

    fn insert_monthly_snapshot(&self, snapshot: NewMonthlySnapshot) -> DashboardResult<MonthlyCustomerSnapshot> {
        self.write()?.push_snapshot(snapshot)
    }

    fn customer_history(&self) -> DashboardResult<Vec<CustomerHistory>> {
        Ok(sorted(&self.read()?.customer_history))
    }

    fn insert_customer_history(&self, record: NewCustomerHistory) -> DashboardResult<CustomerHistory> {
        record.validate()?;
        let mut t = self.write()?;
        t.next_history_id += 1;
        let row = record.with_id(t.next_history_id);
        t.customer_history.push(row.clone());
        Ok(row)
    }

    fn customer_metrics_row(&self) -> DashboardResult<Option<CustomerMetrics>> {
        Ok(self.read()?.customer_metrics.first().cloned())
    }

    fn customer_growth(&self) -> DashboardResult<Vec<CustomerGrowthPoint>> {
        Ok(sorted(&self.read()?.customer_growth))
    }

    fn replace_customer_growth(&self, points: &[CustomerGrowthPoint]) -> DashboardResult<()> {
        let mut seen = HashSet::with_capacity(points.len());
        if let Some(dup) = points.iter().find(|p| !seen.insert(p.date)) {
            return Err(duplicate_month_error(dup.date));
        }
        self.write()?.customer_growth = points.to_vec();
        Ok(())
    }

    fn customer_segments(&self) -> DashboardResult<Vec<SegmentShare>> {
        Ok(self.read()?.customer_segments.clone())
    }

    fn auc_history(&self) -> DashboardResult<Vec<AucHistoryPoint>> {
        Ok(sorted(&self.read()?.auc_history))
    }

    fn auc_metrics_row(&self) -> DashboardResult<Option<AucMetricsRow>> {
        Ok(self.read()?.auc_metrics.first().cloned())
    }

    fn income_history(&self) -> DashboardResult<Vec<IncomeHistoryPoint>> {
        Ok(sorted(&self.read()?.income_history))
    }

    fn income_row(&self) -> DashboardResult<Option<IncomeRow>> {
        Ok(self.read()?.income.first().cloned())
    }

    fn trading_volume(&self) -> DashboardResult<Vec<TradingVolumePoint>> {
        Ok(sorted(&self.read()?.trading_volume))
    }

    fn income_by_service(&self) -> DashboardResult<Vec<IncomeByService>> {
        Ok(self.read()?.income_by_service.clone())
    }

    fn top_customers(&self) -> DashboardResult<Vec<TopCustomer>> {
        Ok(self.read()?.top_customers.clone())
    }

    fn is_seeded(&self) -> DashboardResult<bool> {
        Ok(!self.read()?.customer_metrics.is_empty())
    }

    fn seed(&self, data: &SeedData) -> DashboardResult<()> {
        let mut t = self.write()?;

        // Check every snapshot up front so a rejected row changes nothing
        for snapshot in &data.monthly_snapshots {
            snapshot.validate()?;
        }
        let mut months: HashSet<_> = t.monthly_snapshots.iter().map(|s| s.month).collect();
        if let Some(dup) = data.monthly_snapshots.iter().find(|s| !months.insert(s.month)) {
            return Err(duplicate_month_error(dup.month));
        }
        let mut dates: HashSet<_> = t.customer_growth.iter().map(|p| p.date).collect();
        if let Some(dup) = data.customer_growth.iter().find(|p| !dates.insert(p.date)) {
            return Err(duplicate_month_error(dup.date));
        }

        for snapshot in &data.monthly_snapshots {
            t.push_snapshot(snapshot.clone())?;
        }
        t.customer_growth.extend_from_slice(&data.customer_growth);
        t.customer_metrics.extend(data.customer_metrics.clone());
        t.customer_segments.extend_from_slice(&data.customer_segments);
        t.trading_volume.extend_from_slice(&data.trading_volume);
        t.auc_history.extend_from_slice(&data.auc_history);
        t.auc_metrics.extend(data.auc_metrics.clone());
        t.income.extend(data.income.clone());
        t.income_history.extend_from_slice(&data.income_history);
        t.income_by_service.extend_from_slice(&data.income_by_service);
        t.top_customers.extend_from_slice(&data.top_customers);
        Ok(())
    }
}
