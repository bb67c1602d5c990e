//! Demo dataset loaded on first start.

use crate::errors::DashboardResult;
use crate::metrics::timeseries::months_before;
use crate::regen::GrowthSeriesGenerator;
use crate::state::{
    AucHistoryPoint, AucMetricsRow, CustomerMetrics, IncomeByService, IncomeHistoryPoint, IncomeRow, SegmentShare,
    TopCustomer, TradingVolumePoint,
};
use crate::store::{MetricsStore, SeedData};
use chrono::NaiveDate;
use rand::Rng;

const HISTORY_MONTHS: u32 = 12;

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Offsets oldest first: 11, 10, ..., 0.
fn offsets() -> impl Iterator<Item = u32> {
    (0..HISTORY_MONTHS).rev()
}

fn trading_volume(end_month: NaiveDate) -> Vec<TradingVolumePoint> {
    offsets()
        .map(|i| {
            let x = i as f64;
            TradingVolumePoint {
                date: months_before(end_month, i),
                volume: round_to(22.0 + x * 0.5 + x.sin() * 2.0, 1),
            }
        })
        .collect()
}

fn auc_history(end_month: NaiveDate) -> Vec<AucHistoryPoint> {
    offsets()
        .map(|i| {
            let x = i as f64;
            AucHistoryPoint {
                date: months_before(end_month, i),
                equity: round_to(42.0 + x * 0.4, 1),
                fixed_income: round_to(35.0 + x * 0.25, 1),
                mutual_funds: round_to(18.0 + x * 0.15, 1),
                others: round_to(9.0 + x * 0.05, 1),
            }
        })
        .collect()
}

fn income_history(end_month: NaiveDate) -> Vec<IncomeHistoryPoint> {
    offsets()
        .map(|i| {
            let x = i as f64;
            IncomeHistoryPoint {
                date: months_before(end_month, i),
                amount: round_to(2.2 + x * 0.05 + (x / 2.0).sin() * 0.3, 2),
            }
        })
        .collect()
}

fn segment(name: &str, percentage: f64) -> SegmentShare {
    SegmentShare { segment_name: name.to_string(), percentage }
}

fn service(name: &str, amount: f64) -> IncomeByService {
    IncomeByService { service_name: name.to_string(), amount }
}

fn top_customer(name: &str, customer_type: &str, revenue: f64, assets: f64, change_percent: f64) -> TopCustomer {
    TopCustomer {
        name: name.to_string(),
        customer_type: customer_type.to_string(),
        revenue,
        assets,
        change_percent,
    }
}

/// Build the demo dataset ending at `end_month`. Monthly snapshots are left
/// empty, so customer endpoints serve the flat tier until snapshots arrive.
pub fn demo_seed<R: Rng>(end_month: NaiveDate, generator: &GrowthSeriesGenerator, rng: &mut R) -> SeedData {
    SeedData {
        monthly_snapshots: Vec::new(),
        customer_metrics: Some(CustomerMetrics {
            total_customers: 12450,
            active_customers: 10230,
            new_customers_mtd: 175,
            date: end_month,
        }),
        customer_growth: generator.generate(end_month, rng),
        customer_segments: vec![
            segment("Institutional", 45.0),
            segment("Pension Funds", 25.0),
            segment("High Net Worth", 20.0),
            segment("Retail", 10.0),
        ],
        trading_volume: trading_volume(end_month),
        auc_history: auc_history(end_month),
        auc_metrics: Some(AucMetricsRow {
            total_auc: 104.5,
            equity: 48.2,
            fixed_income: 38.1,
            mutual_funds: 10.2,
            others: 8.0,
        }),
        income: Some(IncomeRow { income_mtd: 2.75, outstanding_fees: 0.85 }),
        income_history: income_history(end_month),
        income_by_service: vec![
            service("Custody Fees", 12.4),
            service("Transaction Fees", 8.6),
            service("Value Added Services", 5.2),
            service("Reporting & Analytics", 3.1),
        ],
        top_customers: vec![
            top_customer("GlobalTech Pension", "Pension Fund", 2.48, 12.5, 8.2),
            top_customer("Eastbrook Investments", "Asset Manager", 1.95, 10.3, 6.4),
            top_customer("Atlantic Insurance Ltd", "Insurance", 1.62, 8.7, 5.3),
            top_customer("Summit Wealth Partners", "HNW Family Office", 1.24, 6.8, 4.9),
            top_customer("Pacific Financial Group", "Institutional", 1.05, 5.9, 3.7),
        ],
    }
}

/// Load the demo dataset unless the store already holds one. Returns whether
/// anything was written.
pub fn seed_if_empty<R: Rng>(
    store: &dyn MetricsStore,
    end_month: NaiveDate,
    generator: &GrowthSeriesGenerator,
    rng: &mut R,
) -> DashboardResult<bool> {
    if store.is_seeded()? {
        tracing::info!("{} store already seeded", store.backend_name());
        return Ok(false);
    }
    tracing::info!("seeding {} store with demo data", store.backend_name());
    store.seed(&demo_seed(end_month, generator, rng))?;
    Ok(true)
}
