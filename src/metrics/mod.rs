pub mod resolve;
pub mod timeseries;

use crate::errors::{DashboardError, DashboardResult};
use crate::state::{
    AucHistoryPoint, AucMetrics, AucMetricsRow, CustomerGrowthPoint, CustomerMetrics,
    CustomerSegmentBreakdown, IncomeHistoryPoint, IncomeMetrics, IncomeRow, MonthlyCustomerSnapshot,
};
use crate::wire;
use timeseries::latest_pair;

/// Display order of the derived segment breakdown.
pub const SEGMENT_NAMES: [&str; 4] = ["Institutional", "Corporate", "High Net Worth", "Funds"];

/// Share of the first month's total treated as new customers, since there is
/// no earlier month to diff against.
const BOOTSTRAP_NEW_RATIO: f64 = 0.05;

/// Outstanding fees as a share of month-to-date income.
const OUTSTANDING_FEE_RATIO: f64 = 0.3;

/// Headline customer counts from the latest snapshot.
pub fn compute_customer_metrics(snapshots: &[MonthlyCustomerSnapshot]) -> DashboardResult<CustomerMetrics> {
    let (latest, previous) = latest_pair(snapshots)
        .ok_or_else(|| DashboardError::EmptyDataset("monthly customer data".into()))?;

    let total = latest.total();
    let new_customers_mtd = previous.map(|p| (total - p.total()).max(0)).unwrap_or(0);

    Ok(CustomerMetrics {
        total_customers: total,
        active_customers: latest.active_customers,
        new_customers_mtd,
        date: latest.month,
    })
}

/// Month-by-month totals with new customers diffed against the previous month.
/// Shrinking months report zero new customers, never a negative count.
pub fn compute_customer_growth_series(snapshots: &[MonthlyCustomerSnapshot]) -> Vec<CustomerGrowthPoint> {
    let mut ordered: Vec<&MonthlyCustomerSnapshot> = snapshots.iter().collect();
    ordered.sort_by_key(|s| s.month);

    let mut previous_total: Option<i64> = None;
    ordered
        .into_iter()
        .map(|s| {
            let total = s.total();
            let new_customers = match previous_total {
                Some(prev) => (total - prev).max(0),
                None => (total as f64 * BOOTSTRAP_NEW_RATIO).round() as i64,
            };
            previous_total = Some(total);
            CustomerGrowthPoint {
                date: s.month,
                total_customers: total,
                new_customers,
            }
        })
        .collect()
}

pub fn compute_segment_breakdown(
    snapshot: &MonthlyCustomerSnapshot,
) -> DashboardResult<[CustomerSegmentBreakdown; 4]> {
    let total = snapshot.total();
    if total == 0 {
        return Err(DashboardError::DivisionByZero(format!(
            "segment total is zero for {}",
            snapshot.month.format("%Y-%m")
        )));
    }

    let counts = snapshot.segment_counts();
    Ok(std::array::from_fn(|i| CustomerSegmentBreakdown {
        segment_name: SEGMENT_NAMES[i].to_string(),
        percentage: wire::percent(counts[i] as f64 / total as f64 * 100.0),
    }))
}

/// Period-over-period change in percent.
#[inline]
pub fn compute_growth_rate(latest: f64, previous: f64) -> DashboardResult<f64> {
    if previous == 0.0 {
        return Err(DashboardError::DivisionByZero("previous period value is zero".into()));
    }
    Ok((latest - previous) / previous * 100.0)
}

/// AUC totals from the latest history row. Growth needs at least two rows.
pub fn compute_auc_metrics(history: &[AucHistoryPoint]) -> DashboardResult<AucMetrics> {
    let (latest, previous) =
        latest_pair(history).ok_or_else(|| DashboardError::EmptyDataset("AUC history".into()))?;

    let growth = previous
        .map(|p| compute_growth_rate(latest.total(), p.total()))
        .transpose()?
        .map(wire::percent);

    Ok(AucMetrics {
        total_auc: wire::money(latest.total()),
        equity: wire::money(latest.equity),
        fixed_income: wire::money(latest.fixed_income),
        mutual_funds: wire::money(latest.mutual_funds),
        others: wire::money(latest.others),
        growth,
    })
}

pub fn auc_metrics_from_row(row: &AucMetricsRow) -> AucMetrics {
    AucMetrics {
        total_auc: wire::money(row.total_auc),
        equity: wire::money(row.equity),
        fixed_income: wire::money(row.fixed_income),
        mutual_funds: wire::money(row.mutual_funds),
        others: wire::money(row.others),
        growth: None,
    }
}

/// Income for the latest month; outstanding fees are a fixed share of it.
pub fn compute_income_metrics(history: &[IncomeHistoryPoint]) -> DashboardResult<IncomeMetrics> {
    let (latest, previous) =
        latest_pair(history).ok_or_else(|| DashboardError::EmptyDataset("income history".into()))?;

    let growth = previous
        .map(|p| compute_growth_rate(latest.amount, p.amount))
        .transpose()?
        .map(wire::percent);

    Ok(IncomeMetrics {
        income_mtd: wire::money(latest.amount),
        outstanding_fees: wire::money(latest.amount * OUTSTANDING_FEE_RATIO),
        growth,
    })
}

pub fn income_metrics_from_row(row: &IncomeRow) -> IncomeMetrics {
    IncomeMetrics {
        income_mtd: wire::money(row.income_mtd),
        outstanding_fees: wire::money(row.outstanding_fees),
        growth: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    fn snapshot(m: u32, counts: [i64; 4], active: i64) -> MonthlyCustomerSnapshot {
        MonthlyCustomerSnapshot {
            id: m as i64,
            month: month(m),
            institutional: counts[0],
            corporate: counts[1],
            hni: counts[2],
            funds: counts[3],
            active_customers: active,
        }
    }

    /// Snapshot whose whole total sits in the institutional bucket.
    fn total_only(m: u32, total: i64) -> MonthlyCustomerSnapshot {
        snapshot(m, [total, 0, 0, 0], 0)
    }

    fn percent_sum(breakdown: &[CustomerSegmentBreakdown]) -> f64 {
        breakdown.iter().map(|b| b.percentage.parse::<f64>().unwrap()).sum()
    }

    #[test]
    fn test_customer_metrics_from_latest() {
        let snapshots = vec![
            snapshot(2, [4500, 3100, 2800, 1850], 10_100),
            snapshot(1, [4400, 3000, 2700, 1800], 9_900),
        ];
        let m = compute_customer_metrics(&snapshots).unwrap();
        assert_eq!(m.total_customers, 12_250);
        assert_eq!(m.active_customers, 10_100);
        assert_eq!(m.new_customers_mtd, 350);
        assert_eq!(m.date, month(2));
    }

    #[test]
    fn test_customer_metrics_single_snapshot_has_no_mtd() {
        let m = compute_customer_metrics(&[snapshot(5, [10, 10, 10, 10], 30)]).unwrap();
        assert_eq!(m.total_customers, 40);
        assert_eq!(m.new_customers_mtd, 0);
    }

    #[test]
    fn test_customer_metrics_shrinking_month_clamped() {
        let m = compute_customer_metrics(&[total_only(1, 500), total_only(2, 450)]).unwrap();
        assert_eq!(m.new_customers_mtd, 0);
    }

    #[test]
    fn test_customer_metrics_empty_fails() {
        assert!(matches!(compute_customer_metrics(&[]), Err(DashboardError::EmptyDataset(_))));
    }

    #[test]
    fn test_growth_series_bootstrap_rule() {
        let series = compute_customer_growth_series(&[total_only(1, 12_450)]);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].total_customers, 12_450);
        // 12450 * 0.05 = 622.5, rounds up
        assert_eq!(series[0].new_customers, 623);
    }

    #[test]
    fn test_growth_series_decrease_clamped_to_zero() {
        let series = compute_customer_growth_series(&[total_only(1, 100), total_only(2, 80)]);
        assert_eq!(series[0].new_customers, 5);
        assert_eq!(series[1].total_customers, 80);
        assert_eq!(series[1].new_customers, 0);
    }

    #[test]
    fn test_growth_series_sorted_and_same_length() {
        let input = vec![total_only(3, 130), total_only(1, 100), total_only(2, 120)];
        let series = compute_customer_growth_series(&input);
        assert_eq!(series.len(), input.len());
        let dates: Vec<_> = series.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![month(1), month(2), month(3)]);
        assert_eq!(series[1].new_customers, 20);
        assert_eq!(series[2].new_customers, 10);
    }

    #[test]
    fn test_growth_series_empty() {
        assert!(compute_customer_growth_series(&[]).is_empty());
    }

    #[test]
    fn test_segment_breakdown_order_and_format() {
        let b = compute_segment_breakdown(&snapshot(1, [4520, 3180, 2890, 1860], 0)).unwrap();
        let names: Vec<_> = b.iter().map(|s| s.segment_name.as_str()).collect();
        assert_eq!(names, SEGMENT_NAMES);
        let pct: Vec<_> = b.iter().map(|s| s.percentage.as_str()).collect();
        assert_eq!(pct, vec!["36.3", "25.5", "23.2", "14.9"]);
    }

    #[test]
    fn test_segment_breakdown_sums_to_hundred() {
        let fixtures = [
            [4520, 3180, 2890, 1860],
            [100, 200, 300, 400],
            [1, 1, 1, 0],
            [333, 333, 333, 1],
            [5, 3, 7, 11],
        ];
        for counts in fixtures {
            let b = compute_segment_breakdown(&snapshot(1, counts, 0)).unwrap();
            let sum = percent_sum(&b);
            assert!((sum - 100.0).abs() <= 0.1 + 1e-9, "{counts:?} summed to {sum}");
        }
    }

    #[test]
    fn test_segment_breakdown_zero_total_fails() {
        let err = compute_segment_breakdown(&snapshot(1, [0, 0, 0, 0], 0)).unwrap_err();
        assert!(matches!(err, DashboardError::DivisionByZero(_)));
    }

    #[test]
    fn test_growth_rate_examples() {
        assert!((compute_growth_rate(110.0, 100.0).unwrap() - 10.0).abs() < 1e-9);
        assert!((compute_growth_rate(90.0, 100.0).unwrap() + 10.0).abs() < 1e-9);
        assert!(matches!(compute_growth_rate(5.0, 0.0), Err(DashboardError::DivisionByZero(_))));
    }

    fn auc(m: u32, equity: f64) -> AucHistoryPoint {
        AucHistoryPoint {
            date: month(m),
            equity,
            fixed_income: 35.0,
            mutual_funds: 18.0,
            others: 9.0,
        }
    }

    #[test]
    fn test_auc_metrics_latest_vs_previous() {
        // totals: 100.0 then 110.0
        let m = compute_auc_metrics(&[auc(2, 48.0), auc(1, 38.0)]).unwrap();
        assert_eq!(m.total_auc, "110.00");
        assert_eq!(m.equity, "48.00");
        assert_eq!(m.growth.as_deref(), Some("10.0"));
    }

    #[test]
    fn test_auc_metrics_single_row_has_no_growth() {
        let m = compute_auc_metrics(&[auc(1, 38.0)]).unwrap();
        assert_eq!(m.total_auc, "100.00");
        assert!(m.growth.is_none());
    }

    #[test]
    fn test_auc_metrics_zero_previous_fails() {
        let zero = AucHistoryPoint {
            date: month(1),
            equity: 0.0,
            fixed_income: 0.0,
            mutual_funds: 0.0,
            others: 0.0,
        };
        let err = compute_auc_metrics(&[zero, auc(2, 40.0)]).unwrap_err();
        assert!(matches!(err, DashboardError::DivisionByZero(_)));
    }

    #[test]
    fn test_income_metrics() {
        let history = vec![
            IncomeHistoryPoint { date: month(1), amount: 2.5 },
            IncomeHistoryPoint { date: month(2), amount: 2.75 },
        ];
        let m = compute_income_metrics(&history).unwrap();
        assert_eq!(m.income_mtd, "2.75");
        assert_eq!(m.outstanding_fees, "0.83");
        assert_eq!(m.growth.as_deref(), Some("10.0"));
    }

    #[test]
    fn test_income_metrics_decline() {
        let history = vec![
            IncomeHistoryPoint { date: month(1), amount: 2.0 },
            IncomeHistoryPoint { date: month(2), amount: 1.8 },
        ];
        assert_eq!(compute_income_metrics(&history).unwrap().growth.as_deref(), Some("-10.0"));
    }

    #[test]
    fn test_flat_rows_carry_no_growth() {
        let auc = auc_metrics_from_row(&AucMetricsRow {
            total_auc: 104.5,
            equity: 48.2,
            fixed_income: 38.1,
            mutual_funds: 10.2,
            others: 8.0,
        });
        assert_eq!(auc.total_auc, "104.50");
        assert!(auc.growth.is_none());

        let income = income_metrics_from_row(&IncomeRow { income_mtd: 2.75, outstanding_fees: 0.85 });
        assert_eq!(income.outstanding_fees, "0.85");
        assert!(income.growth.is_none());
    }
}
