pub mod generator;

use crate::config::AppConfig;
use crate::errors::{DashboardError, DashboardResult};
use crate::state::CustomerGrowthPoint;
use crate::store::MetricsStore;
use chrono::NaiveDate;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use std::sync::{Mutex, MutexGuard};

pub use generator::{GrowthSeriesGenerator, RegenerationPlan};

/// Outcome of a regeneration or a dry run, as returned to the caller.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerationReport {
    pub message: String,
    pub verification_result: String,
    pub months: usize,
    pub issues: usize,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<Vec<CustomerGrowthPoint>>,
}

/// RNG for synthetic series: fixed seed when configured, entropy otherwise.
pub fn seeded_rng(seed: Option<u64>) -> Pcg64Mcg {
    match seed {
        Some(s) => Pcg64Mcg::seed_from_u64(s),
        None => Pcg64Mcg::from_entropy(),
    }
}

/// Count consecutive months whose total does not equal the previous
/// month's total plus its new customers.
pub fn verify_running_totals(points: &[CustomerGrowthPoint]) -> usize {
    let mut ordered: Vec<&CustomerGrowthPoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.date);
    ordered
        .windows(2)
        .filter(|w| w[1].total_customers != w[0].total_customers + w[0].new_customers)
        .count()
}

pub fn verification_summary(issues: usize) -> String {
    if issues == 0 {
        "perfect".to_string()
    } else {
        format!("{issues} issues found")
    }
}

/// Destructive rebuild of the stored customer-growth series.
///
/// The RNG mutex doubles as the regeneration lock: two runs never overlap,
/// so one run's delete/insert cannot interleave with another's.
pub struct GrowthSeriesRegenerator {
    generator: GrowthSeriesGenerator,
    rng: Mutex<Pcg64Mcg>,
    strict: bool,
}

impl GrowthSeriesRegenerator {
    pub fn new(generator: GrowthSeriesGenerator, rng: Pcg64Mcg, strict: bool) -> Self {
        Self {
            generator,
            rng: Mutex::new(rng),
            strict,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            GrowthSeriesGenerator::new(RegenerationPlan::from_config(cfg)),
            seeded_rng(cfg.regen_seed),
            cfg.regen_strict,
        )
    }

    pub fn generator(&self) -> &GrowthSeriesGenerator {
        &self.generator
    }

    fn lock(&self) -> DashboardResult<MutexGuard<'_, Pcg64Mcg>> {
        self.rng
            .lock()
            .map_err(|e| DashboardError::Database(format!("regeneration lock poisoned: {e}")))
    }

    /// Generate, replace the stored series atomically, then re-read and verify.
    pub fn regenerate(&self, store: &dyn MetricsStore, end_month: NaiveDate) -> DashboardResult<RegenerationReport> {
        let mut rng = self.lock()?;
        tracing::info!(
            "regenerating customer growth: {} months ending {end_month}",
            self.generator.plan().months
        );

        let points = self.generator.generate(end_month, &mut *rng);
        store.replace_customer_growth(&points)?;

        let persisted = store.customer_growth()?;
        let issues = verify_running_totals(&persisted);
        tracing::info!(
            "customer growth regenerated: {} rows, verification {}",
            persisted.len(),
            verification_summary(issues)
        );

        self.conclude(
            "Customer growth data regenerated successfully with data integrity",
            persisted.len(),
            issues,
            None,
        )
    }

    /// Generate and verify without touching the store.
    pub fn preview(&self, end_month: NaiveDate) -> DashboardResult<RegenerationReport> {
        let mut rng = self.lock()?;
        let points = self.generator.generate(end_month, &mut *rng);
        let issues = verify_running_totals(&points);
        tracing::info!("customer growth dry run: {} rows", points.len());
        let months = points.len();
        self.conclude("Dry run: customer growth data not modified", months, issues, Some(points))
    }

    fn conclude(
        &self,
        message: &str,
        months: usize,
        issues: usize,
        series: Option<Vec<CustomerGrowthPoint>>,
    ) -> DashboardResult<RegenerationReport> {
        if issues > 0 {
            tracing::warn!("customer growth verification: {issues} issues found");
            if self.strict {
                return Err(DashboardError::RegenerationIntegrity { issues });
            }
        }
        Ok(RegenerationReport {
            message: message.to_string(),
            verification_result: verification_summary(issues),
            months,
            issues,
            dry_run: series.is_some(),
            series,
        })
    }
}
