use crate::config::AppConfig;
use crate::metrics::timeseries::months_before;
use crate::state::CustomerGrowthPoint;
use chrono::NaiveDate;
use rand::Rng;

/// Shape of a synthetic customer-growth series. Month offsets count
/// backwards from the end month, so offset 0 is the newest month.
#[derive(Debug, Clone, PartialEq)]
pub struct RegenerationPlan {
    pub months: u32,
    pub base_total: i64,
    /// New customers recorded for the oldest month.
    pub first_month_new: i64,
    /// Lower bound for every other month.
    pub floor: i64,
    pub seasonal_every: u32,
    pub seasonal_spike: f64,
    /// Exclusive upper bound of the uniform noise term. Zero disables noise.
    pub noise_max: u32,
    /// (offset, extra customers) one-off market events.
    pub market_events: Vec<(u32, f64)>,
    pub trend_step_months: u32,
    pub trend_increment: f64,
}

impl Default for RegenerationPlan {
    fn default() -> Self {
        Self {
            months: 30,
            base_total: 8000,
            first_month_new: 400,
            floor: 30,
            seasonal_every: 3,
            seasonal_spike: 350.0,
            noise_max: 100,
            market_events: vec![(15, 500.0), (8, 300.0)],
            trend_step_months: 6,
            trend_increment: 50.0,
        }
    }
}

impl RegenerationPlan {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            months: cfg.regen_months,
            base_total: cfg.regen_base_total,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct GrowthSeriesGenerator {
    plan: RegenerationPlan,
}

impl GrowthSeriesGenerator {
    pub fn new(plan: RegenerationPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &RegenerationPlan {
        &self.plan
    }

    /// New customers for the month `offset` months before the end month.
    pub fn new_customers_at<R: Rng>(&self, offset: u32, rng: &mut R) -> i64 {
        let p = &self.plan;
        if offset + 1 >= p.months {
            return p.first_month_new;
        }

        let oscillation = 80.0 + (offset as f64 / 2.0).sin() * 60.0;
        let seasonal = if p.seasonal_every > 0 && offset % p.seasonal_every == 0 {
            p.seasonal_spike
        } else {
            0.0
        };
        let noise = if p.noise_max > 0 {
            rng.gen_range(0..p.noise_max) as f64
        } else {
            0.0
        };
        let market_event: f64 = p
            .market_events
            .iter()
            .filter(|(at, _)| *at == offset)
            .map(|(_, extra)| extra)
            .sum();
        let elapsed = p.months - 1 - offset;
        let trend = if p.trend_step_months > 0 {
            (elapsed / p.trend_step_months) as f64 * p.trend_increment
        } else {
            0.0
        };

        ((oscillation + seasonal + noise + market_event + trend).floor() as i64).max(p.floor)
    }

    /// Build the series oldest first, ending at `end_month`. Totals are carried
    /// forward so `total[i] == total[i-1] + new[i-1]` holds by construction.
    pub fn generate<R: Rng>(&self, end_month: NaiveDate, rng: &mut R) -> Vec<CustomerGrowthPoint> {
        let mut points = Vec::with_capacity(self.plan.months as usize);
        let mut total = self.plan.base_total;

        for offset in (0..self.plan.months).rev() {
            let new_customers = self.new_customers_at(offset, rng);
            points.push(CustomerGrowthPoint {
                date: months_before(end_month, offset),
                total_customers: total,
                new_customers,
            });
            total += new_customers;
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regen::verify_running_totals;
    use rand::SeedableRng;
    use rand_pcg::Pcg64Mcg;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn quiet_plan(months: u32) -> RegenerationPlan {
        RegenerationPlan {
            months,
            noise_max: 0,
            ..RegenerationPlan::default()
        }
    }

    #[test]
    fn test_default_series_shape() {
        let gen = GrowthSeriesGenerator::new(RegenerationPlan::default());
        let series = gen.generate(end(), &mut Pcg64Mcg::seed_from_u64(7));
        assert_eq!(series.len(), 30);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(series[29].date, end());
        assert_eq!(series[0].total_customers, 8000);
        assert_eq!(series[0].new_customers, 400);
        assert!(series.iter().all(|p| p.new_customers >= 30));
        assert_eq!(verify_running_totals(&series), 0);
    }

    #[test]
    fn test_same_seed_same_series() {
        let gen = GrowthSeriesGenerator::new(RegenerationPlan::default());
        let a = gen.generate(end(), &mut Pcg64Mcg::seed_from_u64(42));
        let b = gen.generate(end(), &mut Pcg64Mcg::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_free_values() {
        let gen = GrowthSeriesGenerator::new(quiet_plan(30));
        let mut rng = Pcg64Mcg::seed_from_u64(0);
        // offset 15: 80 + sin(7.5)*60 + 350 seasonal + 500 market event + trend (14/6)*50
        assert_eq!(gen.new_customers_at(15, &mut rng), 1086);
        // offset 0: 80 + sin(0)*60 + 350 seasonal + trend (29/6)*50
        assert_eq!(gen.new_customers_at(0, &mut rng), 630);
        // offset 5: 80 + sin(2.5)*60 + trend (24/6)*50
        assert_eq!(gen.new_customers_at(5, &mut rng), 315);
    }

    #[test]
    fn test_floor_applies() {
        let plan = RegenerationPlan {
            seasonal_spike: 0.0,
            trend_increment: 0.0,
            market_events: Vec::new(),
            floor: 30,
            ..quiet_plan(30)
        };
        let gen = GrowthSeriesGenerator::new(plan);
        // offset 9: 80 + sin(4.5)*60 = 21.4, below the floor
        assert_eq!(gen.new_customers_at(9, &mut Pcg64Mcg::seed_from_u64(1)), 30);
    }

    #[test]
    fn test_single_month_plan() {
        let gen = GrowthSeriesGenerator::new(RegenerationPlan {
            months: 1,
            base_total: 500,
            ..RegenerationPlan::default()
        });
        let series = gen.generate(end(), &mut Pcg64Mcg::seed_from_u64(3));
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].date, end());
        assert_eq!(series[0].total_customers, 500);
        assert_eq!(series[0].new_customers, 400);
    }
}
