use crate::errors::{DashboardError, DashboardResult};
use crate::state::{
    AucHistoryPoint, AucMetricsRow, CustomerGrowthPoint, CustomerHistory, CustomerMetrics, IncomeByService,
    IncomeHistoryPoint, IncomeRow, MonthlyCustomerSnapshot, NewCustomerHistory, NewMonthlySnapshot,
    SegmentShare, TopCustomer, TradingVolumePoint,
};
use crate::store::{duplicate_month_error, MetricsStore, SeedData};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

pub type DbPool = Arc<Mutex<Connection>>;

const SCHEMA: &str = include_str!("../migrations/001_init.sql");

/// Canonical store: one SQLite connection behind a mutex. Multi-row writes
/// run inside a transaction and roll back on any error.
pub struct SqliteStore {
    db: DbPool,
}

impl SqliteStore {
    pub fn open(data_dir: &Path) -> DashboardResult<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| DashboardError::Database(format!("create dir: {e}")))?;
        let db_path = data_dir.join("custody_dashboard.db");
        let conn = Connection::open(&db_path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA cache_size=-16000;")?;

        let store = Self::with_connection(conn)?;
        tracing::info!("database initialized at {}", db_path.display());
        Ok(store)
    }

    #[cfg(test)]
    pub fn in_memory() -> DashboardResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> DashboardResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { db: Arc::new(Mutex::new(conn)) })
    }

    fn lock(&self) -> DashboardResult<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| DashboardError::Database(format!("lock poisoned: {e}")))
    }

    fn query_all<T>(&self, sql: &str, map: fn(&Row<'_>) -> rusqlite::Result<T>) -> DashboardResult<Vec<T>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], map)?.collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn query_first<T>(&self, sql: &str, map: fn(&Row<'_>) -> rusqlite::Result<T>) -> DashboardResult<Option<T>> {
        let conn = self.lock()?;
        Ok(conn.query_row(sql, [], map).optional()?)
    }
}

/// Map a UNIQUE violation on a month column to a validation error.
fn unique_month(e: rusqlite::Error, month: NaiveDate) -> DashboardError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            duplicate_month_error(month)
        }
        _ => e.into(),
    }
}

fn insert_snapshot(conn: &Connection, s: &NewMonthlySnapshot) -> DashboardResult<i64> {
    s.validate()?;
    conn.execute(
        "INSERT INTO monthly_customer_data (month, institutional, corporate, hni, funds, active_customers)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![s.month, s.institutional, s.corporate, s.hni, s.funds, s.active_customers],
    )
    .map_err(|e| unique_month(e, s.month))?;
    Ok(conn.last_insert_rowid())
}

fn insert_growth(conn: &Connection, points: &[CustomerGrowthPoint]) -> DashboardResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO customer_growth (date, total_customers, new_customers) VALUES (?1, ?2, ?3)",
    )?;
    for p in points {
        stmt.execute(params![p.date, p.total_customers, p.new_customers])
            .map_err(|e| unique_month(e, p.date))?;
    }
    Ok(())
}

fn insert_seed(conn: &Connection, data: &SeedData) -> DashboardResult<()> {
    for s in &data.monthly_snapshots {
        insert_snapshot(conn, s)?;
    }
    insert_growth(conn, &data.customer_growth)?;

    if let Some(m) = &data.customer_metrics {
        conn.execute(
            "INSERT INTO customer_metrics (total_customers, active_customers, new_customers_mtd, date)
             VALUES (?1, ?2, ?3, ?4)",
            params![m.total_customers, m.active_customers, m.new_customers_mtd, m.date],
        )?;
    }
    for s in &data.customer_segments {
        conn.execute(
            "INSERT INTO customer_segments (segment_name, percentage) VALUES (?1, ?2)",
            params![s.segment_name, s.percentage],
        )?;
    }
    for v in &data.trading_volume {
        conn.execute(
            "INSERT INTO trading_volume (date, volume) VALUES (?1, ?2)",
            params![v.date, v.volume],
        )?;
    }
    for h in &data.auc_history {
        conn.execute(
            "INSERT INTO auc_history (date, equity, fixed_income, mutual_funds, others) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![h.date, h.equity, h.fixed_income, h.mutual_funds, h.others],
        )?;
    }
    if let Some(a) = &data.auc_metrics {
        conn.execute(
            "INSERT INTO auc_metrics (total_auc, equity, fixed_income, mutual_funds, others) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![a.total_auc, a.equity, a.fixed_income, a.mutual_funds, a.others],
        )?;
    }
    if let Some(i) = &data.income {
        conn.execute(
            "INSERT INTO income (income_mtd, outstanding_fees) VALUES (?1, ?2)",
            params![i.income_mtd, i.outstanding_fees],
        )?;
    }
    for h in &data.income_history {
        conn.execute(
            "INSERT INTO income_history (date, amount) VALUES (?1, ?2)",
            params![h.date, h.amount],
        )?;
    }
    for s in &data.income_by_service {
        conn.execute(
            "INSERT INTO income_by_service (service_name, amount) VALUES (?1, ?2)",
            params![s.service_name, s.amount],
        )?;
    }
    for c in &data.top_customers {
        conn.execute(
            "INSERT INTO top_customers (name, customer_type, revenue, assets, change_percent) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![c.name, c.customer_type, c.revenue, c.assets, c.change_percent],
        )?;
    }
    Ok(())
}

impl MetricsStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn monthly_snapshots(&self) -> DashboardResult<Vec<MonthlyCustomerSnapshot>> {
        self.query_all(
            "SELECT id, month, institutional, corporate, hni, funds, active_customers
             FROM monthly_customer_data ORDER BY month ASC",
            |row| {
                Ok(MonthlyCustomerSnapshot {
                    id: row.get(0)?,
                    month: row.get(1)?,
                    institutional: row.get(2)?,
                    corporate: row.get(3)?,
                    hni: row.get(4)?,
                    funds: row.get(5)?,
                    active_customers: row.get(6)?,
                })
            },
        )
    }

    fn insert_monthly_snapshot(&self, snapshot: NewMonthlySnapshot) -> DashboardResult<MonthlyCustomerSnapshot> {
        let conn = self.lock()?;
        let id = insert_snapshot(&conn, &snapshot)?;
        Ok(snapshot.with_id(id))
    }

    fn customer_history(&self) -> DashboardResult<Vec<CustomerHistory>> {
        self.query_all(
            "SELECT id, date, total_customers, new_customers, churned_customers, retention_rate,
                    acquisition_cost, lifetime_value, institutional, corporate, hni, funds,
                    total, new_count, active
             FROM customer_history ORDER BY date ASC, id ASC",
            |row| {
                Ok(CustomerHistory {
                    id: row.get(0)?,
                    date: row.get(1)?,
                    total_customers: row.get(2)?,
                    new_customers: row.get(3)?,
                    churned_customers: row.get(4)?,
                    retention_rate: row.get(5)?,
                    acquisition_cost: row.get(6)?,
                    lifetime_value: row.get(7)?,
                    institutional: row.get(8)?,
                    corporate: row.get(9)?,
                    hni: row.get(10)?,
                    funds: row.get(11)?,
                    total: row.get(12)?,
                    new_count: row.get(13)?,
                    active: row.get(14)?,
                })
            },
        )
    }

    fn insert_customer_history(&self, record: NewCustomerHistory) -> DashboardResult<CustomerHistory> {
        record.validate()?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO customer_history (date, total_customers, new_customers, churned_customers,
                 retention_rate, acquisition_cost, lifetime_value, institutional, corporate, hni, funds,
                 total, new_count, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.date,
                record.total_customers,
                record.new_customers,
                record.churned_customers,
                record.retention_rate,
                record.acquisition_cost,
                record.lifetime_value,
                record.institutional,
                record.corporate,
                record.hni,
                record.funds,
                record.total,
                record.new_count,
                record.active,
            ],
        )?;
        Ok(record.with_id(conn.last_insert_rowid()))
    }

    fn customer_metrics_row(&self) -> DashboardResult<Option<CustomerMetrics>> {
        self.query_first(
            "SELECT total_customers, active_customers, new_customers_mtd, date
             FROM customer_metrics ORDER BY id ASC LIMIT 1",
            |row| {
                Ok(CustomerMetrics {
                    total_customers: row.get(0)?,
                    active_customers: row.get(1)?,
                    new_customers_mtd: row.get(2)?,
                    date: row.get(3)?,
                })
            },
        )
    }

    fn customer_growth(&self) -> DashboardResult<Vec<CustomerGrowthPoint>> {
        self.query_all(
            "SELECT date, total_customers, new_customers FROM customer_growth ORDER BY date ASC",
            |row| {
                Ok(CustomerGrowthPoint {
                    date: row.get(0)?,
                    total_customers: row.get(1)?,
                    new_customers: row.get(2)?,
                })
            },
        )
    }

    fn replace_customer_growth(&self, points: &[CustomerGrowthPoint]) -> DashboardResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM customer_growth", [])?;
        insert_growth(&tx, points)?;
        tx.commit()?;
        Ok(())
    }

    fn customer_segments(&self) -> DashboardResult<Vec<SegmentShare>> {
        self.query_all(
            "SELECT segment_name, percentage FROM customer_segments ORDER BY id ASC",
            |row| {
                Ok(SegmentShare {
                    segment_name: row.get(0)?,
                    percentage: row.get(1)?,
                })
            },
        )
    }

    fn auc_history(&self) -> DashboardResult<Vec<AucHistoryPoint>> {
        self.query_all(
            "SELECT date, equity, fixed_income, mutual_funds, others FROM auc_history ORDER BY date ASC, id ASC",
            |row| {
                Ok(AucHistoryPoint {
                    date: row.get(0)?,
                    equity: row.get(1)?,
                    fixed_income: row.get(2)?,
                    mutual_funds: row.get(3)?,
                    others: row.get(4)?,
                })
            },
        )
    }

    fn auc_metrics_row(&self) -> DashboardResult<Option<AucMetricsRow>> {
        self.query_first(
            "SELECT total_auc, equity, fixed_income, mutual_funds, others FROM auc_metrics ORDER BY id ASC LIMIT 1",
            |row| {
                Ok(AucMetricsRow {
                    total_auc: row.get(0)?,
                    equity: row.get(1)?,
                    fixed_income: row.get(2)?,
                    mutual_funds: row.get(3)?,
                    others: row.get(4)?,
                })
            },
        )
    }

    fn income_history(&self) -> DashboardResult<Vec<IncomeHistoryPoint>> {
        self.query_all(
            "SELECT date, amount FROM income_history ORDER BY date ASC, id ASC",
            |row| {
                Ok(IncomeHistoryPoint {
                    date: row.get(0)?,
                    amount: row.get(1)?,
                })
            },
        )
    }

    fn income_row(&self) -> DashboardResult<Option<IncomeRow>> {
        self.query_first(
            "SELECT income_mtd, outstanding_fees FROM income ORDER BY id ASC LIMIT 1",
            |row| {
                Ok(IncomeRow {
                    income_mtd: row.get(0)?,
                    outstanding_fees: row.get(1)?,
                })
            },
        )
    }

    fn trading_volume(&self) -> DashboardResult<Vec<TradingVolumePoint>> {
        self.query_all(
            "SELECT date, volume FROM trading_volume ORDER BY date ASC, id ASC",
            |row| {
                Ok(TradingVolumePoint {
                    date: row.get(0)?,
                    volume: row.get(1)?,
                })
            },
        )
    }

    fn income_by_service(&self) -> DashboardResult<Vec<IncomeByService>> {
        self.query_all(
            "SELECT service_name, amount FROM income_by_service ORDER BY id ASC",
            |row| {
                Ok(IncomeByService {
                    service_name: row.get(0)?,
                    amount: row.get(1)?,
                })
            },
        )
    }

    fn top_customers(&self) -> DashboardResult<Vec<TopCustomer>> {
        self.query_all(
            "SELECT name, customer_type, revenue, assets, change_percent FROM top_customers ORDER BY id ASC",
            |row| {
                Ok(TopCustomer {
                    name: row.get(0)?,
                    customer_type: row.get(1)?,
                    revenue: row.get(2)?,
                    assets: row.get(3)?,
                    change_percent: row.get(4)?,
                })
            },
        )
    }

    fn is_seeded(&self) -> DashboardResult<bool> {
        let conn = self.lock()?;
        let seeded = conn.query_row("SELECT EXISTS(SELECT 1 FROM customer_metrics)", [], |row| {
            row.get::<_, bool>(0)
        })?;
        Ok(seeded)
    }

    fn seed(&self, data: &SeedData) -> DashboardResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        insert_seed(&tx, data)?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{exercise_store, growth, new_history, new_snapshot};

    #[test]
    fn test_sqlite_store_contract() {
        exercise_store(&SqliteStore::in_memory().unwrap());
    }

    #[test]
    fn test_failed_replace_rolls_back() {
        let store = SqliteStore::in_memory().unwrap();
        let original = vec![growth(1, 100, 10), growth(2, 110, 12)];
        store.replace_customer_growth(&original).unwrap();

        // Second row collides with the first inside the transaction
        let broken = vec![growth(5, 1, 1), growth(5, 2, 2), growth(6, 3, 3)];
        assert!(store.replace_customer_growth(&broken).is_err());
        assert_eq!(store.customer_growth().unwrap(), original);
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        {
            let store = SqliteStore::open(&data_dir).unwrap();
            store.insert_monthly_snapshot(new_snapshot(4, 420)).unwrap();
            store.insert_customer_history(new_history(4, 1020)).unwrap();
        }
        let reopened = SqliteStore::open(&data_dir).unwrap();
        let snapshots = reopened.monthly_snapshots().unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].institutional, 420);
        assert_eq!(reopened.customer_history().unwrap()[0].total, 1020);
    }

    #[test]
    fn test_negative_counts_rejected_before_constraint() {
        let store = SqliteStore::in_memory().unwrap();
        let mut negative = new_snapshot(1, -5);
        negative.active_customers = 0;
        let err = store.insert_monthly_snapshot(negative).unwrap_err();
        assert!(matches!(err, DashboardError::Validation(_)));
    }
}
