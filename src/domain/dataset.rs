// Dataset and database domain models
use serde::{Deserialize, Serialize};

/// Connection names Superset ships its metadata database under.
pub const PREFERRED_DATABASES: [&str; 2] = ["Main Database", "superset"];

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatabaseSummary {
    pub id: i64,
    pub database_name: String,
}

pub fn find_preferred_database(databases: &[DatabaseSummary]) -> Option<&DatabaseSummary> {
    databases
        .iter()
        .find(|db| PREFERRED_DATABASES.contains(&db.database_name.as_str()))
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatasetSummary {
    pub id: i64,
    pub table_name: String,
    #[serde(default)]
    pub sql: Option<String>,
}

/// A SQL-backed ("virtual") dataset.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewVirtualDataset {
    pub database: i64,
    pub schema: String,
    pub table_name: String,
    pub sql: String,
}

impl NewVirtualDataset {
    pub fn new(database: i64, table_name: impl Into<String>, sql: &str) -> Self {
        Self {
            database,
            schema: "public".to_string(),
            table_name: table_name.into(),
            sql: sql.trim().to_string(),
        }
    }
}

pub const ORDERS_WITH_STATUS: &str = "orders_with_status";

/// Values of the `status` column in [`ORDERS_WITH_STATUS_SQL`].
pub const ORDER_STATUSES: [&str; 3] = ["New", "In Progress", "Delayed"];

/// Orders with an age-derived status: under a week is New, under a month
/// In Progress, anything older Delayed.
pub const ORDERS_WITH_STATUS_SQL: &str = r#"
SELECT
    order_id,
    order_date,
    amount,
    customer_name,
    department_id,
    CASE
        WHEN (CURRENT_DATE - order_date) < 7 THEN 'New'
        WHEN (CURRENT_DATE - order_date) < 30 THEN 'In Progress'
        ELSE 'Delayed'
    END AS status,
    (CURRENT_DATE - order_date) AS days_since_order
FROM orders
ORDER BY order_date DESC
"#;

pub const PRODUCT_DEFECT_ANALYSIS: &str = "product_defect_analysis";

/// Defect rate per test run. Good up to 5%, Warning up to 10%, Bad above.
pub const PRODUCT_DEFECT_ANALYSIS_SQL: &str = r#"
SELECT
    product_name,
    test_date,
    success_count,
    failure_count,
    department_id,
    ROUND(failure_count::NUMERIC / (success_count + failure_count) * 100, 2) AS defect_rate,
    CASE
        WHEN failure_count::NUMERIC / (success_count + failure_count) <= 0.05 THEN 'Good'
        WHEN failure_count::NUMERIC / (success_count + failure_count) <= 0.10 THEN 'Warning'
        ELSE 'Bad'
    END AS status
FROM product_test_results
ORDER BY test_date DESC, product_name
"#;

/// Dataset names must be unique per database, so repeated runs get a
/// timestamp suffix.
pub fn versioned_table_name(base: &str, unix_seconds: i64) -> String {
    format!("{base}_v{unix_seconds}")
}
