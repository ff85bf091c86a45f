// Port trait for the Superset REST API
use crate::domain::chart::{ChartSummary, NewChart};
use crate::domain::dashboard::{DashboardDetail, DashboardSummary, DashboardUpdate, NewDashboard};
use crate::domain::dataset::{DatabaseSummary, DatasetSummary, NewVirtualDataset};
use async_trait::async_trait;
use serde::Serialize;

/// Filter clause inside a list query, e.g. `table_name eq orders`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListFilter {
    pub col: String,
    pub opr: String,
    pub value: String,
}

/// The `q` parameter of Superset list endpoints.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ListQuery {
    /// Zero-based page index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_direction: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<ListFilter>,
}

impl ListQuery {
    pub fn newest_first(page_size: u32) -> Self {
        Self {
            page: None,
            page_size: Some(page_size),
            order_column: Some("id".to_string()),
            order_direction: Some("desc".to_string()),
            filters: Vec::new(),
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn filter(col: &str, opr: &str, value: &str) -> Self {
        Self {
            filters: vec![ListFilter {
                col: col.to_string(),
                opr: opr.to_string(),
                value: value.to_string(),
            }],
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn to_param(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[async_trait]
pub trait SupersetApi: Send + Sync {
    /// Base URL of the Superset instance, used to print links
    fn base_url(&self) -> &str;

    async fn list_databases(&self) -> anyhow::Result<Vec<DatabaseSummary>>;

    async fn list_datasets(&self, query: &ListQuery) -> anyhow::Result<Vec<DatasetSummary>>;

    /// Returns the id of the new dataset
    async fn create_dataset(&self, dataset: &NewVirtualDataset) -> anyhow::Result<i64>;

    /// Re-read column metadata from the database
    async fn refresh_dataset(&self, dataset_id: i64) -> anyhow::Result<()>;

    async fn delete_dataset(&self, dataset_id: i64) -> anyhow::Result<()>;

    async fn list_charts(&self, query: &ListQuery) -> anyhow::Result<Vec<ChartSummary>>;

    async fn create_chart(&self, chart: &NewChart) -> anyhow::Result<i64>;

    async fn delete_chart(&self, chart_id: i64) -> anyhow::Result<()>;

    async fn list_dashboards(&self) -> anyhow::Result<Vec<DashboardSummary>>;

    async fn get_dashboard(&self, dashboard_id: i64) -> anyhow::Result<DashboardDetail>;

    /// Charts placed on a dashboard, in the order Superset reports them
    async fn dashboard_charts(&self, dashboard_id: i64) -> anyhow::Result<Vec<ChartSummary>>;

    async fn create_dashboard(&self, dashboard: &NewDashboard) -> anyhow::Result<i64>;

    async fn update_dashboard(&self, dashboard_id: i64, update: &DashboardUpdate) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_param() {
        assert_eq!(
            ListQuery::newest_first(10).to_param(),
            r#"{"page_size":10,"order_column":"id","order_direction":"desc"}"#
        );
        assert_eq!(
            ListQuery::filter("table_name", "eq", "orders_with_status").to_param(),
            r#"{"filters":[{"col":"table_name","opr":"eq","value":"orders_with_status"}]}"#
        );
        assert_eq!(
            ListQuery::newest_first(100).page(2).to_param(),
            r#"{"page":2,"page_size":100,"order_column":"id","order_direction":"desc"}"#
        );
        assert!(ListQuery::default().is_empty());
    }
}
