// Provisioning service - Use cases that build dashboards from scratch
use crate::application::superset_api::{ListQuery, SupersetApi};
use crate::domain::chart::{
    PieMetric, bar_chart, distribution_bar_chart, pie_chart, table_chart,
};
use crate::domain::dashboard::{DashboardMetadata, DashboardUpdate, NewDashboard, dashboard_url};
use crate::domain::dataset::{
    NewVirtualDataset, ORDERS_WITH_STATUS, ORDERS_WITH_STATUS_SQL, PRODUCT_DEFECT_ANALYSIS,
    PRODUCT_DEFECT_ANALYSIS_SQL, find_preferred_database, versioned_table_name,
};
use crate::domain::layout::{ChartTrio, split_grid, stacked};
use crate::domain::native_filter::NativeFilter;
use crate::infrastructure::api_error::status_of;
use anyhow::{Context, anyhow};
use std::sync::Arc;
use std::time::Duration;

pub const SALES_PIE: &str = "Sales by Status (Pie)";
pub const ORDER_TABLE: &str = "Order Details";
const DEFECT_PIE: &str = "Product Status Distribution (Good/Warning/Bad)";
const DEFECT_TABLE: &str = "Product Test Result Details";
const DEFECT_BAR: &str = "Defect Rate by Product";
const STATUS_BREAKDOWN_BAR: &str = "Status Breakdown by Product";

#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionOutcome {
    pub dashboard_id: i64,
    pub dataset_id: i64,
    pub chart_ids: Vec<i64>,
    pub url: String,
    /// Steps that failed without aborting the run
    pub warnings: Vec<String>,
}

/// Inputs for replacing the bar chart of an existing split-grid dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChartRebuild {
    pub dashboard_id: i64,
    pub dataset_id: i64,
    pub pie_chart_id: i64,
    pub table_chart_id: i64,
    pub replaces: Option<i64>,
}

#[derive(Clone)]
pub struct ProvisioningService {
    api: Arc<dyn SupersetApi>,
    pacing: Duration,
}

impl ProvisioningService {
    pub fn new(api: Arc<dyn SupersetApi>, pacing: Duration) -> Self {
        Self { api, pacing }
    }

    /// Orders dataset with a computed status, a pie of sales per status and
    /// a detail table, stacked, with cross filters and a 30-day period filter.
    pub async fn cross_filter_dashboard(&self) -> anyhow::Result<ProvisionOutcome> {
        let database_id = self.resolve_database().await?;
        let dataset_id = self.ensure_dataset(database_id).await?;
        self.pause().await;

        let pie_id = self
            .api
            .create_chart(&pie_chart(
                SALES_PIE,
                dataset_id,
                "status",
                PieMetric::Sum { column: "amount".to_string() },
            ))
            .await
            .context("Failed to create pie chart")?;
        tracing::info!("Created pie chart {}", pie_id);

        let table_id = self
            .api
            .create_chart(&table_chart(
                ORDER_TABLE,
                dataset_id,
                &["order_id", "order_date", "customer_name", "amount", "status", "days_since_order"],
                "order_date",
                100,
            ))
            .await
            .context("Failed to create table chart")?;
        tracing::info!("Created table chart {}", table_id);
        self.pause().await;

        let dashboard_id = self
            .api
            .create_dashboard(&NewDashboard::published("Order Status Analysis (Cross Filter)"))
            .await
            .context("Failed to create dashboard")?;
        tracing::info!("Created dashboard {}", dashboard_id);

        let mut warnings = Vec::new();
        let layout = stacked(&[("pie", pie_id, SALES_PIE), ("table", table_id, ORDER_TABLE)])?;
        let update = DashboardUpdate::layout(&layout, &DashboardMetadata::fresh_dashboard());
        if let Err(e) = self.api.update_dashboard(dashboard_id, &update).await {
            tracing::warn!("Dashboard layout update failed: {:#}", e);
            warnings.push(format!("layout: {e:#}"));
        }
        self.pause().await;

        let filter = NativeFilter::time_range(dataset_id, "order_date")
            .named("Order period")
            .with_default("Last 30 days");
        if let Err(e) = self.attach_filter(dashboard_id, filter).await {
            tracing::warn!("Native filter creation failed: {:#}", e);
            warnings.push(format!("native filter: {e:#}"));
        }

        Ok(ProvisionOutcome {
            dashboard_id,
            dataset_id,
            chart_ids: vec![pie_id, table_id],
            url: dashboard_url(self.api.base_url(), dashboard_id),
            warnings,
        })
    }

    /// Product defect dataset (previous versions dropped), pie/table/bar in
    /// the split grid, cross filters on.
    pub async fn defect_dashboard(&self, now_unix: i64) -> anyhow::Result<ProvisionOutcome> {
        let database_id = self.resolve_database().await?;
        let dataset_id = self.replace_defect_dataset(database_id, now_unix).await?;
        self.pause().await;

        let pie_id = self
            .api
            .create_chart(&pie_chart(DEFECT_PIE, dataset_id, "status", PieMetric::Count))
            .await
            .context("Failed to create pie chart")?;
        let table_id = self
            .api
            .create_chart(&table_chart(
                DEFECT_TABLE,
                dataset_id,
                &["test_date", "product_name", "success_count", "failure_count", "defect_rate", "status"],
                "test_date",
                100,
            ))
            .await
            .context("Failed to create table chart")?;
        let bar_id = self
            .api
            .create_chart(&distribution_bar_chart(DEFECT_BAR, dataset_id, "product_name", "status"))
            .await
            .context("Failed to create bar chart")?;
        tracing::info!("Created charts pie={} table={} bar={}", pie_id, table_id, bar_id);
        self.pause().await;

        let dashboard_id = self
            .api
            .create_dashboard(&NewDashboard::published("Product Defect Rate Analysis"))
            .await
            .context("Failed to create dashboard")?;
        tracing::info!("Created dashboard {}", dashboard_id);

        let mut warnings = Vec::new();
        let layout = split_grid(ChartTrio { pie: pie_id, table: table_id, bar: bar_id })?;
        let update = DashboardUpdate::layout(&layout, &DashboardMetadata::cross_filters_only());
        if let Err(e) = self.api.update_dashboard(dashboard_id, &update).await {
            tracing::warn!("Dashboard layout update failed: {:#}", e);
            warnings.push(format!("layout: {e:#}"));
        }

        Ok(ProvisionOutcome {
            dashboard_id,
            dataset_id,
            chart_ids: vec![pie_id, table_id, bar_id],
            url: dashboard_url(self.api.base_url(), dashboard_id),
            warnings,
        })
    }

    /// Swap the bar chart of a split-grid dashboard for a fresh `bar` viz.
    /// Returns the new chart id.
    pub async fn recreate_bar_chart(&self, request: &BarChartRebuild) -> anyhow::Result<i64> {
        if let Some(old) = request.replaces {
            match self.api.delete_chart(old).await {
                Ok(()) => tracing::info!("Deleted old bar chart {}", old),
                Err(e) if status_of(&e).map(|s| s.as_u16()) == Some(404) => {
                    tracing::info!("Old bar chart {} is already gone", old)
                }
                Err(e) => tracing::warn!("Old bar chart {} not deleted: {:#}", old, e),
            }
            self.pause().await;
        }

        let chart = bar_chart(
            STATUS_BREAKDOWN_BAR,
            request.dataset_id,
            "product_name",
            "status",
            "Product",
            "Count",
        );
        let bar_id = self
            .api
            .create_chart(&chart)
            .await
            .context("Failed to create bar chart")?;
        tracing::info!("Created bar chart {}", bar_id);
        self.pause().await;

        let layout = split_grid(ChartTrio {
            pie: request.pie_chart_id,
            table: request.table_chart_id,
            bar: bar_id,
        })?;
        self.api
            .update_dashboard(
                request.dashboard_id,
                &DashboardUpdate::layout(&layout, &DashboardMetadata::cross_filter_reset()),
            )
            .await
            .with_context(|| format!("Failed to update dashboard {}", request.dashboard_id))?;
        Ok(bar_id)
    }

    async fn resolve_database(&self) -> anyhow::Result<i64> {
        let databases = self.api.list_databases().await?;
        let database = find_preferred_database(&databases)
            .ok_or_else(|| anyhow!("No 'Main Database' or 'superset' database connection found"))?;
        tracing::info!("Using database {} ({})", database.id, database.database_name);
        Ok(database.id)
    }

    /// Reuse the orders dataset when it already exists.
    async fn ensure_dataset(&self, database_id: i64) -> anyhow::Result<i64> {
        let existing = self
            .api
            .list_datasets(&ListQuery::filter("table_name", "eq", ORDERS_WITH_STATUS))
            .await?;
        if let Some(dataset) = existing.first() {
            tracing::info!("Dataset {} already exists (id {})", ORDERS_WITH_STATUS, dataset.id);
            return Ok(dataset.id);
        }

        let dataset = NewVirtualDataset::new(database_id, ORDERS_WITH_STATUS, ORDERS_WITH_STATUS_SQL);
        self.create_and_refresh(&dataset).await
    }

    /// Drop every earlier version of the defect dataset, then create a new
    /// timestamped one.
    async fn replace_defect_dataset(&self, database_id: i64, now_unix: i64) -> anyhow::Result<i64> {
        let existing = self
            .api
            .list_datasets(&ListQuery::filter("table_name", "sw", PRODUCT_DEFECT_ANALYSIS))
            .await?;
        for dataset in existing {
            match self.api.delete_dataset(dataset.id).await {
                Ok(()) => {
                    tracing::info!("Deleted previous dataset {} ({})", dataset.id, dataset.table_name);
                    self.pause().await;
                }
                Err(e) => tracing::warn!("Could not delete dataset {}, continuing: {:#}", dataset.id, e),
            }
        }

        let dataset = NewVirtualDataset::new(
            database_id,
            versioned_table_name(PRODUCT_DEFECT_ANALYSIS, now_unix),
            PRODUCT_DEFECT_ANALYSIS_SQL,
        );
        self.create_and_refresh(&dataset).await
    }

    async fn create_and_refresh(&self, dataset: &NewVirtualDataset) -> anyhow::Result<i64> {
        let dataset_id = self
            .api
            .create_dataset(dataset)
            .await
            .with_context(|| format!("Failed to create dataset {}", dataset.table_name))?;
        tracing::info!("Created dataset {} (id {})", dataset.table_name, dataset_id);

        self.pause().await;
        if let Err(e) = self.api.refresh_dataset(dataset_id).await {
            tracing::warn!("Dataset {} column refresh failed: {:#}", dataset_id, e);
        }
        Ok(dataset_id)
    }

    async fn attach_filter(&self, dashboard_id: i64, filter: NativeFilter) -> anyhow::Result<()> {
        let detail = self.api.get_dashboard(dashboard_id).await?;
        let mut metadata = detail.metadata()?;
        metadata.set_native_filters(&[filter]);
        self.api
            .update_dashboard(dashboard_id, &DashboardUpdate::metadata_only(&metadata))
            .await
    }

    async fn pause(&self) {
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
    }
}
