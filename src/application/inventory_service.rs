// Inventory service - Read-only view of what exists on the instance
use crate::application::superset_api::{ListQuery, SupersetApi};
use crate::domain::chart::ChartSummary;
use crate::domain::dashboard::DashboardSummary;
use crate::domain::dataset::DatasetSummary;
use std::sync::Arc;

/// Datasets, charts and dashboards as listed right now. A section whose
/// listing failed is left empty and its error recorded.
#[derive(Debug, Default)]
pub struct Inventory {
    pub datasets: Vec<DatasetSummary>,
    pub charts: Vec<ChartSummary>,
    pub dashboards: Vec<DashboardSummary>,
    pub errors: Vec<String>,
}

#[derive(Clone)]
pub struct InventoryService {
    api: Arc<dyn SupersetApi>,
}

impl InventoryService {
    pub fn new(api: Arc<dyn SupersetApi>) -> Self {
        Self { api }
    }

    pub async fn snapshot(&self) -> Inventory {
        let mut inventory = Inventory::default();

        match self.api.list_datasets(&ListQuery::default()).await {
            Ok(datasets) => inventory.datasets = datasets,
            Err(e) => {
                tracing::warn!("Error listing datasets: {:#}", e);
                inventory.errors.push(format!("datasets: {e:#}"));
            }
        }

        match self.api.list_charts(&ListQuery::default()).await {
            Ok(charts) => inventory.charts = charts,
            Err(e) => {
                tracing::warn!("Error listing charts: {:#}", e);
                inventory.errors.push(format!("charts: {e:#}"));
            }
        }

        match self.api.list_dashboards().await {
            Ok(dashboards) => inventory.dashboards = dashboards,
            Err(e) => {
                tracing::warn!("Error listing dashboards: {:#}", e);
                inventory.errors.push(format!("dashboards: {e:#}"));
            }
        }

        inventory
    }

    pub async fn dashboards(&self) -> anyhow::Result<Vec<DashboardSummary>> {
        self.api.list_dashboards().await
    }
}
