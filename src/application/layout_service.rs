// Layout service - Use cases that rewrite an existing dashboard
use crate::application::superset_api::{ListQuery, SupersetApi};
use crate::domain::dashboard::{DashboardMetadata, DashboardUpdate};
use crate::domain::layout::{ChartTrio, split_grid};
use crate::domain::native_filter::NativeFilter;
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct LayoutService {
    api: Arc<dyn SupersetApi>,
}

impl LayoutService {
    pub fn new(api: Arc<dyn SupersetApi>) -> Self {
        Self { api }
    }

    /// Place the three most recently created charts on the dashboard,
    /// oldest first: pie, table, bar.
    pub async fn add_recent_charts(&self, dashboard_id: i64) -> anyhow::Result<ChartTrio> {
        let charts = self.api.list_charts(&ListQuery::newest_first(10)).await?;
        let mut recent: Vec<_> = charts.into_iter().take(3).collect();
        recent.reverse();
        for chart in &recent {
            tracing::info!("Using chart {} ({})", chart.id, chart.slice_name);
        }

        let ids: Vec<i64> = recent.iter().map(|c| c.id).collect();
        let trio = ChartTrio::from_ordered(&ids)?;
        self.write_split_grid(dashboard_id, trio, DashboardMetadata::cross_filter_reset())
            .await?;
        Ok(trio)
    }

    /// Rebuild the grid from the charts already attached to the dashboard.
    pub async fn fix_layout(&self, dashboard_id: i64) -> anyhow::Result<ChartTrio> {
        let detail = self.api.get_dashboard(dashboard_id).await?;
        tracing::info!("Fixing layout of dashboard {} ({})", detail.id, detail.dashboard_title);

        let charts = self.api.dashboard_charts(dashboard_id).await?;
        let ids: Vec<i64> = charts.iter().map(|c| c.id).collect();
        tracing::info!("Dashboard charts: {:?}", ids);

        let trio = ChartTrio::from_ordered(&ids)?;
        self.write_split_grid(dashboard_id, trio, DashboardMetadata::cross_filters_only())
            .await?;
        Ok(trio)
    }

    /// Write the standard grid with explicitly chosen charts.
    pub async fn set_layout(&self, dashboard_id: i64, trio: ChartTrio) -> anyhow::Result<()> {
        self.write_split_grid(dashboard_id, trio, DashboardMetadata::cross_filter_reset())
            .await
    }

    /// Replace the dashboard's native filters with `filter`, keeping every
    /// other metadata key.
    pub async fn add_time_filter(
        &self,
        dashboard_id: i64,
        filter: NativeFilter,
    ) -> anyhow::Result<DashboardMetadata> {
        let detail = self.api.get_dashboard(dashboard_id).await?;
        let mut metadata = detail
            .metadata()
            .with_context(|| format!("Dashboard {dashboard_id} has malformed json_metadata"))?;
        tracing::info!(
            "Dashboard {} currently has {} native filters",
            dashboard_id,
            metadata.native_filter_configuration.as_ref().map_or(0, Vec::len)
        );

        metadata.set_native_filters(&[filter]);
        metadata.cross_filters_enabled = Some(true);
        self.api
            .update_dashboard(dashboard_id, &DashboardUpdate::metadata_only(&metadata))
            .await?;
        tracing::info!("Time filter added to dashboard {}", dashboard_id);
        Ok(metadata)
    }

    async fn write_split_grid(
        &self,
        dashboard_id: i64,
        trio: ChartTrio,
        metadata: DashboardMetadata,
    ) -> anyhow::Result<()> {
        tracing::info!(
            "Layout for dashboard {}: pie={} table={} bar={}",
            dashboard_id,
            trio.pie,
            trio.table,
            trio.bar
        );
        let layout = split_grid(trio)?;
        self.api
            .update_dashboard(dashboard_id, &DashboardUpdate::layout(&layout, &metadata))
            .await
            .with_context(|| format!("Failed to update layout of dashboard {dashboard_id}"))
    }
}
