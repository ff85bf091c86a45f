// In-memory SupersetApi used by service tests
use crate::application::superset_api::{ListQuery, SupersetApi};
use crate::domain::chart::{ChartSummary, NewChart};
use crate::domain::dashboard::{DashboardDetail, DashboardSummary, DashboardUpdate, NewDashboard};
use crate::domain::dataset::{DatabaseSummary, DatasetSummary, NewVirtualDataset};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeState {
    pub databases: Vec<DatabaseSummary>,
    pub datasets: Vec<DatasetSummary>,
    pub charts: Vec<ChartSummary>,
    pub dashboards: Vec<DashboardDetail>,
    pub dashboard_charts: HashMap<i64, Vec<i64>>,
    pub created_datasets: Vec<NewVirtualDataset>,
    pub created_charts: Vec<NewChart>,
    pub updates: Vec<(i64, DashboardUpdate)>,
    pub refreshed: Vec<i64>,
    /// Operation names that answer with an error
    pub failing: HashSet<&'static str>,
    /// Resource ids whose deletion fails
    pub undeletable: HashSet<i64>,
    pub calls: Vec<String>,
    next_id: i64,
}

pub struct FakeSuperset {
    pub state: Mutex<FakeState>,
}

impl FakeSuperset {
    pub fn new() -> Self {
        let state = FakeState {
            databases: vec![
                DatabaseSummary { id: 1, database_name: "examples".to_string() },
                DatabaseSummary { id: 2, database_name: "superset".to_string() },
            ],
            next_id: 100,
            ..FakeState::default()
        };
        Self { state: Mutex::new(state) }
    }

    pub fn with_charts(self, charts: &[(i64, &str)]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.charts.extend(charts.iter().map(|(id, name)| ChartSummary {
                id: *id,
                slice_name: name.to_string(),
                viz_type: None,
            }));
        }
        self
    }

    pub fn with_dashboard(self, id: i64, title: &str, json_metadata: Option<serde_json::Value>) -> Self {
        self.state.lock().unwrap().dashboards.push(DashboardDetail {
            id,
            dashboard_title: title.to_string(),
            position_json: None,
            json_metadata,
        });
        self
    }

    pub fn failing(self, operation: &'static str) -> Self {
        self.state.lock().unwrap().failing.insert(operation);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn enter(&self, call: String, operation: &'static str) -> Result<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(operation) {
            bail!("{operation} failed with status 500");
        }
        Ok(state)
    }
}

fn matches(query: &ListQuery, value: &str) -> bool {
    query.filters.iter().all(|f| match f.opr.as_str() {
        "eq" => value == f.value,
        "sw" => value.starts_with(&f.value),
        _ => true,
    })
}

/// Orders by id when asked, then cuts out `page` of `page_size` items.
fn paged<T>(query: &ListQuery, mut items: Vec<T>, id: impl Fn(&T) -> i64) -> Vec<T> {
    if query.order_direction.as_deref() == Some("desc") {
        items.sort_by_key(|item| std::cmp::Reverse(id(item)));
    }
    match query.page_size {
        Some(size) => {
            let size = size as usize;
            let start = query.page.unwrap_or(0) as usize * size;
            items.into_iter().skip(start).take(size).collect()
        }
        None => items,
    }
}

#[async_trait]
impl SupersetApi for FakeSuperset {
    fn base_url(&self) -> &str {
        "http://superset.test"
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseSummary>> {
        let state = self.enter("list_databases".into(), "list_databases")?;
        Ok(state.databases.clone())
    }

    async fn list_datasets(&self, query: &ListQuery) -> Result<Vec<DatasetSummary>> {
        let state = self.enter("list_datasets".into(), "list_datasets")?;
        let datasets = state
            .datasets
            .iter()
            .filter(|d| matches(query, &d.table_name))
            .cloned()
            .collect();
        Ok(paged(query, datasets, |d| d.id))
    }

    async fn create_dataset(&self, dataset: &NewVirtualDataset) -> Result<i64> {
        let mut state = self.enter(format!("create_dataset {}", dataset.table_name), "create_dataset")?;
        state.next_id += 1;
        let id = state.next_id;
        state.datasets.push(DatasetSummary {
            id,
            table_name: dataset.table_name.clone(),
            sql: Some(dataset.sql.clone()),
        });
        state.created_datasets.push(dataset.clone());
        Ok(id)
    }

    async fn refresh_dataset(&self, dataset_id: i64) -> Result<()> {
        let mut state = self.enter(format!("refresh_dataset {dataset_id}"), "refresh_dataset")?;
        state.refreshed.push(dataset_id);
        Ok(())
    }

    async fn delete_dataset(&self, dataset_id: i64) -> Result<()> {
        let mut state = self.enter(format!("delete_dataset {dataset_id}"), "delete_dataset")?;
        if state.undeletable.contains(&dataset_id) {
            bail!("delete dataset failed with status 422");
        }
        state.datasets.retain(|d| d.id != dataset_id);
        Ok(())
    }

    async fn list_charts(&self, query: &ListQuery) -> Result<Vec<ChartSummary>> {
        let state = self.enter("list_charts".into(), "list_charts")?;
        Ok(paged(query, state.charts.clone(), |c| c.id))
    }

    async fn create_chart(&self, chart: &NewChart) -> Result<i64> {
        let mut state = self.enter(format!("create_chart {}", chart.viz_type), "create_chart")?;
        state.next_id += 1;
        let id = state.next_id;
        state.charts.push(ChartSummary {
            id,
            slice_name: chart.slice_name.clone(),
            viz_type: Some(chart.viz_type.clone()),
        });
        state.created_charts.push(chart.clone());
        Ok(id)
    }

    async fn delete_chart(&self, chart_id: i64) -> Result<()> {
        let mut state = self.enter(format!("delete_chart {chart_id}"), "delete_chart")?;
        if state.undeletable.contains(&chart_id) || !state.charts.iter().any(|c| c.id == chart_id) {
            bail!("delete chart failed with status 404");
        }
        state.charts.retain(|c| c.id != chart_id);
        Ok(())
    }

    async fn list_dashboards(&self) -> Result<Vec<DashboardSummary>> {
        let state = self.enter("list_dashboards".into(), "list_dashboards")?;
        Ok(state
            .dashboards
            .iter()
            .map(|d| DashboardSummary {
                id: d.id,
                dashboard_title: d.dashboard_title.clone(),
            })
            .collect())
    }

    async fn get_dashboard(&self, dashboard_id: i64) -> Result<DashboardDetail> {
        let state = self.enter(format!("get_dashboard {dashboard_id}"), "get_dashboard")?;
        match state.dashboards.iter().find(|d| d.id == dashboard_id) {
            Some(detail) => Ok(detail.clone()),
            None => bail!("get dashboard failed with status 404"),
        }
    }

    async fn dashboard_charts(&self, dashboard_id: i64) -> Result<Vec<ChartSummary>> {
        let state = self.enter(format!("dashboard_charts {dashboard_id}"), "dashboard_charts")?;
        let ids = state.dashboard_charts.get(&dashboard_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| state.charts.iter().find(|c| c.id == *id).cloned())
            .collect())
    }

    async fn create_dashboard(&self, dashboard: &NewDashboard) -> Result<i64> {
        let mut state = self.enter("create_dashboard".into(), "create_dashboard")?;
        state.next_id += 1;
        let id = state.next_id;
        state.dashboards.push(DashboardDetail {
            id,
            dashboard_title: dashboard.dashboard_title.clone(),
            position_json: None,
            json_metadata: None,
        });
        Ok(id)
    }

    async fn update_dashboard(&self, dashboard_id: i64, update: &DashboardUpdate) -> Result<()> {
        let mut state = self.enter(format!("update_dashboard {dashboard_id}"), "update_dashboard")?;
        if let Some(detail) = state.dashboards.iter_mut().find(|d| d.id == dashboard_id) {
            if let Some(layout) = &update.position_json {
                detail.position_json = serde_json::from_str(layout).ok();
            }
            if let Some(metadata) = &update.json_metadata {
                detail.json_metadata = serde_json::from_str(metadata).ok();
            }
        }
        state.updates.push((dashboard_id, update.clone()));
        Ok(())
    }
}
