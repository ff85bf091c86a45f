// Dashboard layout domain model (position_json)
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

pub const ROOT_ID: &str = "ROOT_ID";
pub const GRID_ID: &str = "GRID_ID";
pub const GRID_COLUMNS: u32 = 12;
pub const DEFAULT_CHART_HEIGHT: u32 = 50;
const VERSION_KEY: &str = "DASHBOARD_VERSION_KEY";
const VERSION: &str = "v2";
const ROW_BACKGROUND: &str = "BACKGROUND_TRANSPARENT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout needs {needed} charts but only {found} were given")]
    NotEnoughCharts { needed: usize, found: usize },
    #[error("row {row} is {width} columns wide, grid only has {max}", max = GRID_COLUMNS)]
    RowOverflow { row: String, width: u32 },
    #[error("duplicate layout node id {0}")]
    DuplicateId(String),
    #[error("row {0} has no charts")]
    EmptyRow(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    Root,
    Grid,
    Row,
    Chart,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutNode {
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub id: String,
    pub children: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<NodeMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NodeMeta {
    Row {
        background: String,
    },
    Chart {
        width: u32,
        height: u32,
        #[serde(rename = "chartId")]
        chart_id: i64,
        #[serde(rename = "sliceName", skip_serializing_if = "Option::is_none")]
        slice_name: Option<String>,
    },
}

/// A chart placed in a grid row. The node id is `CHART-<key>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSlot {
    pub key: String,
    pub chart_id: i64,
    pub width: u32,
    pub height: u32,
    pub slice_name: Option<String>,
}

impl ChartSlot {
    pub fn new(key: impl Into<String>, chart_id: i64, width: u32) -> Self {
        Self {
            key: key.into(),
            chart_id,
            width,
            height: DEFAULT_CHART_HEIGHT,
            slice_name: None,
        }
    }

    pub fn with_slice_name(mut self, name: impl Into<String>) -> Self {
        self.slice_name = Some(name.into());
        self
    }

    fn node_id(&self) -> String {
        format!("CHART-{}", self.key)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct RowSpec {
    id: String,
    charts: Vec<ChartSlot>,
}

#[derive(Debug, Clone, Default)]
pub struct LayoutBuilder {
    rows: Vec<RowSpec>,
}

impl LayoutBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, id: impl Into<String>, charts: Vec<ChartSlot>) -> Self {
        self.rows.push(RowSpec {
            id: id.into(),
            charts,
        });
        self
    }

    pub fn build(self) -> Result<DashboardLayout, LayoutError> {
        let mut nodes = Vec::with_capacity(2 + self.rows.len() * 2);
        let mut seen: HashSet<String> = [ROOT_ID.to_string(), GRID_ID.to_string()].into();

        nodes.push(LayoutNode {
            kind: NodeKind::Root,
            id: ROOT_ID.to_string(),
            children: vec![GRID_ID.to_string()],
            parents: Vec::new(),
            meta: None,
        });
        nodes.push(LayoutNode {
            kind: NodeKind::Grid,
            id: GRID_ID.to_string(),
            children: self.rows.iter().map(|r| r.id.clone()).collect(),
            parents: vec![ROOT_ID.to_string()],
            meta: None,
        });

        for row in &self.rows {
            if row.charts.is_empty() {
                return Err(LayoutError::EmptyRow(row.id.clone()));
            }
            let width: u32 = row.charts.iter().map(|c| c.width).sum();
            if width > GRID_COLUMNS {
                return Err(LayoutError::RowOverflow {
                    row: row.id.clone(),
                    width,
                });
            }
            if !seen.insert(row.id.clone()) {
                return Err(LayoutError::DuplicateId(row.id.clone()));
            }

            nodes.push(LayoutNode {
                kind: NodeKind::Row,
                id: row.id.clone(),
                children: row.charts.iter().map(ChartSlot::node_id).collect(),
                parents: vec![GRID_ID.to_string()],
                meta: Some(NodeMeta::Row {
                    background: ROW_BACKGROUND.to_string(),
                }),
            });

            for chart in &row.charts {
                let id = chart.node_id();
                if !seen.insert(id.clone()) {
                    return Err(LayoutError::DuplicateId(id));
                }
                nodes.push(LayoutNode {
                    kind: NodeKind::Chart,
                    id,
                    children: Vec::new(),
                    parents: vec![row.id.clone()],
                    meta: Some(NodeMeta::Chart {
                        width: chart.width,
                        height: chart.height,
                        chart_id: chart.chart_id,
                        slice_name: chart.slice_name.clone(),
                    }),
                });
            }
        }

        Ok(DashboardLayout { nodes })
    }
}

/// The position_json tree of a dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardLayout {
    nodes: Vec<LayoutNode>,
}

impl DashboardLayout {
    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes(&self) -> &[LayoutNode] {
        &self.nodes
    }

    /// Chart ids in row order, left to right.
    pub fn chart_ids(&self) -> Vec<i64> {
        self.nodes
            .iter()
            .filter_map(|n| match &n.meta {
                Some(NodeMeta::Chart { chart_id, .. }) => Some(*chart_id),
                _ => None,
            })
            .collect()
    }

    pub fn to_value(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(VERSION_KEY.to_string(), Value::String(VERSION.to_string()));
        for node in &self.nodes {
            // LayoutNode only holds strings, integers and vectors of those
            let value = serde_json::to_value(node).unwrap_or(Value::Null);
            doc.insert(node.id.clone(), value);
        }
        Value::Object(doc)
    }

    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }
}

/// Pie, table and bar chart ids for the standard cross-filter grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartTrio {
    pub pie: i64,
    pub table: i64,
    pub bar: i64,
}

impl ChartTrio {
    /// Positional mapping: `[pie, table, bar, ..]`.
    pub fn from_ordered(ids: &[i64]) -> Result<Self, LayoutError> {
        match ids {
            [pie, table, bar, ..] => Ok(Self {
                pie: *pie,
                table: *table,
                bar: *bar,
            }),
            _ => Err(LayoutError::NotEnoughCharts {
                needed: 3,
                found: ids.len(),
            }),
        }
    }
}

/// Pie and bar side by side, table underneath at full width.
pub fn split_grid(trio: ChartTrio) -> Result<DashboardLayout, LayoutError> {
    let half = GRID_COLUMNS / 2;
    LayoutBuilder::new()
        .row(
            "ROW-1",
            vec![
                ChartSlot::new("pie", trio.pie, half),
                ChartSlot::new("bar", trio.bar, half),
            ],
        )
        .row("ROW-2", vec![ChartSlot::new("table", trio.table, GRID_COLUMNS)])
        .build()
}

/// One full-width row per chart, each labelled with its slice name.
pub fn stacked(charts: &[(&str, i64, &str)]) -> Result<DashboardLayout, LayoutError> {
    charts
        .iter()
        .fold(LayoutBuilder::new(), |builder, (key, id, name)| {
            builder.row(
                format!("ROW-{key}"),
                vec![ChartSlot::new(*key, *id, GRID_COLUMNS).with_slice_name(*name)],
            )
        })
        .build()
}
