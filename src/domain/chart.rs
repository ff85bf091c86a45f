// Chart (slice) domain model and visualization params
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChartSummary {
    pub id: i64,
    pub slice_name: String,
    #[serde(default)]
    pub viz_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewChart {
    pub slice_name: String,
    pub viz_type: String,
    pub datasource_id: i64,
    pub datasource_type: String,
    /// Serialized form data.
    pub params: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PieMetric {
    Count,
    Sum { column: String },
}

impl PieMetric {
    fn to_value(&self) -> Value {
        match self {
            PieMetric::Count => Value::String("count".to_string()),
            PieMetric::Sum { column } => json!({
                "expressionType": "SIMPLE",
                "column": { "column_name": column, "type": "NUMERIC" },
                "aggregate": "SUM",
                "label": format!("SUM({column})")
            }),
        }
    }
}

/// Builds a chart creation payload: `datasource` and `viz_type` are filled
/// in from the chart itself, everything else comes from `params`.
fn chart(slice_name: &str, viz_type: &str, dataset_id: i64, params: Value) -> NewChart {
    let mut form = Map::new();
    form.insert("datasource".to_string(), Value::String(format!("{dataset_id}__table")));
    form.insert("viz_type".to_string(), Value::String(viz_type.to_string()));
    if let Value::Object(rest) = params {
        form.extend(rest);
    }
    NewChart {
        slice_name: slice_name.to_string(),
        viz_type: viz_type.to_string(),
        datasource_id: dataset_id,
        datasource_type: "table".to_string(),
        params: Value::Object(form).to_string(),
    }
}

pub fn pie_chart(slice_name: &str, dataset_id: i64, group_by: &str, metric: PieMetric) -> NewChart {
    chart(
        slice_name,
        "pie",
        dataset_id,
        json!({
            "groupby": [group_by],
            "metric": metric.to_value(),
            "adhoc_filters": [],
            "row_limit": 10000,
            "color_scheme": "supersetColors",
            "show_labels": true,
            "show_legend": true,
            "label_type": "key_value",
            "number_format": "SMART_NUMBER",
            "date_format": "smart_date",
            "show_labels_threshold": 5,
            "sort_by_metric": true
        }),
    )
}

/// Raw-mode table, newest `order_by` first.
pub fn table_chart(
    slice_name: &str,
    dataset_id: i64,
    columns: &[&str],
    order_by: &str,
    row_limit: u32,
) -> NewChart {
    chart(
        slice_name,
        "table",
        dataset_id,
        json!({
            "query_mode": "raw",
            "groupby": [],
            "all_columns": columns,
            "adhoc_filters": [],
            "order_by_cols": [[order_by, false]],
            "row_limit": row_limit,
            "table_timestamp_format": "smart_date",
            "show_cell_bars": true,
            "color_pn": true
        }),
    )
}

/// Counts per `group_by`, broken down by `series` (the `bar` viz).
pub fn bar_chart(
    slice_name: &str,
    dataset_id: i64,
    group_by: &str,
    series: &str,
    x_label: &str,
    y_label: &str,
) -> NewChart {
    chart(
        slice_name,
        "bar",
        dataset_id,
        json!({
            "metrics": ["count"],
            "groupby": [group_by],
            "columns": [series],
            "row_limit": 10000,
            "show_legend": true,
            "y_axis_format": ",d",
            "x_axis_label": x_label,
            "y_axis_label": y_label
        }),
    )
}

/// Legacy distribution bar chart.
pub fn distribution_bar_chart(slice_name: &str, dataset_id: i64, group_by: &str, series: &str) -> NewChart {
    chart(
        slice_name,
        "dist_bar",
        dataset_id,
        json!({
            "groupby": [group_by],
            "columns": [series],
            "metrics": ["count"],
            "row_limit": 10000
        }),
    )
}
