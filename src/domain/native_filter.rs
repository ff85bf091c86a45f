// Native (dashboard-level) filter definitions
use serde::Serialize;
use serde_json::{Value, json};

/// A time-range native filter bound to one dataset column.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeFilter {
    pub id: String,
    pub name: String,
    pub dataset_id: i64,
    pub column: String,
    pub default_time_range: Option<String>,
    pub charts_in_scope: Vec<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FilterDocument<'a> {
    id: &'a str,
    name: &'a str,
    filter_type: &'static str,
    targets: Value,
    default_data_mask: Value,
    control_values: Value,
    scope: Value,
    cascade_parent_ids: Vec<String>,
    #[serde(rename = "type")]
    kind: &'static str,
    description: &'static str,
    charts_in_scope: &'a [i64],
    tabs_in_scope: Vec<String>,
    is_instant: bool,
}

impl NativeFilter {
    pub fn time_range(dataset_id: i64, column: impl Into<String>) -> Self {
        Self {
            id: "NATIVE_FILTER-1".to_string(),
            name: "Period".to_string(),
            dataset_id,
            column: column.into(),
            default_time_range: None,
            charts_in_scope: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_default(mut self, range: impl Into<String>) -> Self {
        self.default_time_range = Some(range.into());
        self
    }

    pub fn scoped_to(mut self, chart_ids: Vec<i64>) -> Self {
        self.charts_in_scope = chart_ids;
        self
    }

    pub fn to_value(&self) -> Value {
        let filter_state = match &self.default_time_range {
            Some(range) => json!({ "value": range }),
            None => json!({}),
        };
        let doc = FilterDocument {
            id: &self.id,
            name: &self.name,
            filter_type: "filter_time",
            targets: json!([{ "datasetId": self.dataset_id, "column": { "name": self.column } }]),
            default_data_mask: json!({
                "extraFormData": {},
                "filterState": filter_state,
                "ownState": {}
            }),
            control_values: json!({
                "enableEmptyFilter": false,
                "defaultToFirstItem": false,
                "multiSelect": false,
                "searchAllOptions": false,
                "inverseSelection": false
            }),
            scope: json!({ "rootPath": ["ROOT_ID"], "excluded": [] }),
            cascade_parent_ids: Vec::new(),
            kind: "NATIVE_FILTER",
            description: "",
            charts_in_scope: &self.charts_in_scope,
            tabs_in_scope: Vec::new(),
            is_instant: true,
        };
        serde_json::to_value(doc).unwrap_or(Value::Null)
    }
}
