// Dashboard domain model
use super::layout::DashboardLayout;
use super::native_filter::NativeFilter;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DashboardSummary {
    pub id: i64,
    pub dashboard_title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardDetail {
    pub id: i64,
    pub dashboard_title: String,
    #[serde(default, deserialize_with = "embedded_json")]
    pub position_json: Option<Value>,
    #[serde(default, deserialize_with = "embedded_json")]
    pub json_metadata: Option<Value>,
}

impl DashboardDetail {
    pub fn metadata(&self) -> anyhow::Result<DashboardMetadata> {
        match &self.json_metadata {
            Some(value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(DashboardMetadata::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDashboard {
    pub dashboard_title: String,
    pub published: bool,
}

impl NewDashboard {
    pub fn published(title: impl Into<String>) -> Self {
        Self {
            dashboard_title: title.into(),
            published: true,
        }
    }
}

/// PUT body for a dashboard. Both documents travel as JSON strings.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DashboardUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_metadata: Option<String>,
}

impl DashboardUpdate {
    pub fn layout(layout: &DashboardLayout, metadata: &DashboardMetadata) -> Self {
        Self {
            position_json: Some(layout.to_json_string()),
            json_metadata: Some(metadata.to_json_string()),
        }
    }

    pub fn metadata_only(metadata: &DashboardMetadata) -> Self {
        Self {
            position_json: None,
            json_metadata: Some(metadata.to_json_string()),
        }
    }
}

const CROSS_FILTERS_KEY: &str = "cross_filters_enabled";
const NATIVE_FILTERS_KEY: &str = "native_filter_configuration";

/// Decoded json_metadata. Keys this crate does not model are carried in
/// `extra` so a read-modify-write keeps them. A modelled key whose stored
/// value has an unexpected shape (`null`, a string, ...) also stays in
/// `extra` untouched until the typed field is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardMetadata {
    pub cross_filters_enabled: Option<bool>,
    pub native_filter_configuration: Option<Vec<Value>>,
    pub extra: Map<String, Value>,
}

impl<'de> Deserialize<'de> for DashboardMetadata {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut extra = Map::<String, Value>::deserialize(deserializer)?;
        let cross_filters_enabled = match extra.get(CROSS_FILTERS_KEY) {
            Some(Value::Bool(enabled)) => {
                let enabled = *enabled;
                extra.remove(CROSS_FILTERS_KEY);
                Some(enabled)
            }
            _ => None,
        };
        let native_filter_configuration = match extra.get(NATIVE_FILTERS_KEY) {
            Some(Value::Array(_)) => match extra.remove(NATIVE_FILTERS_KEY) {
                Some(Value::Array(filters)) => Some(filters),
                _ => None,
            },
            _ => None,
        };
        Ok(Self {
            cross_filters_enabled,
            native_filter_configuration,
            extra,
        })
    }
}

/// Typed fields win over a raw value of the same key in `extra`.
impl Serialize for DashboardMetadata {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut doc = self.extra.clone();
        if let Some(enabled) = self.cross_filters_enabled {
            doc.insert(CROSS_FILTERS_KEY.to_string(), Value::Bool(enabled));
        }
        if let Some(filters) = &self.native_filter_configuration {
            doc.insert(NATIVE_FILTERS_KEY.to_string(), Value::Array(filters.clone()));
        }
        doc.serialize(serializer)
    }
}

impl DashboardMetadata {
    /// Cross filters on, native filters cleared.
    pub fn cross_filter_reset() -> Self {
        Self {
            cross_filters_enabled: Some(true),
            native_filter_configuration: Some(Vec::new()),
            extra: Map::new(),
        }
    }

    pub fn cross_filters_only() -> Self {
        Self {
            cross_filters_enabled: Some(true),
            ..Self::default()
        }
    }

    /// The full settings block Superset writes for a freshly saved dashboard.
    pub fn fresh_dashboard() -> Self {
        let extra = match json!({
            "timed_refresh_immune_slices": [],
            "expanded_slices": {},
            "refresh_frequency": 0,
            "default_filters": "{}",
            "color_scheme": "",
            "label_colors": {},
            "shared_label_colors": {},
        }) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            cross_filters_enabled: Some(true),
            native_filter_configuration: None,
            extra,
        }
    }

    pub fn set_native_filters(&mut self, filters: &[NativeFilter]) {
        self.native_filter_configuration = Some(filters.iter().map(NativeFilter::to_value).collect());
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Superset returns position_json/json_metadata either as a JSON string,
/// an object, or null.
fn embedded_json<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => serde_json::from_str(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(other) => Ok(Some(other)),
    }
}

pub fn dashboard_url(base_url: &str, dashboard_id: i64) -> String {
    format!("{}/superset/dashboard/{}/", base_url.trim_end_matches('/'), dashboard_id)
}
