use crate::domain::guest_token::{Department, default_departments};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub superset: SupersetSettings,
    #[serde(default)]
    pub embed: EmbedSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default = "default_departments")]
    pub departments: Vec<Department>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SupersetSettings {
    #[serde(default = "default_superset_url")]
    pub url: String,
    #[serde(default = "default_admin")]
    pub username: String,
    #[serde(default = "default_admin")]
    pub password: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Pause between dependent API calls, giving Superset time to settle
    #[serde(default = "default_pacing_ms")]
    pub pacing_ms: u64,
}

impl SupersetSettings {
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for SupersetSettings {
    fn default() -> Self {
        Self {
            url: default_superset_url(),
            username: default_admin(),
            password: default_admin(),
            provider: default_provider(),
            request_timeout_secs: default_request_timeout_secs(),
            pacing_ms: default_pacing_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbedSettings {
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Numeric id used in the embedded URL path
    #[serde(default = "default_embed_dashboard_id")]
    pub dashboard_id: String,
    /// UUID of the dashboard's embedded configuration
    #[serde(default = "default_embedded_uuid")]
    pub embedded_uuid: String,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for EmbedSettings {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            dashboard_id: default_embed_dashboard_id(),
            embedded_uuid: default_embedded_uuid(),
            audience: default_audience(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origin: default_allowed_origin(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrowserSettings {
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
}

impl BrowserSettings {
    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_true(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            settle_secs: default_settle_secs(),
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

fn default_superset_url() -> String {
    "http://localhost:8088".to_string()
}

fn default_admin() -> String {
    "admin".to_string()
}

fn default_provider() -> String {
    "db".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_pacing_ms() -> u64 {
    1000
}

fn default_secret_key() -> String {
    "TEST_NON_DEV_SECRET".to_string()
}

fn default_embed_dashboard_id() -> String {
    "12".to_string()
}

fn default_embedded_uuid() -> String {
    "7aaabc03-2c47-4540-8233-f22bbdb2cc81".to_string()
}

fn default_audience() -> String {
    "http://superset:8088/".to_string()
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_bind() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_allowed_origin() -> String {
    "http://localhost:4200".to_string()
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    1400
}

fn default_window_height() -> u32 {
    900
}

fn default_settle_secs() -> u64 {
    8
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Layered configuration: `config/superset.*` if present, then `extra`,
/// then `SUPERSET_TOOLKIT_<SECTION>__<KEY>` environment variables.
pub fn load_app_config(extra: Option<&Path>) -> anyhow::Result<AppConfig> {
    layered(extra, environment())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("SUPERSET_TOOLKIT")
        .prefix_separator("_")
        .separator("__")
}

fn layered(extra: Option<&Path>, env: config::Environment) -> anyhow::Result<AppConfig> {
    let mut builder = config::Config::builder()
        .add_source(config::File::with_name("config/superset").required(false));

    if let Some(path) = extra {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder.add_source(env).build()?;
    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_local_superset() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.superset.base_url(), "http://localhost:8088");
        assert_eq!(config.superset.provider, "db");
        assert_eq!(config.superset.pacing(), Duration::from_secs(1));
        assert_eq!(config.embed.token_ttl_hours, 24);
        assert_eq!(config.server.bind, "0.0.0.0:3001");
        assert!(config.browser.headless);
        assert_eq!(config.departments.len(), 3);
    }

    #[test]
    fn test_file_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[superset]
url = "https://bi.example.com/"
pacing_ms = 0

[embed]
secret_key = "s3cret"

[[departments]]
id = 7
name = "Ops"
expected_total = "¥1"
"#
        )
        .unwrap();

        let config = layered(Some(file.path()), environment().source(Some(config::Map::new()))).unwrap();
        assert_eq!(config.superset.base_url(), "https://bi.example.com");
        assert_eq!(config.superset.username, "admin");
        assert_eq!(config.superset.pacing_ms, 0);
        assert_eq!(config.embed.secret_key, "s3cret");
        assert_eq!(config.embed.dashboard_id, "12");
        assert_eq!(config.departments.len(), 1);
        assert_eq!(config.departments[0].name, "Ops");
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[superset]\nurl = \"https://bi.example.com\"\npacing_ms = 500").unwrap();

        let vars: config::Map<String, String> = [
            ("SUPERSET_TOOLKIT_SUPERSET__URL", "http://env:1"),
            ("SUPERSET_TOOLKIT_SUPERSET__PACING_MS", "7"),
            ("SUPERSET_TOOLKIT_BROWSER__HEADLESS", "false"),
            ("OTHER_BROWSER__HEADLESS", "true"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = layered(Some(file.path()), environment().source(Some(vars))).unwrap();
        assert_eq!(config.superset.base_url(), "http://env:1");
        assert_eq!(config.superset.pacing_ms, 7);
        assert!(!config.browser.headless);
        assert_eq!(config.superset.username, "admin");
    }
}
