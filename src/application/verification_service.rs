// Verification service - Scripted browser checks of rendered dashboards
use crate::application::provisioning_service::{ORDER_TABLE, SALES_PIE};
use crate::domain::dataset::ORDER_STATUSES;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum BrowserStep {
    Goto(String),
    Fill { selector: String, value: String },
    Click(String),
    Wait(Duration),
    Screenshot(PathBuf),
    /// Click every element matching `selector`, waiting `settle` and taking
    /// `{screenshot_prefix}-{n}.png` after each click.
    ClickEach {
        selector: String,
        settle: Duration,
        screenshot_prefix: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationPlan {
    pub name: String,
    pub steps: Vec<BrowserStep>,
    pub expect_text: Vec<String>,
    pub forbid_text: Vec<String>,
    pub expect_selectors: Vec<String>,
}

/// What the page looked like once every step ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSnapshot {
    pub title: String,
    pub body_text: String,
    pub html: String,
    /// Subset of the plan's `expect_selectors` found on the page
    pub present_selectors: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    /// Console output as `[level] text`, in arrival order
    pub console: Vec<String>,
    /// Requests that never completed, as `url (reason)`
    pub failed_requests: Vec<String>,
}

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn run(&self, plan: &VerificationPlan) -> anyhow::Result<PageSnapshot>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub description: String,
    pub passed: bool,
}

#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub plan: String,
    pub title: String,
    pub checks: Vec<CheckResult>,
    pub screenshots: Vec<PathBuf>,
    pub console: Vec<String>,
    pub failed_requests: Vec<String>,
}

impl VerificationReport {
    /// A run that checked nothing proves nothing and does not pass.
    pub fn passed(&self) -> bool {
        !self.checks.is_empty() && self.checks.iter().all(|c| c.passed)
    }
}

/// Text checks match against both the visible text and the raw HTML, so
/// messages rendered into hidden nodes are still caught.
pub fn evaluate(plan: &VerificationPlan, snapshot: &PageSnapshot) -> Vec<CheckResult> {
    let contains = |needle: &str| snapshot.body_text.contains(needle) || snapshot.html.contains(needle);
    let mut checks = Vec::new();

    for text in &plan.expect_text {
        checks.push(CheckResult {
            description: format!("text '{text}' is shown"),
            passed: contains(text),
        });
    }
    for text in &plan.forbid_text {
        checks.push(CheckResult {
            description: format!("text '{text}' is absent"),
            passed: !contains(text),
        });
    }
    for selector in &plan.expect_selectors {
        checks.push(CheckResult {
            description: format!("element {selector} exists"),
            passed: snapshot.present_selectors.contains(selector),
        });
    }
    checks
}

pub struct LoginForm<'a> {
    pub base_url: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

/// Chart titles and status labels of the provisioned cross-filter dashboard.
pub fn default_dashboard_text() -> Vec<String> {
    [SALES_PIE, ORDER_TABLE]
        .into_iter()
        .chain(ORDER_STATUSES)
        .map(str::to_string)
        .collect()
}

/// Log in through the form, open the dashboard and screenshot it. Without
/// explicit `expect_text` the page must show [`default_dashboard_text`].
pub fn dashboard_plan(
    login: &LoginForm<'_>,
    dashboard_id: i64,
    expect_text: Vec<String>,
    settle: Duration,
    screenshot_dir: &Path,
) -> VerificationPlan {
    let base = login.base_url.trim_end_matches('/');
    let expect_text = if expect_text.is_empty() {
        default_dashboard_text()
    } else {
        expect_text
    };
    VerificationPlan {
        name: format!("dashboard {dashboard_id}"),
        steps: vec![
            BrowserStep::Goto(format!("{base}/login/")),
            BrowserStep::Fill {
                selector: r#"input[name="username"]"#.to_string(),
                value: login.username.to_string(),
            },
            BrowserStep::Fill {
                selector: r#"input[name="password"]"#.to_string(),
                value: login.password.to_string(),
            },
            BrowserStep::Click(r#"button[type="submit"]"#.to_string()),
            BrowserStep::Wait(Duration::from_secs(3)),
            BrowserStep::Goto(format!("{base}/superset/dashboard/{dashboard_id}/")),
            BrowserStep::Wait(settle),
            BrowserStep::Screenshot(screenshot_dir.join(format!("dashboard-{dashboard_id}-initial.png"))),
        ],
        expect_text,
        forbid_text: Vec::new(),
        expect_selectors: Vec::new(),
    }
}

/// A host page that frames the dashboard in `iframe#dashboard-iframe`.
pub fn embedded_plan(host_url: &str, settle: Duration, screenshot_dir: &Path) -> VerificationPlan {
    VerificationPlan {
        name: "embedded host page".to_string(),
        steps: vec![
            BrowserStep::Goto(host_url.to_string()),
            BrowserStep::Wait(settle),
            BrowserStep::Screenshot(screenshot_dir.join("embedded.png")),
        ],
        expect_text: Vec::new(),
        forbid_text: vec![
            "This page is intended to be embedded".to_string(),
            "You should call configure".to_string(),
        ],
        expect_selectors: vec!["iframe#dashboard-iframe".to_string()],
    }
}

/// The embedded URL opened straight, guest token in the query string.
pub fn direct_plan(embed_url: &str, settle: Duration, screenshot_dir: &Path) -> VerificationPlan {
    VerificationPlan {
        name: "direct embedded url".to_string(),
        steps: vec![
            BrowserStep::Goto(embed_url.to_string()),
            BrowserStep::Wait(settle),
            BrowserStep::Screenshot(screenshot_dir.join("direct-embedded.png")),
        ],
        expect_text: Vec::new(),
        forbid_text: vec!["This page is intended to be embedded".to_string()],
        expect_selectors: vec!["#app".to_string()],
    }
}

/// The host application: one screenshot per department tab.
pub fn app_plan(app_url: &str, settle: Duration, screenshot_dir: &Path) -> VerificationPlan {
    VerificationPlan {
        name: "host application".to_string(),
        steps: vec![
            BrowserStep::Goto(app_url.to_string()),
            BrowserStep::Wait(settle),
            BrowserStep::Screenshot(screenshot_dir.join("app-initial.png")),
            BrowserStep::ClickEach {
                selector: ".tab-button".to_string(),
                settle,
                screenshot_prefix: screenshot_dir.join("app-tab"),
            },
        ],
        expect_text: Vec::new(),
        forbid_text: Vec::new(),
        expect_selectors: vec!["#superset-dashboard".to_string()],
    }
}

#[derive(Clone)]
pub struct VerificationService {
    driver: Arc<dyn BrowserDriver>,
}

impl VerificationService {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }

    pub async fn verify(&self, plan: &VerificationPlan) -> anyhow::Result<VerificationReport> {
        tracing::info!("Running browser check: {} ({} steps)", plan.name, plan.steps.len());
        let snapshot = self.driver.run(plan).await?;
        let checks = evaluate(plan, &snapshot);
        for check in checks.iter().filter(|c| !c.passed) {
            tracing::warn!("Check failed: {}", check.description);
        }
        if !snapshot.failed_requests.is_empty() {
            tracing::warn!("{} requests failed while loading {}", snapshot.failed_requests.len(), plan.name);
        }
        Ok(VerificationReport {
            plan: plan.name.clone(),
            title: snapshot.title,
            checks,
            screenshots: snapshot.screenshots,
            console: snapshot.console,
            failed_requests: snapshot.failed_requests,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct CannedDriver {
        snapshot: PageSnapshot,
        plans: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BrowserDriver for CannedDriver {
        async fn run(&self, plan: &VerificationPlan) -> anyhow::Result<PageSnapshot> {
            self.plans.lock().unwrap().push(plan.name.clone());
            Ok(self.snapshot.clone())
        }
    }

    #[test]
    fn test_dashboard_plan_logs_in_first() {
        let login = LoginForm {
            base_url: "http://localhost:8088/",
            username: "admin",
            password: "secret",
        };
        let plan = dashboard_plan(&login, 13, vec![], Duration::from_secs(8), Path::new("shots"));

        assert_eq!(plan.steps[0], BrowserStep::Goto("http://localhost:8088/login/".to_string()));
        assert_eq!(
            plan.steps[2],
            BrowserStep::Fill {
                selector: r#"input[name="password"]"#.to_string(),
                value: "secret".to_string()
            }
        );
        assert_eq!(
            plan.steps[5],
            BrowserStep::Goto("http://localhost:8088/superset/dashboard/13/".to_string())
        );
        assert_eq!(
            plan.steps.last(),
            Some(&BrowserStep::Screenshot(PathBuf::from("shots/dashboard-13-initial.png")))
        );
    }

    #[test]
    fn test_dashboard_plan_defaults_to_provisioned_text() {
        let login = LoginForm {
            base_url: "http://localhost:8088",
            username: "admin",
            password: "admin",
        };
        let plan = dashboard_plan(&login, 13, vec![], Duration::ZERO, Path::new("."));
        assert_eq!(
            plan.expect_text,
            ["Sales by Status (Pie)", "Order Details", "New", "In Progress", "Delayed"]
        );

        let error_page = PageSnapshot {
            title: "500 Internal Server Error".to_string(),
            body_text: "500 Internal Server Error".to_string(),
            ..PageSnapshot::default()
        };
        let checks = evaluate(&plan, &error_page);
        assert_eq!(checks.len(), 5);
        assert!(checks.iter().all(|c| !c.passed));

        let plan = dashboard_plan(&login, 13, vec!["Defect Rate".to_string()], Duration::ZERO, Path::new("."));
        assert_eq!(plan.expect_text, ["Defect Rate"]);
    }

    #[test]
    fn test_report_without_checks_fails() {
        let report = VerificationReport {
            plan: "empty".to_string(),
            title: String::new(),
            checks: Vec::new(),
            screenshots: Vec::new(),
            console: Vec::new(),
            failed_requests: Vec::new(),
        };
        assert!(!report.passed());
    }

    #[test]
    fn test_embedded_warning_fails_check() {
        let plan = embedded_plan("http://localhost:8000/test-embedded.html", Duration::ZERO, Path::new("."));
        let snapshot = PageSnapshot {
            html: "<div>This page is intended to be embedded in an iframe</div>".to_string(),
            present_selectors: vec!["iframe#dashboard-iframe".to_string()],
            ..PageSnapshot::default()
        };

        let checks = evaluate(&plan, &snapshot);
        assert_eq!(checks.len(), 3);
        assert!(!checks[0].passed);
        assert!(checks[1].passed);
        assert!(checks[2].passed);
    }

    #[tokio::test]
    async fn test_verify_reports_missing_selector() {
        let driver = Arc::new(CannedDriver {
            snapshot: PageSnapshot {
                title: "Superset".to_string(),
                body_text: "Loading".to_string(),
                console: vec!["[error] Guest token expired".to_string()],
                failed_requests: vec!["http://localhost:8088/api/v1/me/ (net::ERR_FAILED)".to_string()],
                ..PageSnapshot::default()
            },
            plans: Mutex::new(Vec::new()),
        });
        let service = VerificationService::new(driver.clone());

        let plan = direct_plan("http://localhost:8088/dashboard/12/embedded?guest_token=t", Duration::ZERO, Path::new("."));
        let report = service.verify(&plan).await.unwrap();
        assert!(!report.passed());
        assert_eq!(report.title, "Superset");
        assert_eq!(report.console, ["[error] Guest token expired"]);
        assert_eq!(report.failed_requests, ["http://localhost:8088/api/v1/me/ (net::ERR_FAILED)"]);
        assert_eq!(driver.plans.lock().unwrap().as_slice(), ["direct embedded url"]);
    }

    #[tokio::test]
    async fn test_app_plan_passes_with_dashboard_container() {
        let driver = Arc::new(CannedDriver {
            snapshot: PageSnapshot {
                present_selectors: vec!["#superset-dashboard".to_string()],
                ..PageSnapshot::default()
            },
            plans: Mutex::new(Vec::new()),
        });
        let plan = app_plan("http://localhost:4200", Duration::ZERO, Path::new("."));
        assert!(matches!(plan.steps[3], BrowserStep::ClickEach { .. }));

        let report = VerificationService::new(driver).verify(&plan).await.unwrap();
        assert!(report.passed());
    }
}
