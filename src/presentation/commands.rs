// Command dispatch - wires configuration, adapters and services per subcommand
use crate::application::cleanup_service::{CleanupReport, CleanupService};
use crate::application::guest_token_service::GuestTokenService;
use crate::application::inventory_service::InventoryService;
use crate::application::layout_service::LayoutService;
use crate::application::provisioning_service::{BarChartRebuild, ProvisionOutcome, ProvisioningService};
use crate::application::superset_api::SupersetApi;
use crate::application::verification_service::{
    LoginForm, VerificationPlan, VerificationService, app_plan, dashboard_plan, direct_plan, embedded_plan,
};
use crate::domain::dashboard::dashboard_url;
use crate::domain::layout::ChartTrio;
use crate::domain::native_filter::NativeFilter;
use crate::infrastructure::browser::ChromiumDriver;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::superset_client::SupersetClient;
use crate::infrastructure::token_signer::HmacTokenSigner;
use crate::presentation::app_state::AppState;
use crate::presentation::cli::{
    ChartCommands, CleanupCommands, Commands, FilterCommands, LayoutCommands, ProvisionCommands, VerifyCommands,
};
use crate::presentation::routes::router;
use anyhow::{Context, bail};
use std::net::SocketAddr;
use std::sync::Arc;

pub async fn execute(command: Commands, config: AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::Token { department, username } => print_tokens(&config, department, username.as_deref()),
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::Verify(cmd) => verify(cmd, &config).await,
        Commands::Status => {
            let inventory = InventoryService::new(connect(&config).await?).snapshot().await;
            println!("Datasets: {}", inventory.datasets.len());
            for ds in &inventory.datasets {
                let sql: String = ds.sql.as_deref().unwrap_or("N/A").chars().take(50).collect();
                println!("  - {} (ID: {}, SQL: {}...)", ds.table_name, ds.id, sql.trim());
            }
            println!("Charts: {}", inventory.charts.len());
            for chart in &inventory.charts {
                println!(
                    "  - {} (ID: {}, Type: {})",
                    chart.slice_name,
                    chart.id,
                    chart.viz_type.as_deref().unwrap_or("?")
                );
            }
            println!("Dashboards: {}", inventory.dashboards.len());
            for dashboard in &inventory.dashboards {
                println!("  - {} (ID: {})", dashboard.dashboard_title, dashboard.id);
            }
            if !inventory.errors.is_empty() {
                bail!("Some listings failed: {}", inventory.errors.join("; "));
            }
            Ok(())
        }
        Commands::Dashboards => {
            let api = connect(&config).await?;
            let dashboards = InventoryService::new(api.clone()).dashboards().await?;
            for dashboard in dashboards {
                println!("{:>5}  {}", dashboard.id, dashboard.dashboard_title);
                println!("       {}", dashboard_url(api.base_url(), dashboard.id));
            }
            Ok(())
        }
        Commands::Provision(cmd) => {
            let service = ProvisioningService::new(connect(&config).await?, config.superset.pacing());
            let outcome = match cmd {
                ProvisionCommands::CrossFilter => service.cross_filter_dashboard().await?,
                ProvisionCommands::Defect => service.defect_dashboard(chrono::Utc::now().timestamp()).await?,
            };
            print_outcome(&outcome);
            Ok(())
        }
        Commands::Layout(cmd) => {
            let api = connect(&config).await?;
            let service = LayoutService::new(api.clone());
            let (dashboard_id, trio) = match cmd {
                LayoutCommands::AddRecent { dashboard_id } => {
                    (dashboard_id, service.add_recent_charts(dashboard_id).await?)
                }
                LayoutCommands::Fix { dashboard_id } => (dashboard_id, service.fix_layout(dashboard_id).await?),
                LayoutCommands::Set {
                    dashboard_id,
                    pie,
                    table,
                    bar,
                } => {
                    let trio = ChartTrio { pie, table, bar };
                    service.set_layout(dashboard_id, trio).await?;
                    (dashboard_id, trio)
                }
            };
            println!("Layout updated: pie={} table={} bar={}", trio.pie, trio.table, trio.bar);
            println!("{}", dashboard_url(api.base_url(), dashboard_id));
            Ok(())
        }
        Commands::Filter(FilterCommands::AddTime {
            dashboard_id,
            dataset,
            column,
            name,
            default_range,
            charts,
        }) => {
            let api = connect(&config).await?;
            let mut filter = NativeFilter::time_range(dataset, column).named(name).scoped_to(charts);
            if let Some(range) = default_range {
                filter = filter.with_default(range);
            }
            let metadata = LayoutService::new(api.clone()).add_time_filter(dashboard_id, filter).await?;
            println!(
                "Native filters on dashboard {}: {}",
                dashboard_id,
                metadata.native_filter_configuration.as_ref().map_or(0, Vec::len)
            );
            println!("{}", dashboard_url(api.base_url(), dashboard_id));
            Ok(())
        }
        Commands::Chart(ChartCommands::RecreateBar {
            dashboard_id,
            dataset,
            pie,
            table,
            replace,
        }) => {
            let api = connect(&config).await?;
            let service = ProvisioningService::new(api.clone(), config.superset.pacing());
            let bar_id = service
                .recreate_bar_chart(&BarChartRebuild {
                    dashboard_id,
                    dataset_id: dataset,
                    pie_chart_id: pie,
                    table_chart_id: table,
                    replaces: replace,
                })
                .await?;
            println!("Bar chart {bar_id} placed on dashboard {dashboard_id}");
            println!("{}", dashboard_url(api.base_url(), dashboard_id));
            Ok(())
        }
        Commands::Cleanup(cmd) => {
            // Superset needs a moment between deletes
            let pacing = config.superset.pacing() / 5;
            let service = CleanupService::new(connect(&config).await?, pacing);
            match cmd {
                CleanupCommands::All => {
                    print_report("charts", &service.delete_all_charts().await?);
                    print_report("datasets", &service.delete_all_datasets().await?);
                }
                CleanupCommands::Charts { ids } => print_report("charts", &service.delete_charts(&ids).await),
            }
            Ok(())
        }
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<Arc<dyn SupersetApi>> {
    let client = SupersetClient::login(&config.superset)
        .await
        .with_context(|| format!("Failed to log in to {}", config.superset.base_url()))?;
    Ok(Arc::new(client))
}

fn guest_token_service(config: &AppConfig) -> GuestTokenService {
    GuestTokenService::new(
        Arc::new(HmacTokenSigner::new(&config.embed.secret_key)),
        config.embed.clone(),
        config.superset.base_url(),
    )
}

fn print_tokens(config: &AppConfig, department: Option<i64>, username: Option<&str>) -> anyhow::Result<()> {
    let service = guest_token_service(config);
    let now = chrono::Utc::now().timestamp();

    let ids: Vec<(i64, String)> = match department {
        Some(id) => {
            let name = config
                .departments
                .iter()
                .find(|d| d.id == id)
                .map_or_else(|| format!("Department {id}"), |d| d.name.clone());
            vec![(id, name)]
        }
        None => config.departments.iter().map(|d| (d.id, d.name.clone())).collect(),
    };

    for (id, name) in ids {
        let issued = service.issue(id, username, now)?;
        println!("{} (department_id = {})", name, id);
        println!("  user:  {}", issued.username);
        println!("  token: {}", issued.token);
        println!("  url:   {}", issued.embed_url);
        println!();
    }
    Ok(())
}

async fn serve(config: AppConfig, bind: Option<String>) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        guest_tokens: guest_token_service(&config),
        departments: config.departments.clone(),
    });
    let app = router(state, &config.server)?;

    let bind = bind.unwrap_or(config.server.bind);
    let addr: SocketAddr = bind.parse().with_context(|| format!("Invalid bind address {bind}"))?;
    tracing::info!("Starting embedding backend on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

async fn verify(cmd: VerifyCommands, config: &AppConfig) -> anyhow::Result<()> {
    let browser = &config.browser;
    let dir = browser.screenshot_dir.as_path();
    let plan: VerificationPlan = match cmd {
        VerifyCommands::Dashboard { dashboard_id, expect } => {
            let login = LoginForm {
                base_url: config.superset.base_url(),
                username: &config.superset.username,
                password: &config.superset.password,
            };
            dashboard_plan(&login, dashboard_id, expect, browser.settle(), dir)
        }
        VerifyCommands::Embedded { url } => embedded_plan(&url, browser.settle(), dir),
        VerifyCommands::Direct { department } => {
            let issued = guest_token_service(config).issue(department, None, chrono::Utc::now().timestamp())?;
            direct_plan(&issued.embed_url, browser.settle(), dir)
        }
        VerifyCommands::App { url } => app_plan(&url, browser.settle(), dir),
    };

    let service = VerificationService::new(Arc::new(ChromiumDriver::new(browser.clone())));
    let report = service.verify(&plan).await?;

    println!("{}: page title \"{}\"", report.plan, report.title);
    for check in &report.checks {
        println!("  [{}] {}", if check.passed { "ok" } else { "FAIL" }, check.description);
    }
    for path in &report.screenshots {
        println!("  screenshot: {}", path.display());
    }
    if !report.console.is_empty() {
        println!("Console ({} messages):", report.console.len());
        for line in &report.console {
            println!("  {line}");
        }
    }
    if !report.failed_requests.is_empty() {
        println!("Failed requests ({}):", report.failed_requests.len());
        for line in &report.failed_requests {
            println!("  {line}");
        }
    }
    if !report.passed() {
        bail!("Browser check '{}' failed", report.plan);
    }
    Ok(())
}

fn print_outcome(outcome: &ProvisionOutcome) {
    println!("Dashboard {} created", outcome.dashboard_id);
    println!("  dataset: {}", outcome.dataset_id);
    println!("  charts:  {:?}", outcome.chart_ids);
    println!("  url:     {}", outcome.url);
    for warning in &outcome.warnings {
        println!("  warning: {warning}");
    }
}

fn print_report(kind: &str, report: &CleanupReport) {
    println!(
        "Deleted {} {}, {} failed",
        report.deleted.len(),
        kind,
        report.failed.len()
    );
    if !report.failed.is_empty() {
        println!("  failed ids: {:?}", report.failed);
    }
}
