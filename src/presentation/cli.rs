// Command line definition
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Provision, inspect and embed Superset dashboards
#[derive(Parser)]
#[command(name = "superset-toolkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Extra configuration file layered over config/superset.toml
    #[arg(long, global = true, env = "SUPERSET_TOOLKIT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List datasets, charts and dashboards
    Status,

    /// List dashboards with their URLs
    Dashboards,

    /// Build a dashboard from scratch
    #[command(subcommand)]
    Provision(ProvisionCommands),

    /// Rewrite a dashboard's layout
    #[command(subcommand)]
    Layout(LayoutCommands),

    /// Manage native filters
    #[command(subcommand)]
    Filter(FilterCommands),

    /// Manage charts
    #[command(subcommand)]
    Chart(ChartCommands),

    /// Delete charts and datasets
    #[command(subcommand)]
    Cleanup(CleanupCommands),

    /// Print guest tokens and embed URLs
    Token {
        /// Only this department (default: every configured department)
        #[arg(long)]
        department: Option<i64>,

        /// Guest username
        #[arg(long)]
        username: Option<String>,
    },

    /// Run the embedding backend
    Serve {
        /// Listen address, overrides server.bind
        #[arg(long)]
        bind: Option<String>,
    },

    /// Check rendered pages in a headless browser
    #[command(subcommand)]
    Verify(VerifyCommands),
}

#[derive(Subcommand)]
pub enum ProvisionCommands {
    /// Orders pie + detail table with cross filtering and a period filter
    CrossFilter,

    /// Product defect pie, table and bar in a split grid
    Defect,
}

#[derive(Subcommand)]
pub enum LayoutCommands {
    /// Place the three most recent charts as pie, table, bar
    AddRecent {
        dashboard_id: i64,
    },

    /// Rebuild the grid from the charts on the dashboard
    Fix {
        dashboard_id: i64,
    },

    /// Place explicit charts
    Set {
        dashboard_id: i64,

        #[arg(long)]
        pie: i64,

        #[arg(long)]
        table: i64,

        #[arg(long)]
        bar: i64,
    },
}

#[derive(Subcommand)]
pub enum FilterCommands {
    /// Add a time-range filter, replacing existing native filters
    AddTime {
        dashboard_id: i64,

        /// Dataset the filter targets
        #[arg(long)]
        dataset: i64,

        /// Temporal column
        #[arg(long, default_value = "test_date")]
        column: String,

        #[arg(long, default_value = "Period")]
        name: String,

        /// Initial range, e.g. "Last 30 days"
        #[arg(long)]
        default_range: Option<String>,

        /// Charts in scope (comma separated)
        #[arg(long, value_delimiter = ',')]
        charts: Vec<i64>,
    },
}

#[derive(Subcommand)]
pub enum ChartCommands {
    /// Replace the bar chart of a split-grid dashboard
    RecreateBar {
        dashboard_id: i64,

        #[arg(long)]
        dataset: i64,

        #[arg(long)]
        pie: i64,

        #[arg(long)]
        table: i64,

        /// Chart to delete first
        #[arg(long)]
        replace: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum CleanupCommands {
    /// Delete every chart, then every dataset
    All,

    /// Delete specific charts
    Charts {
        /// Chart ids (comma separated)
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
pub enum VerifyCommands {
    /// Log in and screenshot a dashboard
    Dashboard {
        dashboard_id: i64,

        /// Text that must appear (repeatable)
        #[arg(long)]
        expect: Vec<String>,
    },

    /// Host page framing the embedded dashboard
    Embedded {
        #[arg(long, default_value = "http://localhost:8000/test-embedded.html")]
        url: String,
    },

    /// Embedded URL opened directly with a fresh guest token
    Direct {
        #[arg(long, default_value_t = 101)]
        department: i64,
    },

    /// Host application with department tabs
    App {
        #[arg(long, default_value = "http://localhost:4200")]
        url: String,
    },
}
