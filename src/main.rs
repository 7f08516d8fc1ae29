use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use crate::admin::{AdminTable, Confirm, Notifier, StatusFilter, TransitionOutcome};
use crate::api::{DataApi, HttpDataApi};
use crate::config::Config;
use crate::dashboard::{SnapshotSurface, SurveillanceDashboard};
use crate::db::PgDoctorGateway;
use crate::selector::{Region, SelectorEvent};

mod admin;
mod aggregate;
mod api;
mod chat;
mod config;
mod dashboard;
mod db;
mod error;
mod models;
mod normalize;
mod render;
mod report;
mod selector;
mod server;

#[derive(Parser)]
#[command(name = "surveillance-desk")]
#[command(about = "Disease surveillance dashboard and doctor verification desk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import surveillance rows from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Run the surveillance data API
    Serve,
    /// Build the dashboard views from the data API and write a markdown report
    Dashboard {
        /// District name, or "all"
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        week: Option<i32>,
        #[arg(long)]
        chart_year: Option<i32>,
        #[arg(long)]
        regional_year: Option<i32>,
        #[arg(long)]
        heat_year: Option<i32>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
        /// Also dump the rendered views as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Ask the data API a question
    Chat { message: String },
    /// Doctor verification desk
    Doctors {
        #[command(subcommand)]
        command: DoctorCommands,
    },
}

#[derive(Subcommand)]
enum DoctorCommands {
    /// List applications with the current month's stats
    List {
        #[arg(long, default_value = "")]
        search: String,
        /// pending, approved, rejected or all
        #[arg(long, default_value = "all", value_parser = StatusFilter::parse)]
        status: StatusFilter,
        #[arg(long)]
        specialization: Option<String>,
    },
    /// Approve an application
    Approve {
        id: Uuid,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Reject an application
    Reject {
        id: Uuid,
        #[arg(long)]
        yes: bool,
    },
    /// Show one application
    View { id: Uuid },
}

struct StdinConfirm {
    assume_yes: bool,
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&mut self, message: &str) {
        info!("{message}");
        println!("{message}");
    }

    fn failure(&mut self, message: &str) {
        error!("{message}");
        eprintln!("{message}");
    }
}

async fn connect() -> anyhow::Result<PgPool> {
    let database_url = config::database_url()?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&connect().await?).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&connect().await?).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&connect().await?, &csv).await?;
            println!("Inserted {inserted} surveillance rows from {}.", csv.display());
        }
        Commands::Serve => {
            server::start_server(connect().await?, &config).await?;
        }
        Commands::Dashboard {
            region,
            year,
            week,
            chart_year,
            regional_year,
            heat_year,
            out,
            json,
        } => {
            let api = HttpDataApi::new(&config.data_api_url);
            let mut dashboard = SurveillanceDashboard::new(api, SnapshotSurface::default());
            dashboard
                .load()
                .await
                .with_context(|| format!("failed to load data from {}", config.data_api_url))?;
            if dashboard.records().is_empty() {
                println!("The data API returned no surveillance rows.");
            }

            let events = [
                region.map(|r| SelectorEvent::Region(Region::parse(&r))),
                year.map(SelectorEvent::Year),
                week.map(SelectorEvent::Week),
                chart_year.map(SelectorEvent::ChartYear),
                regional_year.map(SelectorEvent::RegionalYear),
                heat_year.map(SelectorEvent::HeatYear),
            ];
            for event in events.into_iter().flatten() {
                dashboard.select(event).await;
            }

            let report = report::build_report(
                dashboard.selectors(),
                dashboard.options(),
                dashboard.surface(),
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());

            if let Some(path) = json {
                let snapshot = serde_json::to_string_pretty(dashboard.surface())?;
                std::fs::write(&path, snapshot)?;
                println!("Views written to {}.", path.display());
            }
        }
        Commands::Chat { message } => {
            let api = HttpDataApi::new(&config.data_api_url);
            let reply = api
                .chat(&message)
                .await
                .context("Sorry, I encountered an error. Please try again.")?;
            println!("{reply}");
        }
        Commands::Doctors { command } => {
            let mut table = AdminTable::new(PgDoctorGateway::new(connect().await?));
            table.reload().await?;
            run_doctors(&mut table, command).await?;
        }
    }

    Ok(())
}

async fn run_doctors(
    table: &mut AdminTable<PgDoctorGateway>,
    command: DoctorCommands,
) -> anyhow::Result<()> {
    match command {
        DoctorCommands::List {
            search,
            status,
            specialization,
        } => {
            table.set_search(&search);
            table.set_status_filter(status);
            table.set_specialization_filter(specialization);

            let now = Local::now();
            println!("{}", report::doctor_stats(&table.stats(now), now));
            if table.visible().next().is_none() {
                println!("No doctors match the current filters.");
            } else {
                println!("{}", report::doctor_table(table.visible()));
            }
        }
        DoctorCommands::Approve { id, yes } => {
            let outcome = table
                .approve(id, &mut StdinConfirm { assume_yes: yes }, &mut ConsoleNotifier)
                .await;
            check_outcome(id, outcome)?;
        }
        DoctorCommands::Reject { id, yes } => {
            let outcome = table
                .reject(id, &mut StdinConfirm { assume_yes: yes }, &mut ConsoleNotifier)
                .await;
            check_outcome(id, outcome)?;
        }
        DoctorCommands::View { id } => match table.details(id) {
            Some(details) => println!("{details}"),
            None => bail!("no doctor with id {id}"),
        },
    }

    Ok(())
}

fn check_outcome(id: Uuid, outcome: TransitionOutcome) -> anyhow::Result<()> {
    match outcome {
        TransitionOutcome::Applied => Ok(()),
        TransitionOutcome::Declined => {
            println!("Cancelled.");
            Ok(())
        }
        TransitionOutcome::UnknownRecord => bail!("no doctor with id {id}"),
        TransitionOutcome::NotPending => bail!("application {id} has already been reviewed"),
        TransitionOutcome::Failed => bail!("status update for {id} failed"),
    }
}
