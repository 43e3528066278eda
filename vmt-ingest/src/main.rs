//! vmt-ingest - command-line front end
//!
//! Stores reports and templates and applies templates to reports against
//! the SQLite database under the VMT root folder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;
use vmt_common::config::{RootFolderInitializer, RootFolderResolver};
use vmt_common::db::{NewReport, NewTemplate, ReportType};
use vmt_common::events::EventBus;
use vmt_ingest::{logging, EventBusNotifier, ReportStore, SqliteStore, TemplateService};

/// Command-line arguments for vmt-ingest
#[derive(Parser, Debug)]
#[command(name = "vmt-ingest")]
#[command(about = "Deduplicating issue ingest for security scan reports")]
#[command(version)]
struct Args {
    /// Root folder holding the database
    #[arg(short, long, global = true, env = "VMT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Bootstrap configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a template to a stored report
    Apply {
        #[arg(long)]
        report: Uuid,
        #[arg(long)]
        template: String,
    },
    /// Manage templates
    #[command(subcommand)]
    Template(TemplateCommand),
    /// Manage reports
    #[command(subcommand)]
    Report(ReportCommand),
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// Create a template from a JSON definition
    Add { file: PathBuf },
    /// List templates
    List {
        /// Include issue and report counts
        #[arg(long)]
        verbose: bool,
    },
    /// Delete a template, detaching its issues and reports
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum ReportCommand {
    /// Store a report file
    Add {
        #[arg(long)]
        unit: Uuid,
        #[arg(long)]
        project: Uuid,
        /// The file is a single finding rather than a list
        #[arg(long)]
        oneshot: bool,
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = logging::load_config(args.config.as_deref()).context("Failed to load configuration")?;
    logging::init_tracing(&config).context("Failed to initialize logging")?;

    let root_folder = RootFolderResolver::new(args.root_folder.clone(), &config).resolve();
    let initializer = RootFolderInitializer::new(root_folder, &config);
    initializer
        .ensure_directory_exists()
        .context("Failed to create root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());

    let store = SqliteStore::open(&db_path)
        .await
        .context("Failed to open database")?;

    let mut service = TemplateService::from_sqlite(store.clone());
    let mut listener = if config.notifications.enabled {
        let bus = EventBus::new(config.notifications.event_capacity.max(1));
        let rx = bus.subscribe();
        service = service
            .with_notifier(Arc::new(EventBusNotifier::new(bus.clone())))
            .with_event_bus(bus);
        Some(rx)
    } else {
        None
    };

    match args.command {
        Command::Apply { report, template } => {
            let statistics = service.apply(report, &template).await?;
            println!("{}", serde_json::to_string_pretty(&statistics)?);
        }
        Command::Template(TemplateCommand::Add { file }) => {
            let text = read_file(&file)?;
            let definition: NewTemplate = serde_json::from_str(&text)
                .with_context(|| format!("Invalid template definition in {}", file.display()))?;
            let created = service.create(definition).await?;
            println!("{}", created.id);
        }
        Command::Template(TemplateCommand::List { verbose }) => {
            let summaries = service.list(verbose).await?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::Template(TemplateCommand::Delete { name }) => {
            service.delete(&name).await?;
        }
        Command::Report(ReportCommand::Add {
            unit,
            project,
            oneshot,
            file,
        }) => {
            let content = read_file(&file)?;
            serde_json::from_str::<serde_json::Value>(&content)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;

            let report = ReportStore::insert(
                &store,
                NewReport {
                    unit_id: unit,
                    project_id: project,
                    report_type: if oneshot { ReportType::Oneshot } else { ReportType::Batch },
                    content,
                },
            )
            .await?;
            println!("{}", report.id);
        }
    }

    if let Some(rx) = listener.as_mut() {
        while let Ok(event) = rx.try_recv() {
            info!(?event, "Event");
        }
    }

    Ok(())
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}
