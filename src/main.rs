use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use tasktrack_core::ProjectId;
use tasktrack_engine::TaskService;
use tasktrack_server::Settings;
use tasktrack_store::{Database, ProjectRepo, SqliteTaskRepo};

#[derive(Parser)]
#[command(name = "tasktrack")]
#[command(about = "Task tracking REST service")]
#[command(version)]
struct Cli {
    /// Extra settings file, merged over ~/.tasktrack/settings.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default if no subcommand)
    Serve,
    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a project and print its id
    Create { name: String },
    /// List all projects
    List,
    /// Delete a project and all of its tasks
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    tasktrack_telemetry::init_telemetry(&settings.telemetry.to_config()?);

    let db = Database::open(&settings.database.path).with_context(|| {
        format!(
            "failed to open database at {}",
            settings.database.path.display()
        )
    })?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&settings, db).await,
        Commands::Project { action } => run_project(action, db),
    }
}

async fn serve(settings: &Settings, db: Database) -> anyhow::Result<()> {
    let repo = Arc::new(SqliteTaskRepo::new(db.clone()));
    let service = Arc::new(TaskService::new(repo));

    let handle = tasktrack_server::start(&settings.server, service, db)
        .await
        .with_context(|| {
            format!(
                "failed to bind {}:{}",
                settings.server.host, settings.server.port
            )
        })?;

    tracing::info!(port = handle.port, "tasktrack ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    handle.shutdown().await;
    Ok(())
}

fn run_project(action: ProjectAction, db: Database) -> anyhow::Result<()> {
    let repo = ProjectRepo::new(db);
    match action {
        ProjectAction::Create { name } => {
            let project = repo.create(&name)?;
            println!("{}\t{}", project.id, project.name);
        }
        ProjectAction::List => {
            for project in repo.list()? {
                println!("{}\t{}\t{}", project.id, project.name, project.created_at);
            }
        }
        ProjectAction::Delete { id } => {
            let removed = repo.delete(ProjectId::new(id))?;
            println!("deleted project {id} and {removed} task(s)");
        }
    }
    Ok(())
}
