//! gittasks - inspection CLI
//!
//! Builds a seeded in-memory store and prints assembled views as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gittasks::store::{ListOptions, ProjectFilter};
use gittasks::{AppState, Config};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gittasks")]
#[command(about = "Inspect a seeded git-style task store")]
struct Cli {
    /// YAML config file (defaults to ./gittasks.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Entity counts of the seeded store
    Stats,

    /// List projects
    Projects {
        /// Case-insensitive search on name and description
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Assembled graph of one project (the first listed one by default)
    Graph {
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Per-day activity of a project
    Contributions {
        #[arg(short, long)]
        project: String,

        /// Author email or name
        #[arg(short, long)]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gittasks=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_yaml_and_env(cli.config.as_deref())?;
    let state = AppState::new(config);

    match cli.command {
        Commands::Stats => print_json(&state.store.store_stats().await),
        Commands::Projects { search, limit } => {
            let options = ListOptions {
                limit,
                filters: ProjectFilter {
                    search,
                    ..Default::default()
                },
                ..Default::default()
            };
            print_json(&state.store.list_projects(&options).await)
        }
        Commands::Graph { project } => {
            let project_id = match project {
                Some(id) => id,
                None => first_project_id(&state).await?,
            };
            let graph = state
                .store
                .get_project_graph(&project_id)
                .await
                .with_context(|| format!("project not found: {}", project_id))?;
            tracing::info!(
                project_id = %project_id,
                commits = graph.commits.len(),
                edges = graph.edges.len(),
                "Assembled project graph"
            );
            print_json(&graph)
        }
        Commands::Contributions { project, user } => {
            let data = state
                .store
                .get_contribution_data(&project, user.as_deref())
                .await
                .with_context(|| format!("project not found: {}", project))?;
            print_json(&data)
        }
    }
}

async fn first_project_id(state: &AppState) -> Result<String> {
    let page = state.store.list_projects(&ListOptions::page(1, 0)).await;
    page.data
        .into_iter()
        .next()
        .map(|p| p.id)
        .context("store has no projects; raise seed.projects")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
