//! Plans read tasks against a cluster fixture and prints them as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use holo_splits::{
    MetadataService, PlannerConfig, PlannerServices, SplitPlanner, SplitSizeSource,
    StaticCluster, TableKey,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "splitctl")]
#[command(about = "Column-aware split planning for columnar tables", long_about = None)]
struct Args {
    /// Cluster fixture JSON (layouts, directory listings, file locality, cache entries).
    #[arg(long)]
    fixture: PathBuf,
    /// Planner options as a `key=value` properties file; environment variables otherwise.
    #[arg(long)]
    properties: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan read tasks for every readable layout of a table.
    Plan {
        /// Table as `schema.table`.
        #[arg(long)]
        table: TableKey,
        /// Requested columns, comma separated.
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
    /// Show the split size and projection choice per layout without listing files.
    Search {
        #[arg(long)]
        table: TableKey,
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("holo_splits=info,warn")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.properties {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read properties '{}'", path.display()))?;
            PlannerConfig::from_properties(&raw)
                .with_context(|| format!("parse properties '{}'", path.display()))?
        }
        None => PlannerConfig::from_env(),
    };
    let cluster = Arc::new(StaticCluster::from_path(&args.fixture)?);
    let planner = SplitPlanner::new(config, PlannerServices::from_cluster(cluster.clone()));

    match args.command {
        Command::Plan { table, columns } => {
            let tasks = planner.plan_table(&table, columns.as_slice())?;
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        }
        Command::Search { table, columns } => {
            let layouts = cluster
                .layouts(&table)
                .with_context(|| format!("resolve layouts for {table}"))?;
            let mut choices = Vec::with_capacity(layouts.len());
            for layout in &layouts {
                let choice = planner.choose(&table, columns.as_slice(), layout)?;
                let source = match choice.split_size_source {
                    SplitSizeSource::Fixed => "fixed".to_string(),
                    SplitSizeSource::Index(coverage) => format!("{coverage:?}"),
                };
                choices.push(json!({
                    "layoutVersion": layout.version,
                    "splitSize": choice.split_size,
                    "splitSizeSource": source,
                    "projectionPathIds": choice.projection_path_ids,
                    "readPaths": choice.read_paths,
                }));
            }
            println!("{}", serde_json::to_string_pretty(&choices)?);
        }
    }
    Ok(())
}
