//! Command-line interface for buildledger.
//!
//! Provides commands for creating builds, recording their outcome,
//! listing and inspecting them, and showing the resolved configuration.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::{required_partitions, BuildService};
use crate::domain::{Artifact, Build, BuildFailure, BuildResult, Component, ComponentKind};
use crate::store::Store;

/// buildledger - Transactional build lifecycle tracking
#[derive(Parser, Debug)]
#[command(name = "buildledger")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a new running build
    Create {
        /// Name of the component being built
        component: String,

        /// Kind of component
        #[arg(short, long, value_enum, default_value = "builder")]
        kind: KindArg,
    },

    /// Record the outcome of a running build
    Complete(CompleteArgs),

    /// List all builds
    List,

    /// Show details of a build
    Show {
        /// Build ID
        build_id: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

#[derive(Args, Debug)]
pub struct CompleteArgs {
    /// Build ID
    pub build_id: String,

    #[command(flatten)]
    pub outcome: OutcomeArgs,

    /// Artifact label as key=value (repeatable)
    #[arg(short, long = "label", value_parser = parse_label, requires = "artifact")]
    pub labels: Vec<(String, String)>,

    /// Status code for a failed build
    #[arg(short, long, default_value = "2", requires = "error")]
    pub code: i32,
}

/// Exactly one of artifact or error
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct OutcomeArgs {
    /// Artifact content produced by the build
    #[arg(short, long)]
    pub artifact: Option<String>,

    /// Error message for a failed build
    #[arg(short, long)]
    pub error: Option<String>,
}

/// Component kind for CLI (maps to ComponentKind)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Unknown,
    Builder,
    Registry,
    Platform,
}

impl From<KindArg> for ComponentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Unknown => ComponentKind::Unknown,
            KindArg::Builder => ComponentKind::Builder,
            KindArg::Registry => ComponentKind::Registry,
            KindArg::Platform => ComponentKind::Platform,
        }
    }
}

impl CompleteArgs {
    /// Turn the parsed flags into a build outcome
    pub fn into_result(self) -> BuildResult {
        match (self.outcome.artifact, self.outcome.error) {
            (Some(content), _) => {
                let artifact = self
                    .labels
                    .into_iter()
                    .fold(Artifact::new(content), |artifact, (k, v)| {
                        artifact.with_label(k, v)
                    });
                BuildResult::Artifact(artifact)
            }
            (None, message) => {
                BuildResult::Error(BuildFailure::new(self.code, message.unwrap_or_default()))
            }
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Create { component, kind } => create_build(&component, kind).await,
            Commands::Complete(args) => complete_build(args).await,
            Commands::List => list_builds().await,
            Commands::Show { build_id } => show_build(&build_id).await,
            Commands::Config => show_config().await,
        }
    }
}

/// Open the store named by the configuration
async fn open_service() -> Result<BuildService> {
    let config = crate::config::config()?;
    let store_config = config.store_config(required_partitions());
    let path = store_config.path.clone();

    let store = tokio::task::spawn_blocking(move || Store::open(store_config))
        .await
        .context("Store open task failed")?
        .with_context(|| format!("Failed to open store: {}", path.display()))?;

    Ok(BuildService::new(store))
}

async fn create_build(name: &str, kind: KindArg) -> Result<()> {
    let service = open_service().await?;
    let id = service
        .create(Component::new(kind.into(), name))
        .await
        .with_context(|| format!("Failed to create build for {}", name))?;

    println!("{}", id);
    Ok(())
}

async fn complete_build(args: CompleteArgs) -> Result<()> {
    let service = open_service().await?;
    let id = args.build_id.clone();
    let result = args.into_result();

    service
        .complete(&id, result)
        .await
        .with_context(|| format!("Failed to complete build {}", id))?;

    let build = service.get(&id).await?;
    eprintln!("[Build {} marked {}]", build.id, build.status.state);
    Ok(())
}

async fn list_builds() -> Result<()> {
    let service = open_service().await?;
    let listing = service.list().await.context("Failed to list builds")?;

    if listing.builds.is_empty() && listing.failures.is_empty() {
        println!("No builds found");
        return Ok(());
    }

    println!(
        "{:<34} {:<20} {:<10} {:<20} {:<20}",
        "BUILD ID", "COMPONENT", "STATE", "STARTED", "COMPLETED"
    );
    println!("{}", "-".repeat(108));

    for build in &listing.builds {
        println!(
            "{:<34} {:<20} {:<10} {:<20} {:<20}",
            build.id,
            build.component.name,
            build.status.state.to_string(),
            build.status.start_time.format("%Y-%m-%d %H:%M:%S"),
            build
                .status
                .complete_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    for failure in &listing.failures {
        eprintln!("[Unreadable build record {}: {}]", failure.id, failure.error);
    }

    Ok(())
}

async fn show_build(build_id: &str) -> Result<()> {
    let service = open_service().await?;
    let build = service
        .get(build_id)
        .await
        .with_context(|| format!("Failed to load build {}", build_id))?;

    print_build(&build);
    Ok(())
}

fn print_build(build: &Build) {
    println!("Build ID: {}", build.id);
    println!("Component: {} ({:?})", build.component.name, build.component.kind);
    println!("State: {}", build.status.state);
    println!("Started: {}", build.status.start_time);
    if let Some(completed) = build.status.complete_time {
        println!("Completed: {}", completed);
    }
    if let Some(ref artifact) = build.artifact {
        println!("Artifact: {}", artifact.content);
        for (key, value) in &artifact.labels {
            println!("  {}={}", key, value);
        }
    }
    if let Some(ref error) = build.status.error {
        println!("Error ({}): {}", error.code, error.message);
    }
}

async fn show_config() -> Result<()> {
    let config = crate::config::config()?;

    println!("Home: {}", config.home.display());
    println!("Database: {}", config.database.display());
    match config.config_file {
        Some(ref path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!("Busy timeout: {}ms", config.store.busy_timeout_ms);
    println!("Read connections: {}", config.store.read_connections);

    Ok(())
}

/// Parse a `key=value` label
fn parse_label(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid label '{}': expected key=value", s))?;
    if key.is_empty() {
        return Err(format!("invalid label '{}': empty key", s));
    }
    Ok((key.to_string(), value.to_string()))
}
