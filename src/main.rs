mod cli;

use crate::cli::{Cli, Command, ExerciseArgs, PublishArgs};
use clap::Parser;
use derive_more::{Display, Error};
use exn::{OptionExt, ResultExt};
use std::process::ExitCode;
use std::sync::Arc;
use studio_config::Config;
use studio_perseus::{ExerciseArchiveBuilder, ExerciseConfig, Templates};
use studio_publish::{
    ExtraFields, ProgressSink, PublishLock, PublishOptions, PublishSettings, PublishState, Publisher, SnapshotSource,
};
use studio_storage::backend::LocalBackend;
use studio_storage::{BackendHandle, ContentStore};
use tracing_subscriber::EnvFilter;

type Error = exn::Exn<ErrorKind>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
enum ErrorKind {
    #[display("could not initialize logging")]
    Logging,
    #[display("could not load configuration")]
    Config,
    #[display("could not open storage")]
    Storage,
    #[display("could not read or write the channel snapshot")]
    Snapshot,
    #[display("publish failed")]
    Publish,
    #[display("could not build exercise archive")]
    Exercise,
    #[display("node not found: {_0}")]
    NodeNotFound(#[error(not(source))] String),
}

struct LogProgress;
impl ProgressSink for LogProgress {
    fn update(&self, state: PublishState, percent: f64) {
        tracing::info!(%state, percent, "publish progress");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("{err:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.verbose)?;
    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .or_raise(|| ErrorKind::Config)?;
    match cli.command {
        Command::Publish(args) => publish(&config, args).await,
        Command::Exercise(args) => exercise(&config, args).await,
    }
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("STUDIO_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(std::io::Error::other)
        .or_raise(|| ErrorKind::Logging)
}

fn backend(config: &Config) -> Result<BackendHandle> {
    let root = std::path::absolute(&config.storage.root).or_raise(|| ErrorKind::Storage)?;
    let backend = LocalBackend::new("local", root).or_raise(|| ErrorKind::Storage)?;
    Ok(Arc::new(backend))
}

async fn publish(config: &Config, args: PublishArgs) -> Result<()> {
    let source = SnapshotSource::load(&args.snapshot).await.or_raise(|| ErrorKind::Snapshot)?;
    let publisher = Publisher::new(source, backend(config)?, PublishSettings::from(config)).or_raise(|| ErrorKind::Publish)?;
    let options = PublishOptions { force: args.force, force_exercises: args.force_exercises, version_notes: args.notes };
    let artifact = publisher
        .publish_channel(&PublishLock::new(), &options, Some(&LogProgress))
        .await
        .or_raise(|| ErrorKind::Publish)?;
    // Rebuilt archives and the publish record live in the snapshot.
    publisher.source().save(&args.snapshot).await.or_raise(|| ErrorKind::Snapshot)?;
    let database = config.storage.root.join(&artifact.database_path);
    println!("{} v{} -> {}", artifact.channel_id, artifact.version, database.display());
    Ok(())
}

async fn exercise(config: &Config, args: ExerciseArgs) -> Result<()> {
    let source = SnapshotSource::load(&args.snapshot).await.or_raise(|| ErrorKind::Snapshot)?;
    let snapshot = source.snapshot().await;
    let node = snapshot
        .nodes
        .iter()
        .find(|node| node.id == args.node)
        .ok_or_raise(|| ErrorKind::NodeNotFound(args.node.clone()))?;

    let extra = ExtraFields::parse(&node.node_id, &node.extra_fields).or_raise(|| ErrorKind::Exercise)?;
    let exercise = ExerciseConfig::derive(&extra.settings, &node.assessment_items).or_raise(|| ErrorKind::Exercise)?;
    let templates = Templates::builtin().or_raise(|| ErrorKind::Exercise)?;
    let store = ContentStore::new(backend(config)?, config.storage.content_prefix.clone());
    let size = ExerciseArchiveBuilder::new(&store, &templates)
        .with_policy(config.publish.item_failure_policy)
        .build_to(&exercise, &node.assessment_items, &args.output)
        .await
        .or_raise(|| ErrorKind::Exercise)?;
    println!("{} ({size} bytes)", args.output.display());
    Ok(())
}
