//! `qmlsync` keeps the project storage of a QML workspace in sync with the
//! files on disk.
//!
//! ```bash
//! # Bring the storage up to date
//! qmlsync update
//!
//! # Inspect what is stored
//! qmlsync modules
//! qmlsync exports QtQuick
//! ```

use clap::{Parser, Subcommand};
use derive_more::{Display, Error};
use exn::{OptionExt, ResultExt};
use qmlsync_config::{Config, Loader};
use qmlsync_fs::BackendHandle;
use qmlsync_fs::backend::{LocalBackend, ReadOnlyBackend};
use qmlsync_store::{Database, ProjectStorage, SourcePathCache};
use qmlsync_updater::{DiscoveredProject, ProjectManager, ProjectUpdater, StaticProject};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type Error = exn::Exn<ErrorKind>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
enum ErrorKind {
    #[display("unable to load configuration")]
    Config,
    #[display("unable to open project storage")]
    Storage,
    #[display("unable to open workspace")]
    Workspace,
    #[display("update failed")]
    Update,
    #[display("unknown module: {_0}")]
    UnknownModule(#[error(not(source))] String),
}

#[derive(Parser)]
#[command(name = "qmlsync", version, about = "Synchronize QML module structure into a SQLite project storage")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging (`RUST_LOG` takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file layered over the defaults and the user configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one update against the configured workspace
    Update,
    /// List stored modules
    Modules,
    /// List the exported type names of a module
    Exports {
        /// Module name, e.g. `QtQuick`
        module: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:?}");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut loader = Loader::new();
    if let Some(path) = cli.config {
        loader = loader.with_file(path);
    }
    let config = loader.load().or_raise(|| ErrorKind::Config)?;
    debug!(root = %config.root.display(), database = %config.database.display(), "Loaded configuration");

    let db = open_database(&config).await?;
    let storage = ProjectStorage::from(&db);
    match cli.command {
        Command::Update => {
            let fs = open_workspace(&config)?;
            let project: Box<dyn ProjectManager> = if config.qml_dirs.is_empty() {
                Box::new(DiscoveredProject::new(Arc::clone(&fs)))
            } else {
                Box::new(StaticProject::new(config.qml_dirs.iter().cloned()))
            };
            let mut updater = ProjectUpdater::new(project, fs, SourcePathCache::from(&db), storage);
            let summary = updater.update().await.or_raise(|| ErrorKind::Update)?;
            info!(%summary, "Update complete");
            println!("{summary}");
        },
        Command::Modules => {
            for (id, name) in storage.fetch_modules().await.or_raise(|| ErrorKind::Storage)? {
                println!("{id}\t{name}");
            }
        },
        Command::Exports { module } => {
            let (module_id, _) = storage
                .fetch_modules()
                .await
                .or_raise(|| ErrorKind::Storage)?
                .into_iter()
                .find(|(_, name)| *name == module)
                .ok_or_raise(|| ErrorKind::UnknownModule(module.clone()))?;
            for export in storage.fetch_exported_types(module_id).await.or_raise(|| ErrorKind::Storage)? {
                println!("{} {}\t{}", export.name, export.version, export.type_name);
            }
        },
    }
    db.close().await;
    Ok(())
}

async fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database.parent() {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Storage)?;
    }
    Database::connect(&config.database).await.or_raise(|| ErrorKind::Storage)
}

fn open_workspace(config: &Config) -> Result<BackendHandle> {
    let local: BackendHandle =
        Arc::new(LocalBackend::new("workspace", &config.root).or_raise(|| ErrorKind::Workspace)?);
    Ok(if config.read_only { Arc::new(ReadOnlyBackend::new(local)) } else { local })
}
