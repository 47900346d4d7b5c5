use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use docbank::{
    account::SAMPLE_ACCOUNT_ID,
    backend::StoreBackendBuilder,
    config::{AppConfig, BackendKind},
    memory::InMemoryStore,
    query::Filter,
    script,
};

#[derive(Parser)]
#[command(name = "docbank", version, about = "Run bank account operations against a document store")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Connect, look up one account by id and disconnect (the default).
    Run {
        /// Hex object id of the account to look up.
        #[arg(long, default_value = SAMPLE_ACCOUNT_ID)]
        id: String,
    },
    /// List the databases on the server.
    Databases,
    /// Insert, find, update and delete the sample account.
    Tour,
}

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run {
        id: SAMPLE_ACCOUNT_ID.to_string(),
    });

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(backend = %config.backend, namespace = %config.namespace(), "Starting docbank");

    match config.backend {
        BackendKind::Memory => execute(InMemoryStore::builder(), &config, command).await,
        #[cfg(feature = "mongodb")]
        BackendKind::MongoDb => {
            let mut builder = docbank::mongodb::MongoDbStore::builder(&config.uri).app_name(config.app_name.as_str());
            if let Some(timeout) = config.server_selection_timeout {
                builder = builder.server_selection_timeout(timeout);
            }
            execute(builder, &config, command).await
        }
        #[cfg(not(feature = "mongodb"))]
        BackendKind::MongoDb => {
            error!("docbank was built without the mongodb feature");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}

/// Runs one command against the configured backend. Failures are logged by the script.
async fn execute<Bu: StoreBackendBuilder>(builder: Bu, config: &AppConfig, command: Command) {
    match command {
        Command::Run { id } => {
            let Ok(id) = script::parse_object_id(&id) else {
                error!(id = %id, "Invalid account id");
                return;
            };

            let _ = script::run(builder, &config.namespace(), Filter::id(id)).await;
        }
        Command::Databases => {
            let Ok(store) = script::open(builder).await else {
                return;
            };

            if script::connect(&store).await.is_ok() {
                let _ = script::list_database_names(&store).await;
            }
            let _ = script::close(store).await;
        }
        Command::Tour => {
            let Ok(store) = script::open(builder).await else {
                return;
            };

            if script::connect(&store).await.is_ok() {
                script::tour(&store, &config.namespace()).await;
            }
            let _ = script::close(store).await;
        }
    }
}
