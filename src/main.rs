use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use appforge::config::CoreConfig;
use appforge::database::{establish_connection, setup_database};
use appforge::AppContext;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// TOML configuration file; environment variables override its values
    #[clap(short, long, global = true)]
    config: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    Tables {
        #[clap(subcommand)]
        command: TableCommands,
    },
    Versions {
        #[clap(subcommand)]
        command: VersionCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    /// Apply the metadata store migrations
    Init,
}

#[derive(Subcommand, Debug)]
enum TableCommands {
    /// Repair internal tables left inconsistent by interrupted operations
    Reconcile,
}

#[derive(Subcommand, Debug)]
enum VersionCommands {
    Create {
        #[clap(long)]
        app: Uuid,
        #[clap(long)]
        name: String,
        /// Version to clone from
        #[clap(long)]
        from: Option<Uuid>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let config = match &args.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::from_env()?,
    };
    setup_logging(args.log_level.as_deref().unwrap_or(&config.log_level));

    match args.command {
        Commands::Db { command } => match command {
            DbCommands::Init => {
                info!("Initializing database: {}", config.metadata_database_url);
                let db = establish_connection(&config.metadata_database_url, false).await?;
                setup_database(&db).await?;
            }
        },
        Commands::Tables { command } => match command {
            TableCommands::Reconcile => {
                let context = AppContext::connect(config).await?;
                let report = context.internal_table_service().reconcile().await?;
                if report.is_clean() {
                    info!("Internal tables are consistent");
                } else {
                    println!(
                        "dropped tables: {}, removed metadata rows: {}, intents applied: {}, intents rolled back: {}",
                        report.dropped_tables.len(),
                        report.removed_metadata.len(),
                        report.applied_intents,
                        report.rolled_back_intents
                    );
                }
            }
        },
        Commands::Versions { command } => match command {
            VersionCommands::Create { app, name, from } => {
                let context = AppContext::connect(config).await?;
                let app = context.app_service().find(app).await?;
                let version = context
                    .app_version_service()
                    .create_version(&app, &name, from, None)
                    .await?;
                println!("{}", version.id);
            }
        },
    }

    Ok(())
}

fn setup_logging(log_level: &str) {
    let log_level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}
