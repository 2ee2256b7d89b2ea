use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lokihose")]
#[command(about = "Loki push endpoint that forwards logs to a delivery stream", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Run,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Init {
        #[arg(long)]
        stdout: bool,
    },
    Validate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lokihose=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config_path = lokihose::config::resolve_config_path(cli.config.as_deref());

    match cli.command {
        Some(Commands::Run) | None => {
            let Some(config_path) = config_path else {
                eprintln!("Error: config not found");
                eprintln!("Searched locations:");
                eprintln!("  ~/.config/lokihose/config.yml");
                eprintln!("  /etc/lokihose/config.yml");
                eprintln!("\nUse --config <path> to specify a config file, or run 'lokihose config init' to generate one.");
                std::process::exit(1);
            };
            lokihose::cli::run::run(&config_path).await?;
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Init { stdout } => lokihose::cli::config::init(stdout)?,
            ConfigAction::Validate => lokihose::cli::config::validate(config_path)?,
        },
    }

    Ok(())
}
