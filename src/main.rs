use anyhow::Result;
use clap::{Parser, Subcommand};

/// mealsync - weekly meal plan storage and synchronization
#[derive(Parser)]
#[command(name = "mealsync")]
#[command(about = "Weekly meal plan storage and synchronization", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Server host address (overrides config file)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run database migrations
    Migrate,
    /// Drop database if exists and recreate with migrations
    Reset,
    /// Print a bearer token for an owner
    Token {
        /// Owner id written to the `sub` claim
        sub: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = mealsync::config::Config::load(cli.config.clone())?;
    config.validate()?;

    // the token is printed on stdout, keep it free of logs
    if let Commands::Token { sub } = &cli.command {
        return mealsync::cli::token(&config, sub);
    }

    mealsync::observability::init_observability(
        "mealsync",
        env!("CARGO_PKG_VERSION"),
        &config.observability,
    )?;

    match cli.command {
        Commands::Serve { host, port } => mealsync::cli::serve(config, host, port).await,
        Commands::Migrate => mealsync::cli::migrate(&config).await,
        Commands::Reset => mealsync::cli::reset(&config).await,
        Commands::Token { .. } => Ok(()),
    }
}
