use anyhow::Result;
use clap::Parser;

use invoice_import::ImportConfig;
use invoice_import::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    match cli.command {
        Commands::Fields => cli::handle_fields_command(),
        Commands::Template { path } => cli::handle_template_command(path),
        Commands::Import(args) => {
            let config = match &cli.config {
                Some(path) if !path.exists() => {
                    anyhow::bail!("Config file does not exist: {}", path.display())
                }
                Some(path) => ImportConfig::load_from(path)?,
                None => ImportConfig::load()?,
            };
            cli::import::handle_import_command(args, config).await
        }
    }
}
