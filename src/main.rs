use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ratekeeper::cli::ui::{StyleType, style_text};
use ratekeeper::core::config::AppConfig;
use ratekeeper::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for ratekeeper::AppCommand {
    fn from(cmd: Commands) -> ratekeeper::AppCommand {
        match cmd {
            Commands::Create { first, second } => ratekeeper::AppCommand::Create { first, second },
            Commands::Convert { from, to, value } => {
                ratekeeper::AppCommand::Convert { from, to, value }
            }
            Commands::List => ratekeeper::AppCommand::List,
            Commands::Sync => ratekeeper::AppCommand::Sync,
            Commands::Run => ratekeeper::AppCommand::Run,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Create a rate for a currency pair, seeded from the provider
    Create {
        /// Base currency code, e.g. USD
        first: String,
        /// Quote currency code, e.g. RUB
        second: String,
    },
    /// Convert an amount using the stored rate
    Convert {
        /// Currency code to convert from, e.g. USD
        from: String,
        /// Currency code to convert to, e.g. RUB
        to: String,
        /// Amount to convert, e.g. 10.5
        value: String,
    },
    /// List stored rates
    List,
    /// Refresh every stored rate once
    Sync,
    /// Keep rates fresh in the background until interrupted
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Setup) => {
            init_logging(cli.verbose, "info");
            ratekeeper::cli::setup::setup()
        }
        Some(cmd) => match load_config(cli.config_path.as_deref()) {
            Ok(config) => {
                init_logging(cli.verbose, &config.log_level);
                ratekeeper::run_command(cmd.into(), config).await
            }
            Err(e) => Err(e),
        },
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "Application failed");
        eprintln!("{}", style_text(&format!("{e:#}"), StyleType::Error));
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_arguments_have_help() {
        let cli = Cli::command();
        for name in ["create", "convert"] {
            let command = cli.find_subcommand(name).unwrap();
            for arg in command.get_positionals() {
                assert!(arg.get_help().is_some(), "{name} {}", arg.get_id());
            }
        }
    }
}
