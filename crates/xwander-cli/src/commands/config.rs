//! config command implementation

use anyhow::Result;
use clap::{Args, Subcommand};
use xwander_core::common::config_path;
use xwander_core::XwanderConfig;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration (file plus environment)
    Show,

    /// Print the config file location
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommand::Show => {
            let config = XwanderConfig::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommand::Path => {
            println!("{}", config_path()?.display());
        }
    }
    Ok(())
}
